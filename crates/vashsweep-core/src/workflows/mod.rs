//! # Workflows Module
//!
//! Top-level entry points of the library.
//!
//! - **Parameter sweep** ([`sweep`]) - one directory per sweep point holding the
//!   generated parameter file, the rendered input script, the engine's output and the
//!   exported time series.

pub mod sweep;
