//! # vashsweep Core Library
//!
//! Parameter sweeps over the Vashishta potential for water and silica, driven through
//! an external LAMMPS executable.
//!
//! ## Architectural Philosophy
//!
//! The library keeps the same three-layer split throughout:
//!
//! - **[`core`]: The Foundation.** Default interaction tables, the fixed-column
//!   parameter file writer, the thermo log parser, the dump reader and unit conversion.
//!   Nothing in this layer touches a process or a working directory.
//!
//! - **[`engine`]: The Execution Layer.** Simulation configuration, input-script
//!   templating and the traits behind which the external simulation engine and the
//!   visualizer live.
//!
//! - **[`workflows`]: The Public API.** Ties `core` and `engine` together into a
//!   complete sweep: one directory per sweep point, a parameter file, a rendered input
//!   script, an engine run and the exported time series.

pub mod core;
pub mod engine;
pub mod workflows;
