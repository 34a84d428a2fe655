//! # Engine Module
//!
//! Everything needed to turn a parameter table into a finished LAMMPS run.
//!
//! - **Configuration** ([`config`]) - simulation settings and their builder
//! - **Input scripts** ([`script`]) - templates with named `{{placeholder}}` slots
//! - **External processes** ([`process`]) - the simulation engine and visualizer seams
//! - **Progress Monitoring** ([`progress`]) - callback-based progress reporting
//! - **Error Handling** ([`error`]) - the error type every workflow step returns

pub mod config;
pub mod error;
pub mod process;
pub mod progress;
pub mod script;
