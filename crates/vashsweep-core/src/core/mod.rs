//! # Core Module
//!
//! Stateless building blocks shared by the engine and the workflows.
//!
//! - **Potential tables** ([`potential`]) - Vashishta interaction parameters, built-in
//!   defaults per substance and user overrides
//! - **File I/O** ([`io`]) - the fixed-column parameter file, LAMMPS thermo logs and
//!   text dumps
//! - **Units** ([`units`]) - conversion of reduced (LJ) thermo output to SI

pub mod io;
pub mod potential;
pub mod units;
