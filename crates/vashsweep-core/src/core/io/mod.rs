//! Readers and writers for the text formats exchanged with LAMMPS.
//!
//! Generated artifacts are written through [`atomic::write_atomically`] so an
//! interrupted run never leaves a half-written file behind.

pub mod atomic;
pub mod dump;
pub mod log;
pub mod vashishta;
