//! Vashishta potential parameter tables.
//!
//! - [`params`] - parameter vocabulary, interaction triples and the ordered table type
//! - [`defaults`] - built-in tables for the supported substances

pub mod defaults;
pub mod params;

pub use defaults::{Substance, build_default_table, default_table_for};
pub use params::{
    ElementMassTable, InteractionParameterSet, InteractionRecord, InteractionTriple,
    ParameterName, ParameterOverrides, ParameterSet, PotentialError,
};
