pub mod dump;
pub mod generate;
pub mod parse;
pub mod sweep;
