use thiserror::Error;

use super::config::ConfigError;
use super::script::ScriptError;
use crate::core::io::dump::DumpError;
use crate::core::io::log::LogError;
use crate::core::potential::PotentialError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Potential parameters: {source}")]
    Potential {
        #[from]
        source: PotentialError,
    },

    #[error("Input script: {source}")]
    Script {
        #[from]
        source: ScriptError,
    },

    #[error("Log parsing failed: {source}")]
    Log {
        #[from]
        source: LogError,
    },

    #[error("Dump parsing failed: {source}")]
    Dump {
        #[from]
        source: DumpError,
    },

    #[error("Failed to launch '{program}': {source}")]
    Launch {
        program: String,
        source: std::io::Error,
    },

    #[error("'{command}' {}", describe_exit(*.code))]
    EngineFailed { command: String, code: Option<i32> },

    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to export series to '{path}': {source}")]
    Export { path: String, source: csv::Error },
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with status {}", code),
        None => "was terminated by a signal".to_string(),
    }
}
