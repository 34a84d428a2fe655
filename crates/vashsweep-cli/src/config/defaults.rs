use vashsweep::engine::config::{DEFAULT_LOG_NAME, DEFAULT_SCRIPT_NAME};

/// Values used when neither the command line nor the sweep file sets them.
pub struct DefaultsConfig {
    pub substance: String,
    pub executable: String,
    pub output_dir: String,
    pub script_name: String,
    pub log_name: String,
    pub ignore_first: usize,
    pub si_units: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            substance: "water".to_string(),
            executable: "lmp".to_string(),
            output_dir: "runs".to_string(),
            script_name: DEFAULT_SCRIPT_NAME.to_string(),
            log_name: DEFAULT_LOG_NAME.to_string(),
            ignore_first: 0,
            si_units: false,
        }
    }
}
