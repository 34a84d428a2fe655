use crate::core::potential::{ParameterOverrides, Substance};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_SCRIPT_NAME: &str = "in.lammps";
pub const DEFAULT_LOG_NAME: &str = "log.lammps";

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Command line for {0} is empty")]
    EmptyCommand(&'static str),
}

/// A program followed by its leading arguments, e.g. `mpirun -n 4 lmp_mpi`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Splits `line` on whitespace. `what` names the command in the error.
    pub fn parse(line: &str, what: &'static str) -> Result<Self, ConfigError> {
        let mut tokens = line.split_whitespace();
        let program = tokens.next().ok_or(ConfigError::EmptyCommand(what))?;
        Ok(Self::new(program).with_args(tokens))
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// A data file produced by the engine and the image to render from it. Both paths
/// are relative to the sweep point's directory and may contain placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualizationRequest {
    pub input: String,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnalysisConfig {
    /// Number of leading thermo blocks to discard.
    pub ignore_first: usize,
    /// Series exported to `series.csv`; empty means every column.
    pub series: Vec<String>,
    pub si_units: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub substance: Substance,
    pub engine: CommandLine,
    pub script_template: PathBuf,
    pub header_path: PathBuf,
    pub read_data: String,
    pub output_dir: PathBuf,
    pub parameter_file: String,
    pub script_name: String,
    pub log_name: String,
    pub overrides: ParameterOverrides,
    pub analysis: AnalysisConfig,
    pub visualizer: Option<CommandLine>,
    pub visualizations: Vec<VisualizationRequest>,
    pub dry_run: bool,
}

#[derive(Default)]
pub struct SimulationConfigBuilder {
    substance: Option<Substance>,
    engine: Option<CommandLine>,
    script_template: Option<PathBuf>,
    header_path: Option<PathBuf>,
    read_data: Option<String>,
    output_dir: Option<PathBuf>,
    parameter_file: Option<String>,
    script_name: Option<String>,
    log_name: Option<String>,
    overrides: ParameterOverrides,
    analysis: AnalysisConfig,
    visualizer: Option<CommandLine>,
    visualizations: Vec<VisualizationRequest>,
    dry_run: bool,
}

impl SimulationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn substance(mut self, substance: Substance) -> Self {
        self.substance = Some(substance);
        self
    }
    pub fn engine(mut self, command: CommandLine) -> Self {
        self.engine = Some(command);
        self
    }
    pub fn script_template(mut self, path: PathBuf) -> Self {
        self.script_template = Some(path);
        self
    }
    pub fn header_path(mut self, path: PathBuf) -> Self {
        self.header_path = Some(path);
        self
    }
    pub fn read_data(mut self, data_file: impl Into<String>) -> Self {
        self.read_data = Some(data_file.into());
        self
    }
    pub fn output_dir(mut self, path: PathBuf) -> Self {
        self.output_dir = Some(path);
        self
    }
    pub fn parameter_file(mut self, name: impl Into<String>) -> Self {
        self.parameter_file = Some(name.into());
        self
    }
    pub fn script_name(mut self, name: impl Into<String>) -> Self {
        self.script_name = Some(name.into());
        self
    }
    pub fn log_name(mut self, name: impl Into<String>) -> Self {
        self.log_name = Some(name.into());
        self
    }
    pub fn overrides(mut self, overrides: ParameterOverrides) -> Self {
        self.overrides = overrides;
        self
    }
    pub fn ignore_first(mut self, blocks: usize) -> Self {
        self.analysis.ignore_first = blocks;
        self
    }
    pub fn series(mut self, names: Vec<String>) -> Self {
        self.analysis.series = names;
        self
    }
    pub fn si_units(mut self, enabled: bool) -> Self {
        self.analysis.si_units = enabled;
        self
    }
    pub fn visualizer(mut self, command: Option<CommandLine>) -> Self {
        self.visualizer = command;
        self
    }
    pub fn visualize(mut self, input: impl Into<String>, output: impl Into<String>) -> Self {
        self.visualizations.push(VisualizationRequest {
            input: input.into(),
            output: output.into(),
        });
        self
    }
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    pub fn build(self) -> Result<SimulationConfig, ConfigError> {
        let substance = self
            .substance
            .ok_or(ConfigError::MissingParameter("substance"))?;
        Ok(SimulationConfig {
            substance,
            engine: self.engine.ok_or(ConfigError::MissingParameter("engine"))?,
            script_template: self
                .script_template
                .ok_or(ConfigError::MissingParameter("script_template"))?,
            header_path: self
                .header_path
                .ok_or(ConfigError::MissingParameter("header_path"))?,
            read_data: self
                .read_data
                .ok_or(ConfigError::MissingParameter("read_data"))?,
            output_dir: self
                .output_dir
                .ok_or(ConfigError::MissingParameter("output_dir"))?,
            parameter_file: self
                .parameter_file
                .unwrap_or_else(|| substance.parameter_file_name()),
            script_name: self
                .script_name
                .unwrap_or_else(|| DEFAULT_SCRIPT_NAME.to_string()),
            log_name: self
                .log_name
                .unwrap_or_else(|| DEFAULT_LOG_NAME.to_string()),
            overrides: self.overrides,
            analysis: self.analysis,
            visualizer: self.visualizer,
            visualizations: self.visualizations,
            dry_run: self.dry_run,
        })
    }
}
