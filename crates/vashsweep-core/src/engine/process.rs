//! Seams to the external programs a sweep drives: the simulation engine and the
//! visualizer. Both block until the child process exits.

use super::config::CommandLine;
use super::error::EngineError;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

pub trait SimulationEngine {
    /// Runs `input_script` with `working_dir` as the current directory and returns
    /// once the simulation has exited.
    fn run(&self, input_script: &Path, working_dir: &Path) -> Result<(), EngineError>;
}

pub trait Visualizer {
    /// Renders the data file `input` to the image `output`.
    fn visualize(&self, input: &Path, output: &Path) -> Result<(), EngineError>;
}

fn run_to_completion(command: &CommandLine, mut process: Command) -> Result<(), EngineError> {
    let status = process.status().map_err(|e| EngineError::Launch {
        program: command.program.clone(),
        source: e,
    })?;
    if status.success() {
        Ok(())
    } else {
        Err(EngineError::EngineFailed {
            command: command.to_string(),
            code: status.code(),
        })
    }
}

/// Invokes `<program> <args...> -in <script>`, e.g. `mpirun -n 4 lmp_mpi -in in.lammps`.
#[derive(Debug, Clone)]
pub struct ExternalEngine {
    command: CommandLine,
}

impl ExternalEngine {
    pub fn new(command: CommandLine) -> Self {
        Self { command }
    }

    pub fn command(&self) -> &CommandLine {
        &self.command
    }
}

impl SimulationEngine for ExternalEngine {
    fn run(&self, input_script: &Path, working_dir: &Path) -> Result<(), EngineError> {
        info!(
            "Running '{} -in {}' in {:?}",
            self.command,
            input_script.display(),
            working_dir
        );
        let mut process = Command::new(&self.command.program);
        process
            .args(&self.command.args)
            .arg("-in")
            .arg(input_script)
            .current_dir(working_dir);
        run_to_completion(&self.command, process)
    }
}

/// Invokes `<program> <args...> <input> <output>`.
#[derive(Debug, Clone)]
pub struct CommandVisualizer {
    command: CommandLine,
}

impl CommandVisualizer {
    pub fn new(command: CommandLine) -> Self {
        Self { command }
    }
}

impl Visualizer for CommandVisualizer {
    fn visualize(&self, input: &Path, output: &Path) -> Result<(), EngineError> {
        debug!("Visualizing {:?} -> {:?}", input, output);
        let mut process = Command::new(&self.command.program);
        process.args(&self.command.args).arg(input).arg(output);
        run_to_completion(&self.command, process)
    }
}

/// Skips visualization entirely.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVisualizer;

impl Visualizer for NoVisualizer {
    fn visualize(&self, _input: &Path, _output: &Path) -> Result<(), EngineError> {
        Ok(())
    }
}
