use crate::core::io::atomic::write_atomically;
use crate::core::potential::ElementMassTable;
use indexmap::IndexMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Unknown placeholder '{name}' on line {line}")]
    UnknownPlaceholder { name: String, line: usize },

    #[error("Unterminated placeholder on line {line}")]
    Unterminated { line: usize },

    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Values substituted into an input-script template, keyed by placeholder name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptVariables {
    values: IndexMap<String, String>,
}

impl ScriptVariables {
    /// The standard set: `extension`, `read_data`, `parameter_file`, `elements` and
    /// `masses` (one `mass <type> <value>` line per element, in atom-type order).
    pub fn new(
        extension: &str,
        read_data: &str,
        parameter_file: &str,
        masses: &ElementMassTable,
    ) -> Self {
        let elements = masses.symbols().collect::<Vec<_>>().join(" ");
        let mass_lines = masses
            .iter()
            .enumerate()
            .map(|(i, (_, mass))| format!("mass{:12}{} {}", "", i + 1, mass))
            .collect::<Vec<_>>()
            .join("\n");

        Self::default()
            .with("extension", extension)
            .with("read_data", read_data)
            .with("parameter_file", parameter_file)
            .with("elements", elements)
            .with("masses", mass_lines)
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

/// Replaces every `{{name}}` in `text` with its value. Text outside placeholders,
/// including LAMMPS `${var}` references, is copied unchanged.
pub fn substitute(text: &str, variables: &ScriptVariables) -> Result<String, ScriptError> {
    let mut output = String::with_capacity(text.len());
    let mut rest = text;
    let mut line = 1;

    while let Some(start) = rest.find(OPEN) {
        let (before, after_open) = rest.split_at(start);
        output.push_str(before);
        line += before.matches('\n').count();

        let after_open = &after_open[OPEN.len()..];
        let end = after_open
            .find(CLOSE)
            .filter(|&end| !after_open[..end].contains('\n'))
            .ok_or(ScriptError::Unterminated { line })?;
        let name = after_open[..end].trim();
        let value = variables
            .get(name)
            .ok_or_else(|| ScriptError::UnknownPlaceholder {
                name: name.to_string(),
                line,
            })?;
        output.push_str(value);
        rest = &after_open[end + CLOSE.len()..];
    }
    output.push_str(rest);

    Ok(output)
}

/// LAMMPS input-script template with named placeholders.
#[derive(Debug, Clone)]
pub struct InputScript {
    template: String,
}

impl InputScript {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ScriptError> {
        debug!("Reading input script template from {:?}", path);
        let template = std::fs::read_to_string(path).map_err(|e| ScriptError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Ok(Self { template })
    }

    pub fn render(&self, variables: &ScriptVariables) -> Result<String, ScriptError> {
        substitute(&self.template, variables)
    }

    pub fn write_to_path(
        &self,
        variables: &ScriptVariables,
        destination: &Path,
    ) -> Result<(), ScriptError> {
        let text = self.render(variables)?;
        write_atomically(destination, text.as_bytes()).map_err(|e| ScriptError::Io {
            path: destination.to_string_lossy().to_string(),
            source: e,
        })
    }
}
