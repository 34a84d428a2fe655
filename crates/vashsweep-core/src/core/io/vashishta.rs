use super::atomic::write_atomically;
use crate::core::potential::{
    InteractionParameterSet, InteractionRecord, InteractionTriple, ParameterName,
    ParameterOverrides, ParameterSet, PotentialError,
};
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, info};

const FIELD_SEPARATOR: &str = "  ";
const SECOND_LINE_PADDING: usize = 6;

/// Shortest representation that parses back to the same `f64`.
fn format_field(value: f64) -> String {
    format!("{}", value)
}

fn write_record(writer: &mut impl Write, record: &InteractionRecord) -> io::Result<()> {
    writeln!(writer)?;

    for symbol in record.triple.elements() {
        write!(writer, "{}{}", symbol, FIELD_SEPARATOR)?;
    }
    for name in ParameterName::FIRST_LINE {
        write!(
            writer,
            "{}{}",
            format_field(record.parameters.get(name)),
            FIELD_SEPARATOR
        )?;
    }
    writeln!(writer)?;

    let indent = record.triple.name().len() + SECOND_LINE_PADDING;
    write!(writer, "{:indent$}", "", indent = indent)?;
    for name in ParameterName::SECOND_LINE {
        write!(
            writer,
            "{}{}",
            format_field(record.parameters.get(name)),
            FIELD_SEPARATOR
        )?;
    }
    writeln!(writer)
}

/// Produces LAMMPS `pair_style vashishta` parameter files from a header template.
#[derive(Debug, Clone)]
pub struct ParameterFileWriter {
    header: String,
}

impl ParameterFileWriter {
    pub fn with_header(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
        }
    }

    /// Loads the header template. The template file is only ever read.
    pub fn from_header_path(path: &Path) -> Result<Self, PotentialError> {
        debug!("Reading parameter header template from {:?}", path);
        let header = std::fs::read_to_string(path).map_err(|e| PotentialError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Ok(Self { header })
    }

    pub fn write_to(
        &self,
        table: &InteractionParameterSet,
        writer: &mut impl Write,
    ) -> io::Result<()> {
        writer.write_all(self.header.as_bytes())?;
        for record in table.records() {
            write_record(writer, record)?;
        }
        Ok(())
    }

    pub fn render(&self, table: &InteractionParameterSet) -> String {
        let mut buffer = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_to(table, &mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    }

    /// Renders `table` and atomically replaces `destination` with the result.
    pub fn write_to_path(
        &self,
        table: &InteractionParameterSet,
        destination: &Path,
    ) -> Result<(), PotentialError> {
        let text = self.render(table);
        write_atomically(destination, text.as_bytes()).map_err(|e| PotentialError::Io {
            path: destination.to_string_lossy().to_string(),
            source: e,
        })?;
        info!(
            "Wrote {} interaction records to {:?}",
            table.len(),
            destination
        );
        Ok(())
    }
}

/// Header text followed by one two-line record per interaction, in table order.
pub fn render(table: &InteractionParameterSet, header_text: &str) -> String {
    ParameterFileWriter::with_header(header_text).render(table)
}

fn parse_fields(
    tokens: &[&str],
    names: &[ParameterName; 7],
    params: &mut ParameterSet,
    line: usize,
) -> Result<(), PotentialError> {
    for (token, &name) in tokens.iter().zip(names) {
        let value: f64 = token.parse().map_err(|_| PotentialError::MalformedRecord {
            line,
            details: format!("value '{}' for '{}' is not a number", token, name),
        })?;
        params.set(name, value);
    }
    Ok(())
}

/// Parses the records that follow a header back into a table.
///
/// `text` must contain only records (blank lines are ignored). Each record is a
/// labelled line of three symbols and seven values followed by an indented line of
/// seven values.
pub fn read_records(text: &str) -> Result<InteractionParameterSet, PotentialError> {
    let mut table = InteractionParameterSet::new();
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l))
        .filter(|(_, l)| !l.trim().is_empty());

    while let Some((first_no, first)) = lines.next() {
        let labels: Vec<&str> = first.split_whitespace().collect();
        if labels.len() != 10 {
            return Err(PotentialError::MalformedRecord {
                line: first_no,
                details: format!("expected 3 labels and 7 values, found {} fields", labels.len()),
            });
        }
        let triple = InteractionTriple::parse(&labels[..3].concat())?;

        let (second_no, second) = lines.next().ok_or_else(|| PotentialError::MalformedRecord {
            line: first_no,
            details: format!("record '{}' is missing its second line", triple),
        })?;
        if !second.starts_with(' ') {
            return Err(PotentialError::MalformedRecord {
                line: second_no,
                details: "second record line must be indented".to_string(),
            });
        }
        let values: Vec<&str> = second.split_whitespace().collect();
        if values.len() != 7 {
            return Err(PotentialError::MalformedRecord {
                line: second_no,
                details: format!("expected 7 values, found {}", values.len()),
            });
        }

        let mut params = ParameterSet::new();
        parse_fields(&labels[3..], &ParameterName::FIRST_LINE, &mut params, first_no)?;
        parse_fields(&values, &ParameterName::SECOND_LINE, &mut params, second_no)?;
        table.insert(triple, params);
    }

    Ok(table)
}

/// Parses an override document: one TOML table per interaction triple whose keys
/// are parameter symbols.
pub fn parse_overrides(text: &str, origin: &str) -> Result<ParameterOverrides, PotentialError> {
    toml::from_str(text).map_err(|e| PotentialError::Toml {
        path: origin.to_string(),
        source: e,
    })
}

pub fn load_overrides(path: &Path) -> Result<ParameterOverrides, PotentialError> {
    debug!("Loading parameter overrides from {:?}", path);
    let content = std::fs::read_to_string(path).map_err(|e| PotentialError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;
    parse_overrides(&content, &path.to_string_lossy())
}
