use crate::core::units::{LjUnits, Quantity};
use indexmap::IndexMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

const HEADER_TOKEN: &str = "Step";
const TERMINATOR: &str = "Loop time of";
const TIMESTEP_TOKEN: &str = "timestep";
const MASS_TOKEN: &str = "mass";

pub const DEFAULT_TIMESTEP: f64 = 0.005;
pub const DEFAULT_MASS: f64 = 1.0;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed log row on line {line}: {kind}")]
    MalformedRow { line: usize, kind: RowErrorKind },

    #[error(
        "Thermo header on line {line} does not match the earlier header (expected {expected:?}, found {found:?})"
    )]
    InconsistentHeader {
        line: usize,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("No series named '{0}' in log")]
    UnknownSeries(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowErrorKind {
    #[error("expected {expected} columns, found {found}")]
    ColumnCount { expected: usize, found: usize },

    #[error("value '{token}' in column '{column}' is not a number")]
    InvalidNumber { column: String, token: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    /// Outside a thermo block; scalar settings are recognized here.
    Idle,
    /// Between a header line and its terminator; every non-blank line is a data row.
    InBlock,
}

/// Line-driven state machine over a LAMMPS log.
///
/// Lines are fed one at a time with [`push_line`](Self::push_line). After an error
/// the parser can still be [`finish`](Self::finish)ed: every row committed before the
/// offending line is kept, and nothing after it has been read.
#[derive(Debug)]
pub struct LogParser {
    ignore_first: usize,
    state: ParseState,
    columns: Vec<String>,
    blocks: Vec<Vec<Vec<f64>>>,
    timestep: f64,
    mass: f64,
    line: usize,
}

impl LogParser {
    /// `ignore_first` leading blocks (e.g. equilibration runs) are dropped whole.
    pub fn new(ignore_first: usize) -> Self {
        Self {
            ignore_first,
            state: ParseState::Idle,
            columns: Vec::new(),
            blocks: Vec::new(),
            timestep: DEFAULT_TIMESTEP,
            mass: DEFAULT_MASS,
            line: 0,
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    pub fn push_line(&mut self, line: &str) -> Result<(), LogError> {
        self.line += 1;
        let trimmed = line.trim_start();

        if trimmed.starts_with(HEADER_TOKEN) {
            self.open_block(trimmed)
        } else if trimmed.starts_with(TERMINATOR) {
            if self.state == ParseState::InBlock {
                debug!(
                    "Closed thermo block {} on line {}",
                    self.blocks.len(),
                    self.line
                );
            }
            self.state = ParseState::Idle;
            Ok(())
        } else {
            match self.state {
                ParseState::InBlock => self.push_row(trimmed),
                ParseState::Idle => {
                    self.read_scalar(trimmed);
                    Ok(())
                }
            }
        }
    }

    /// Feeds every line of `reader`, stopping at the first error.
    pub fn parse(&mut self, reader: impl BufRead) -> Result<(), LogError> {
        for line in reader.lines() {
            self.push_line(&line?)?;
        }
        Ok(())
    }

    pub fn finish(self) -> ThermoLog {
        let total_blocks = self.blocks.len();
        let mut series: Vec<Vec<f64>> = vec![Vec::new(); self.columns.len()];
        for block in self.blocks.into_iter().skip(self.ignore_first) {
            for (target, column) in series.iter_mut().zip(block) {
                target.extend(column);
            }
        }
        if total_blocks <= self.ignore_first && total_blocks > 0 {
            warn!(
                "All {} thermo block(s) were skipped (ignore_first = {}).",
                total_blocks, self.ignore_first
            );
        }

        ThermoLog {
            columns: self.columns,
            series,
            timestep: self.timestep,
            mass: self.mass,
            blocks_read: total_blocks,
        }
    }

    fn open_block(&mut self, header: &str) -> Result<(), LogError> {
        let found: Vec<String> = header.split_whitespace().map(str::to_string).collect();
        if self.columns.is_empty() {
            debug!("Thermo columns: {:?}", found);
            self.columns = found;
        } else if self.columns != found {
            return Err(LogError::InconsistentHeader {
                line: self.line,
                expected: self.columns.clone(),
                found,
            });
        }
        self.blocks.push(vec![Vec::new(); self.columns.len()]);
        self.state = ParseState::InBlock;
        Ok(())
    }

    fn push_row(&mut self, row: &str) -> Result<(), LogError> {
        let tokens: Vec<&str> = row.split_whitespace().collect();
        if tokens.is_empty() {
            return Ok(());
        }
        if tokens.len() != self.columns.len() {
            return Err(LogError::MalformedRow {
                line: self.line,
                kind: RowErrorKind::ColumnCount {
                    expected: self.columns.len(),
                    found: tokens.len(),
                },
            });
        }

        let mut values = Vec::with_capacity(tokens.len());
        for (token, column) in tokens.iter().zip(&self.columns) {
            let value = token.parse::<f64>().map_err(|_| LogError::MalformedRow {
                line: self.line,
                kind: RowErrorKind::InvalidNumber {
                    column: column.clone(),
                    token: token.to_string(),
                },
            })?;
            values.push(value);
        }

        if let Some(block) = self.blocks.last_mut() {
            for (column, value) in block.iter_mut().zip(values) {
                column.push(value);
            }
        }
        Ok(())
    }

    fn read_scalar(&mut self, line: &str) {
        let mut tokens = line.split_whitespace();
        let target = match tokens.next() {
            Some(TIMESTEP_TOKEN) => &mut self.timestep,
            Some(MASS_TOKEN) => &mut self.mass,
            _ => return,
        };
        match tokens.next().map(str::parse::<f64>) {
            Some(Ok(value)) => *target = value,
            _ => warn!(
                "Ignoring setting without a numeric value on line {}: '{}'",
                self.line,
                line.trim_end()
            ),
        }
    }
}

/// Thermodynamic time series recovered from a log, one per header column, all of
/// equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermoLog {
    columns: Vec<String>,
    series: Vec<Vec<f64>>,
    timestep: f64,
    mass: f64,
    blocks_read: usize,
}

impl ThermoLog {
    pub fn read_from(reader: impl BufRead, ignore_first: usize) -> Result<Self, LogError> {
        let mut parser = LogParser::new(ignore_first);
        parser.parse(reader)?;
        Ok(parser.finish())
    }

    pub fn read_from_path<P: AsRef<Path>>(path: P, ignore_first: usize) -> Result<Self, LogError> {
        debug!("Reading thermo log {:?}", path.as_ref());
        let file = File::open(path)?;
        Self::read_from(BufReader::new(file), ignore_first)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of samples in every series.
    pub fn len(&self) -> usize {
        self.series.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn blocks_read(&self) -> usize {
        self.blocks_read
    }

    pub fn timestep(&self) -> f64 {
        self.timestep
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Series for `name`. A name repeated in the header resolves to its last column.
    pub fn find(&self, name: &str) -> Result<&[f64], LogError> {
        self.columns
            .iter()
            .rposition(|c| c == name)
            .map(|i| self.series[i].as_slice())
            .ok_or_else(|| LogError::UnknownSeries(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.series.iter().map(Vec::as_slice))
    }

    /// `Step` column scaled by the log's timestep.
    pub fn time(&self) -> Result<Vec<f64>, LogError> {
        Ok(self
            .find(HEADER_TOKEN)?
            .iter()
            .map(|step| step * self.timestep)
            .collect())
    }

    /// Every series converted to SI using `units`; `Step` becomes time in seconds.
    pub fn to_si(&self, units: &LjUnits) -> IndexMap<String, Vec<f64>> {
        self.iter()
            .map(|(name, values)| {
                let converted = if name == HEADER_TOKEN {
                    values
                        .iter()
                        .map(|step| step * self.timestep * units.scale(Quantity::Time))
                        .collect()
                } else {
                    units.convert(Quantity::from_column(name), values)
                };
                (name.to_string(), converted)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(text: &str, ignore_first: usize) -> Result<ThermoLog, LogError> {
        ThermoLog::read_from(Cursor::new(text), ignore_first)
    }

    fn block(start: usize, rows: usize) -> String {
        let mut text = String::from("   Step    Temp   Press\n");
        for i in 0..rows {
            let step = start + i;
            text.push_str(&format!(
                "   {}   {}   {}\n",
                step * 10,
                300.0 + step as f64,
                -1.5 * step as f64
            ));
        }
        text.push_str("Loop time of 0.25 on 4 procs for 40 steps with 6000 atoms\n\n");
        text
    }

    #[test]
    fn single_block_yields_one_sample_per_row() {
        let text = format!("LAMMPS (29 Oct 2020)\nunits metal\n{}", block(0, 5));
        let log = parse(&text, 0).unwrap();
        assert_eq!(
            log.find("Temp").unwrap(),
            &[300.0, 301.0, 302.0, 303.0, 304.0]
        );
        assert_eq!(log.len(), 5);
        assert_eq!(log.blocks_read(), 1);
    }

    #[test]
    fn blocks_are_concatenated_in_order() {
        let text = format!("{}{}", block(0, 3), block(3, 4));
        let log = parse(&text, 0).unwrap();
        assert_eq!(log.find("Step").unwrap(), &[0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0]);
    }

    #[test]
    fn ignore_first_drops_whole_leading_blocks() {
        let text = format!("{}{}", block(0, 3), block(3, 4));
        let log = parse(&text, 1).unwrap();
        for (_, values) in log.iter() {
            assert_eq!(values.len(), 4);
        }
        assert_eq!(log.find("Temp").unwrap()[0], 303.0);
        assert_eq!(log.blocks_read(), 2);
    }

    #[test]
    fn ignoring_every_block_leaves_empty_but_known_series() {
        let log = parse(&block(0, 2), 3).unwrap();
        assert!(log.find("Press").unwrap().is_empty());
        assert!(log.is_empty());
    }

    #[test]
    fn unknown_series_is_an_error_not_an_empty_slice() {
        let log = parse(&block(0, 2), 0).unwrap();
        assert!(matches!(
            log.find("Volume"),
            Err(LogError::UnknownSeries(name)) if name == "Volume"
        ));

        let empty = parse("no thermo output here\n", 0).unwrap();
        assert!(matches!(empty.find("Step"), Err(LogError::UnknownSeries(_))));
    }

    #[test]
    fn short_row_stops_parsing_and_keeps_earlier_rows() {
        let text = "Step Temp Press\n0 300 1\n10 301 2\n20 302\n30 303 4\nLoop time of 1\n";
        let mut parser = LogParser::new(0);
        let err = parser.parse(Cursor::new(text)).unwrap_err();
        assert!(matches!(
            err,
            LogError::MalformedRow {
                line: 4,
                kind: RowErrorKind::ColumnCount {
                    expected: 3,
                    found: 2
                }
            }
        ));

        let log = parser.finish();
        assert_eq!(log.find("Temp").unwrap(), &[300.0, 301.0]);
        assert_eq!(log.find("Press").unwrap(), &[1.0, 2.0]);
    }

    #[test]
    fn non_numeric_token_is_fatal() {
        let text = "Step Temp\n0 300\n10 WARNING:\n";
        match parse(text, 0) {
            Err(LogError::MalformedRow {
                line,
                kind: RowErrorKind::InvalidNumber { column, token },
            }) => {
                assert_eq!(line, 3);
                assert_eq!(column, "Temp");
                assert_eq!(token, "WARNING:");
            }
            other => panic!("expected InvalidNumber, got {:?}", other),
        }
    }

    #[test]
    fn state_machine_transitions_on_header_and_terminator() {
        let mut parser = LogParser::new(0);
        assert_eq!(parser.state(), ParseState::Idle);
        parser.push_line("Step Temp").unwrap();
        assert_eq!(parser.state(), ParseState::InBlock);
        parser.push_line("").unwrap();
        parser.push_line("0 1.0").unwrap();
        assert_eq!(parser.state(), ParseState::InBlock);
        parser.push_line("Loop time of 0.1 on 1 procs").unwrap();
        assert_eq!(parser.state(), ParseState::Idle);
        parser.push_line("Total wall time: 0:00:01").unwrap();
        assert_eq!(parser.finish().find("Temp").unwrap(), &[1.0]);
    }

    #[test]
    fn scalars_are_read_outside_blocks_with_last_one_winning() {
        let text = format!(
            "timestep 0.001\nmass 18.0\n{}timestep 0.0005\n",
            block(0, 2)
        );
        let log = parse(&text, 0).unwrap();
        assert_eq!(log.timestep(), 0.0005);
        assert_eq!(log.mass(), 18.0);
    }

    #[test]
    fn scalars_default_when_absent() {
        let log = parse(&block(0, 1), 0).unwrap();
        assert_eq!(log.timestep(), DEFAULT_TIMESTEP);
        assert_eq!(log.mass(), DEFAULT_MASS);
    }

    #[test]
    fn non_numeric_scalar_keeps_previous_value() {
        let log = parse("timestep ${dt}\n", 0).unwrap();
        assert_eq!(log.timestep(), DEFAULT_TIMESTEP);
    }

    #[test]
    fn differing_headers_are_rejected() {
        let text = format!("{}Step Temp\n", block(0, 1));
        assert!(matches!(
            parse(&text, 0),
            Err(LogError::InconsistentHeader { line: 5, .. })
        ));
    }

    #[test]
    fn time_scales_steps_by_timestep() {
        let text = format!("timestep 0.5\n{}", block(0, 3));
        let log = parse(&text, 0).unwrap();
        assert_eq!(log.time().unwrap(), vec![0.0, 5.0, 10.0]);
    }

    #[test]
    fn si_conversion_scales_physical_columns() {
        let text = format!("timestep 2\n{}", block(0, 2));
        let log = parse(&text, 0).unwrap();
        let units = LjUnits::from_reference_mass(1.0);
        let si = log.to_si(&units);

        let tau = units.scale(Quantity::Time);
        assert!((si["Step"][1] - 20.0 * tau).abs() < 1e-30);
        let t_scale = units.scale(Quantity::Temperature);
        assert!((si["Temp"][0] - 300.0 * t_scale).abs() / (300.0 * t_scale) < 1e-12);
        assert_eq!(si.len(), 3);
    }
}
