use indexmap::IndexMap;
use std::fmt;
use std::ops::Index;
use thiserror::Error;
use tracing::debug;

/// Override mapping as it appears in configuration files:
/// interaction-triple name -> parameter symbol -> value.
pub type ParameterOverrides = IndexMap<String, IndexMap<String, f64>>;

#[derive(Debug, Error)]
pub enum PotentialError {
    #[error("Unknown substance '{0}'. Supported: water (h2o), silica (sio2), silica-water (sio2h2o)")]
    UnknownSubstance(String),

    #[error("{}", unknown_key_message(.triple, .parameter.as_deref()))]
    UnknownKey {
        triple: String,
        parameter: Option<String>,
    },

    #[error("Invalid interaction triple '{0}': expected exactly three element symbols")]
    InvalidTriple(String),

    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },

    #[error("Malformed parameter record on line {line}: {details}")]
    MalformedRecord { line: usize, details: String },
}

fn unknown_key_message(triple: &str, parameter: Option<&str>) -> String {
    match parameter {
        Some(p) => format!("Unknown parameter '{}' for interaction '{}'", p, triple),
        None => format!("Unknown interaction triple '{}'", triple),
    }
}

/// The fixed parameter vocabulary of the Vashishta potential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParameterName {
    H,
    Eta,
    Zi,
    Zj,
    Lambda1,
    D,
    Lambda4,
    W,
    Rc,
    B,
    Gamma,
    R0,
    C,
    CosTheta,
}

impl ParameterName {
    pub const COUNT: usize = 14;

    pub const ALL: [ParameterName; Self::COUNT] = [
        Self::H,
        Self::Eta,
        Self::Zi,
        Self::Zj,
        Self::Lambda1,
        Self::D,
        Self::Lambda4,
        Self::W,
        Self::Rc,
        Self::B,
        Self::Gamma,
        Self::R0,
        Self::C,
        Self::CosTheta,
    ];

    /// Column order of the first record line, after the element labels.
    pub const FIRST_LINE: [ParameterName; 7] = [
        Self::H,
        Self::Eta,
        Self::Zi,
        Self::Zj,
        Self::Lambda1,
        Self::D,
        Self::Lambda4,
    ];

    /// Column order of the second (indented) record line.
    pub const SECOND_LINE: [ParameterName; 7] = [
        Self::W,
        Self::Rc,
        Self::B,
        Self::Gamma,
        Self::R0,
        Self::C,
        Self::CosTheta,
    ];

    pub const fn symbol(self) -> &'static str {
        match self {
            Self::H => "H",
            Self::Eta => "eta",
            Self::Zi => "Zi",
            Self::Zj => "Zj",
            Self::Lambda1 => "lambda1",
            Self::D => "D",
            Self::Lambda4 => "lambda4",
            Self::W => "W",
            Self::Rc => "rc",
            Self::B => "B",
            Self::Gamma => "gamma",
            Self::R0 => "r0",
            Self::C => "C",
            Self::CosTheta => "cos(theta)",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.symbol() == symbol)
    }

    #[inline]
    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ParameterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One value for every [`ParameterName`]; no parameter can be absent.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParameterSet {
    values: [f64; ParameterName::COUNT],
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, name: ParameterName) -> f64 {
        self.values[name.index()]
    }

    #[inline]
    pub fn set(&mut self, name: ParameterName, value: f64) {
        self.values[name.index()] = value;
    }

    pub fn with(mut self, name: ParameterName, value: f64) -> Self {
        self.set(name, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParameterName, f64)> + '_ {
        ParameterName::ALL.into_iter().map(|p| (p, self.get(p)))
    }
}

impl Index<ParameterName> for ParameterSet {
    type Output = f64;

    fn index(&self, name: ParameterName) -> &f64 {
        &self.values[name.index()]
    }
}

/// Splits an interaction name into element symbols at each uppercase letter.
///
/// Returns `None` if the name is empty, starts with a lowercase letter or contains
/// anything other than ASCII letters.
pub fn split_element_symbols(name: &str) -> Option<Vec<&str>> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    if !name.starts_with(|c: char| c.is_ascii_uppercase()) {
        return None;
    }

    let mut symbols = Vec::new();
    let mut start = 0;
    for (i, c) in name.char_indices().skip(1) {
        if c.is_ascii_uppercase() {
            symbols.push(&name[start..i]);
            start = i;
        }
    }
    symbols.push(&name[start..]);
    Some(symbols)
}

/// A three-element interaction key such as `SiOO`; the first element is the
/// central atom of the three-body term.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InteractionTriple {
    name: String,
    elements: [String; 3],
}

impl InteractionTriple {
    pub fn parse(name: &str) -> Result<Self, PotentialError> {
        let symbols = split_element_symbols(name)
            .filter(|s| s.len() == 3)
            .ok_or_else(|| PotentialError::InvalidTriple(name.to_string()))?;
        Ok(Self {
            name: name.to_string(),
            elements: [
                symbols[0].to_string(),
                symbols[1].to_string(),
                symbols[2].to_string(),
            ],
        })
    }

    pub fn from_elements(i: &str, j: &str, k: &str) -> Self {
        Self {
            name: format!("{}{}{}", i, j, k),
            elements: [i.to_string(), j.to_string(), k.to_string()],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn elements(&self) -> &[String; 3] {
        &self.elements
    }
}

impl fmt::Display for InteractionTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InteractionRecord {
    pub triple: InteractionTriple,
    pub parameters: ParameterSet,
}

/// Ordered interaction table. Iteration follows insertion order, which for the
/// built-in defaults is the order the engine expects the records in.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InteractionParameterSet {
    entries: IndexMap<String, InteractionRecord>,
}

impl InteractionParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, triple: InteractionTriple, parameters: ParameterSet) {
        self.entries.insert(
            triple.name().to_string(),
            InteractionRecord { triple, parameters },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, triple: &str) -> Option<&ParameterSet> {
        self.entries.get(triple).map(|r| &r.parameters)
    }

    pub fn records(&self) -> impl Iterator<Item = &InteractionRecord> {
        self.entries.values()
    }

    pub fn triple_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Overwrites default values with those in `overrides`.
    ///
    /// Every key is resolved before any value is written, so a rejected override
    /// leaves the table unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`PotentialError::UnknownKey`] if an interaction triple is not part of
    /// the table or a parameter symbol is outside the vocabulary.
    pub fn apply_overrides(
        &mut self,
        overrides: &ParameterOverrides,
    ) -> Result<(), PotentialError> {
        let mut resolved = Vec::new();
        for (triple, params) in overrides {
            let index = self
                .entries
                .get_index_of(triple.as_str())
                .ok_or_else(|| PotentialError::UnknownKey {
                    triple: triple.clone(),
                    parameter: None,
                })?;
            for (symbol, &value) in params {
                let name =
                    ParameterName::from_symbol(symbol).ok_or_else(|| PotentialError::UnknownKey {
                        triple: triple.clone(),
                        parameter: Some(symbol.clone()),
                    })?;
                resolved.push((index, name, value));
            }
        }

        for (index, name, value) in resolved {
            if let Some((triple, record)) = self.entries.get_index_mut(index) {
                debug!("Override {}.{} = {}", triple, name, value);
                record.parameters.set(name, value);
            }
        }
        Ok(())
    }
}

impl FromIterator<(InteractionTriple, ParameterSet)> for InteractionParameterSet {
    fn from_iter<I: IntoIterator<Item = (InteractionTriple, ParameterSet)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (triple, parameters) in iter {
            table.insert(triple, parameters);
        }
        table
    }
}

/// Atomic masses keyed by element symbol, in atom-type order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementMassTable {
    masses: IndexMap<String, f64>,
}

impl ElementMassTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, symbol: &str, mass: f64) {
        self.masses.insert(symbol.to_string(), mass);
    }

    pub fn get(&self, symbol: &str) -> Option<f64> {
        self.masses.get(symbol).copied()
    }

    pub fn len(&self) -> usize {
        self.masses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.masses.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.masses.iter().map(|(s, &m)| (s.as_str(), m))
    }
}
