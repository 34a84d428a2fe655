use super::params::{
    ElementMassTable, InteractionParameterSet, InteractionTriple, ParameterName, ParameterSet,
    PotentialError,
};
use phf::phf_map;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

static STANDARD_MASSES: phf::Map<&'static str, f64> = phf_map! {
    "H" => 1.00794,
    "O" => 15.9994,
    "Si" => 28.0855,
};

/// Atomic mass (amu) of a supported element.
pub fn standard_mass(symbol: &str) -> Option<f64> {
    STANDARD_MASSES.get(symbol).copied()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Substance {
    Water,
    Silica,
    SilicaWater,
}

impl Substance {
    pub const ALL: [Substance; 3] = [Self::Water, Self::Silica, Self::SilicaWater];

    pub const fn key(self) -> &'static str {
        match self {
            Self::Water => "water",
            Self::Silica => "silica",
            Self::SilicaWater => "silica-water",
        }
    }

    pub const fn formula(self) -> &'static str {
        match self {
            Self::Water => "H2O",
            Self::Silica => "SiO2",
            Self::SilicaWater => "SiO2H2O",
        }
    }

    /// Conventional name of the generated parameter file, e.g. `H2O.vashishta`.
    pub fn parameter_file_name(self) -> String {
        format!("{}.vashishta", self.formula())
    }

    /// Element symbols in LAMMPS atom-type order.
    pub fn elements(self) -> Vec<&'static str> {
        self.defaults().elements.iter().map(|e| e.symbol).collect()
    }

    fn defaults(self) -> &'static PotentialDefaults {
        match self {
            Self::Water => &WATER,
            Self::Silica => &SILICA,
            Self::SilicaWater => &SILICA_WATER,
        }
    }
}

impl FromStr for Substance {
    type Err = PotentialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "water" | "h2o" => Ok(Self::Water),
            "silica" | "sio2" => Ok(Self::Silica),
            "silica-water" | "sio2h2o" => Ok(Self::SilicaWater),
            _ => Err(PotentialError::UnknownSubstance(s.to_string())),
        }
    }
}

impl TryFrom<String> for Substance {
    type Error = PotentialError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Substance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

struct ElementTerms {
    symbol: &'static str,
    charge: f64,
}

#[derive(Clone, Copy, Default)]
struct PairTerms {
    h: f64,
    eta: f64,
    d: f64,
    w: f64,
}

#[derive(Clone, Copy, Default)]
struct AngleTerms {
    b: f64,
    gamma: f64,
    r0: f64,
    c: f64,
    cos_theta: f64,
}

struct PotentialDefaults {
    elements: &'static [ElementTerms],
    lambda1: f64,
    lambda4: f64,
    rc: f64,
    pairs: &'static [(&'static str, &'static str, PairTerms)],
    // (center, j, k)
    angles: &'static [(&'static str, &'static str, &'static str, AngleTerms)],
}

impl PotentialDefaults {
    fn charge(&self, symbol: &str) -> f64 {
        self.elements
            .iter()
            .find(|e| e.symbol == symbol)
            .map_or(0.0, |e| e.charge)
    }

    fn pair(&self, a: &str, b: &str) -> PairTerms {
        self.pairs
            .iter()
            .find(|(x, y, _)| (*x == a && *y == b) || (*x == b && *y == a))
            .map(|(_, _, terms)| *terms)
            .unwrap_or_default()
    }

    fn angle(&self, center: &str, j: &str, k: &str) -> AngleTerms {
        self.angles
            .iter()
            .find(|(c, x, y, _)| *c == center && ((*x == j && *y == k) || (*x == k && *y == j)))
            .map(|(_, _, _, terms)| *terms)
            .unwrap_or_default()
    }

    fn parameters(&self, i: &str, j: &str, k: &str) -> ParameterSet {
        let pair = self.pair(i, j);
        let angle = self.angle(i, j, k);
        ParameterSet::new()
            .with(ParameterName::H, pair.h)
            .with(ParameterName::Eta, pair.eta)
            .with(ParameterName::Zi, self.charge(i))
            .with(ParameterName::Zj, self.charge(j))
            .with(ParameterName::Lambda1, self.lambda1)
            .with(ParameterName::D, pair.d)
            .with(ParameterName::Lambda4, self.lambda4)
            .with(ParameterName::W, pair.w)
            .with(ParameterName::Rc, self.rc)
            .with(ParameterName::B, angle.b)
            .with(ParameterName::Gamma, angle.gamma)
            .with(ParameterName::R0, angle.r0)
            .with(ParameterName::C, angle.c)
            .with(ParameterName::CosTheta, angle.cos_theta)
    }
}

const SI_SI: PairTerms = PairTerms { h: 0.82023, eta: 11.0, d: 0.0, w: 0.0 };
const SI_O: PairTerms = PairTerms { h: 163.859, eta: 9.0, d: 3.456, w: 0.0 };
const O_O: PairTerms = PairTerms { h: 743.848, eta: 7.0, d: 1.728, w: 0.0 };
const O_H: PairTerms = PairTerms { h: 0.61, eta: 9.0, d: 0.5536, w: 0.0 };
const H_H: PairTerms = PairTerms { h: 0.0, eta: 9.0, d: 0.0, w: 0.0 };
const SI_H: PairTerms = PairTerms { h: 0.82023, eta: 9.0, d: 0.0, w: 0.0 };

const O_SI_O: AngleTerms = AngleTerms {
    b: 4.993,
    gamma: 1.0,
    r0: 2.6,
    c: 0.0,
    cos_theta: -0.333333333333,
};
const SI_O_SI: AngleTerms = AngleTerms {
    b: 19.972,
    gamma: 1.0,
    r0: 2.6,
    c: 0.0,
    cos_theta: -0.777145961457,
};
const H_O_H: AngleTerms = AngleTerms {
    b: 52.9,
    gamma: 0.75,
    r0: 1.4,
    c: 0.0,
    cos_theta: -0.249535040626,
};
const SI_O_H: AngleTerms = AngleTerms {
    b: 10.0,
    gamma: 1.0,
    r0: 1.6,
    c: 0.0,
    cos_theta: -0.469471562786,
};

static WATER: PotentialDefaults = PotentialDefaults {
    elements: &[
        ElementTerms { symbol: "O", charge: -1.04 },
        ElementTerms { symbol: "H", charge: 0.52 },
    ],
    lambda1: 4.43,
    lambda4: 2.5,
    rc: 5.5,
    pairs: &[("O", "O", O_O), ("O", "H", O_H), ("H", "H", H_H)],
    angles: &[("O", "H", "H", H_O_H)],
};

static SILICA: PotentialDefaults = PotentialDefaults {
    elements: &[
        ElementTerms { symbol: "Si", charge: 1.6 },
        ElementTerms { symbol: "O", charge: -0.8 },
    ],
    lambda1: 4.43,
    lambda4: 2.5,
    rc: 5.5,
    pairs: &[("Si", "Si", SI_SI), ("Si", "O", SI_O), ("O", "O", O_O)],
    angles: &[("Si", "O", "O", O_SI_O), ("O", "Si", "Si", SI_O_SI)],
};

static SILICA_WATER: PotentialDefaults = PotentialDefaults {
    elements: &[
        ElementTerms { symbol: "Si", charge: 1.6 },
        ElementTerms { symbol: "O", charge: -0.8 },
        ElementTerms { symbol: "H", charge: 0.4 },
    ],
    lambda1: 4.43,
    lambda4: 2.5,
    rc: 5.5,
    pairs: &[
        ("Si", "Si", SI_SI),
        ("Si", "O", SI_O),
        ("O", "O", O_O),
        ("O", "H", O_H),
        ("H", "H", H_H),
        ("Si", "H", SI_H),
    ],
    angles: &[
        ("Si", "O", "O", O_SI_O),
        ("O", "Si", "Si", SI_O_SI),
        ("O", "H", "H", H_O_H),
        ("O", "Si", "H", SI_O_H),
    ],
};

/// Builds the default interaction table and element masses for `substance`.
///
/// Every ordered triple over the substance's elements is present, enumerated in
/// element order (`SiSiSi`, `SiSiO`, `SiOSi`, ...). Two-body columns of `ijk` come
/// from the `i-j` pair and three-body columns from the angle centred on `i`.
pub fn build_default_table(substance: Substance) -> (InteractionParameterSet, ElementMassTable) {
    let defaults = substance.defaults();
    let symbols: Vec<_> = defaults.elements.iter().map(|e| e.symbol).collect();

    let mut table = InteractionParameterSet::new();
    for &i in &symbols {
        for &j in &symbols {
            for &k in &symbols {
                table.insert(
                    InteractionTriple::from_elements(i, j, k),
                    defaults.parameters(i, j, k),
                );
            }
        }
    }

    let mut masses = ElementMassTable::new();
    for &symbol in &symbols {
        masses.insert(symbol, standard_mass(symbol).unwrap_or_default());
    }

    (table, masses)
}

/// Like [`build_default_table`], resolving the substance from its textual key.
pub fn default_table_for(
    key: &str,
) -> Result<(InteractionParameterSet, ElementMassTable), PotentialError> {
    Ok(build_default_table(key.parse()?))
}
