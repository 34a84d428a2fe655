//! Conversion of thermo output from Lennard-Jones reduced units to SI.
//!
//! Reference scales:
//! - Mass: atomic mass unit (amu)
//! - Energy: electronvolt (eV)
//! - Length: angstrom (Å)

/// Atomic mass unit in kilograms.
pub const AMU: f64 = 1.660_539_066_60e-27;
/// Electronvolt in joules.
pub const ELECTRONVOLT: f64 = 1.602_176_634e-19;
/// Angstrom in meters.
pub const ANGSTROM: f64 = 1.0e-10;
/// Boltzmann constant in joules per kelvin.
pub const BOLTZMANN: f64 = 1.380_649e-23;

/// Physical dimension of a thermo column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantity {
    Time,
    Temperature,
    Pressure,
    Energy,
    Volume,
    Dimensionless,
}

impl Quantity {
    /// Classifies a LAMMPS thermo keyword. `Step` counts timesteps and is therefore
    /// dimensionless here; see [`crate::core::io::log::ThermoLog::to_si`].
    pub fn from_column(name: &str) -> Self {
        match name {
            "Time" => Self::Time,
            "Temp" => Self::Temperature,
            "Press" => Self::Pressure,
            "E_pair" | "E_mol" | "TotEng" | "PotEng" | "KinEng" | "Enthalpy" => Self::Energy,
            "Volume" => Self::Volume,
            _ => Self::Dimensionless,
        }
    }
}

/// Reduced-unit system defined by a reference mass, energy and length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LjUnits {
    /// Reference mass in amu.
    pub mass: f64,
    /// Reference energy in eV.
    pub epsilon: f64,
    /// Reference length in Å.
    pub sigma: f64,
}

impl LjUnits {
    pub fn new(mass: f64, epsilon: f64, sigma: f64) -> Self {
        Self {
            mass,
            epsilon,
            sigma,
        }
    }

    /// Units for the reference mass found in a log, with ε = 1 eV and σ = 1 Å.
    pub fn from_reference_mass(mass: f64) -> Self {
        Self::new(mass, 1.0, 1.0)
    }

    fn epsilon_si(&self) -> f64 {
        self.epsilon * ELECTRONVOLT
    }

    fn sigma_si(&self) -> f64 {
        self.sigma * ANGSTROM
    }

    /// Multiplier taking a reduced value of `quantity` to SI.
    pub fn scale(&self, quantity: Quantity) -> f64 {
        match quantity {
            // τ = σ √(m/ε)
            Quantity::Time => self.sigma_si() * (self.mass * AMU / self.epsilon_si()).sqrt(),
            Quantity::Temperature => self.epsilon_si() / BOLTZMANN,
            Quantity::Pressure => self.epsilon_si() / self.sigma_si().powi(3),
            Quantity::Energy => self.epsilon_si(),
            Quantity::Volume => self.sigma_si().powi(3),
            Quantity::Dimensionless => 1.0,
        }
    }

    pub fn convert(&self, quantity: Quantity, values: &[f64]) -> Vec<f64> {
        let factor = self.scale(quantity);
        values.iter().map(|v| v * factor).collect()
    }
}
