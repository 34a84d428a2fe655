mod defaults;

pub use defaults::DefaultsConfig;

use crate::cli::SweepArgs;
use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use vashsweep::core::io::vashishta::load_overrides;
use vashsweep::core::potential::{ParameterOverrides, PotentialError, Substance};
use vashsweep::engine::config::{CommandLine, SimulationConfig, SimulationConfigBuilder};
use vashsweep::workflows::sweep::{SweepPoint, water_charge_angle_grid};

const BASELINE_LABEL: &str = "baseline";

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialPotentialConfig {
    substance: Option<String>,
    header: Option<PathBuf>,
    #[serde(rename = "parameter-file")]
    parameter_file: Option<String>,
    #[serde(rename = "overrides-file")]
    overrides_file: Option<PathBuf>,
    overrides: Option<ParameterOverrides>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialSimulationConfig {
    executable: Option<String>,
    #[serde(rename = "script-template")]
    script_template: Option<PathBuf>,
    #[serde(rename = "script-name")]
    script_name: Option<String>,
    #[serde(rename = "read-data")]
    read_data: Option<String>,
    #[serde(rename = "output-dir")]
    output_dir: Option<PathBuf>,
    #[serde(rename = "log-name")]
    log_name: Option<String>,
    #[serde(rename = "ignore-first")]
    ignore_first: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialAnalysisConfig {
    series: Option<Vec<String>>,
    #[serde(rename = "si-units")]
    si_units: Option<bool>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
struct PartialVisualizationFile {
    input: String,
    output: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialVisualizationConfig {
    command: Option<String>,
    #[serde(default)]
    files: Vec<PartialVisualizationFile>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
struct PartialSweepPoint {
    label: String,
    extension: Option<String>,
    #[serde(default)]
    overrides: ParameterOverrides,
}

impl From<PartialSweepPoint> for SweepPoint {
    fn from(p: PartialSweepPoint) -> Self {
        let extension = p.extension.unwrap_or_else(|| p.label.clone());
        SweepPoint::new(p.label)
            .with_extension(extension)
            .with_overrides(p.overrides)
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
struct PartialWaterGrid {
    charges: Vec<f64>,
    #[serde(rename = "angles-deg")]
    angles_deg: Vec<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialSweepSection {
    #[serde(default)]
    points: Vec<PartialSweepPoint>,
    #[serde(rename = "water-grid")]
    water_grid: Option<PartialWaterGrid>,
}

/// A sweep file as written: every field optional until merged with the command line
/// and [`DefaultsConfig`].
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialSweepConfig {
    potential: Option<PartialPotentialConfig>,
    simulation: Option<PartialSimulationConfig>,
    analysis: Option<PartialAnalysisConfig>,
    visualization: Option<PartialVisualizationConfig>,
    sweep: Option<PartialSweepSection>,
    /// Directory that relative paths in the file are resolved against.
    #[serde(skip)]
    base_dir: PathBuf,
}

/// A fully merged sweep: the simulation settings and the points to run.
#[derive(Debug)]
pub struct SweepPlan {
    pub config: SimulationConfig,
    pub points: Vec<SweepPoint>,
}

impl PartialSweepConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading sweep configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(config)
    }

    fn resolve(&self, path: PathBuf) -> PathBuf {
        if path.is_absolute() {
            path
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn merge_with_cli(mut self, args: &SweepArgs) -> Result<SweepPlan> {
        self.apply_set_values(&args.set_values)?;
        let defaults = DefaultsConfig::default();

        let potential = self.potential.take().unwrap_or_default();
        let simulation = self.simulation.take().unwrap_or_default();
        let analysis = self.analysis.take().unwrap_or_default();
        let visualization = self.visualization.take().unwrap_or_default();
        let sweep = self.sweep.take().unwrap_or_default();

        let substance: Substance = args
            .substance
            .as_deref()
            .or(potential.substance.as_deref())
            .unwrap_or(&defaults.substance)
            .parse()
            .map_err(|e: PotentialError| CliError::Config(e.to_string()))?;

        let executable = args
            .executable
            .as_deref()
            .or(simulation.executable.as_deref())
            .unwrap_or(&defaults.executable);
        let engine = CommandLine::parse(executable, "simulation.executable")
            .map_err(|e| CliError::Config(e.to_string()))?;

        let header = potential.header.clone().ok_or_else(|| {
            CliError::Config("`potential.header` is required in the sweep file.".to_string())
        })?;
        let script_template = simulation.script_template.clone().ok_or_else(|| {
            CliError::Config(
                "`simulation.script-template` is required in the sweep file.".to_string(),
            )
        })?;
        let output_dir = match (&args.output_dir, simulation.output_dir.clone()) {
            (Some(cli), _) => cli.clone(),
            (None, Some(file)) => self.resolve(file),
            (None, None) => PathBuf::from(&defaults.output_dir),
        };

        let overrides = self.merge_overrides(&potential)?;

        let mut builder = SimulationConfigBuilder::new()
            .substance(substance)
            .engine(engine)
            .header_path(self.resolve(header))
            .script_template(self.resolve(script_template))
            .output_dir(output_dir)
            .script_name(
                simulation
                    .script_name
                    .unwrap_or_else(|| defaults.script_name.clone()),
            )
            .log_name(
                simulation
                    .log_name
                    .unwrap_or_else(|| defaults.log_name.clone()),
            )
            .ignore_first(
                args.ignore_first
                    .or(simulation.ignore_first)
                    .unwrap_or(defaults.ignore_first),
            )
            .series(analysis.series.unwrap_or_default())
            .si_units(args.si_units || analysis.si_units.unwrap_or(defaults.si_units))
            .overrides(overrides)
            .dry_run(args.dry_run);

        if let Some(read_data) = simulation.read_data {
            builder = builder.read_data(read_data);
        }
        if let Some(parameter_file) = potential.parameter_file {
            builder = builder.parameter_file(parameter_file);
        }
        if let Some(command) = visualization.command.as_deref() {
            let command = CommandLine::parse(command, "visualization.command")
                .map_err(|e| CliError::Config(e.to_string()))?;
            builder = builder.visualizer(Some(command));
        }
        for file in visualization.files {
            builder = builder.visualize(file.input, file.output);
        }

        let config = builder
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;
        let points = Self::collect_points(sweep);

        Ok(SweepPlan { config, points })
    }

    /// Overrides from `overrides-file` first, then the inline table on top.
    fn merge_overrides(&self, potential: &PartialPotentialConfig) -> Result<ParameterOverrides> {
        let mut merged = match &potential.overrides_file {
            Some(path) => load_overrides(&self.resolve(path.clone()))?,
            None => ParameterOverrides::new(),
        };
        for (triple, values) in potential.overrides.iter().flatten() {
            let entry = merged.entry(triple.clone()).or_default();
            for (name, value) in values {
                entry.insert(name.clone(), *value);
            }
        }
        Ok(merged)
    }

    fn collect_points(sweep: PartialSweepSection) -> Vec<SweepPoint> {
        let mut points: Vec<SweepPoint> = sweep.points.into_iter().map(Into::into).collect();
        if let Some(grid) = sweep.water_grid {
            points.extend(water_charge_angle_grid(&grid.charges, &grid.angles_deg));
        }
        if points.is_empty() {
            info!("No sweep points configured; running the default parameters once.");
            points.push(SweepPoint::new(BASELINE_LABEL));
        }
        points
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let (key, value_str) = kv_pair.split_once('=').ok_or_else(|| {
                CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                ))
            })?;

            match key {
                "simulation.ignore-first" => {
                    self.simulation
                        .get_or_insert_with(Default::default)
                        .ignore_first = Some(value_str.parse().map_err(|_| {
                        CliError::Config(format!(
                            "Invalid integer value for {}: {}",
                            key, value_str
                        ))
                    })?);
                }
                "simulation.log-name" => {
                    self.simulation
                        .get_or_insert_with(Default::default)
                        .log_name = Some(value_str.to_string());
                }
                "simulation.output-dir" => {
                    self.simulation
                        .get_or_insert_with(Default::default)
                        .output_dir = Some(PathBuf::from(value_str));
                }
                "simulation.executable" => {
                    self.simulation
                        .get_or_insert_with(Default::default)
                        .executable = Some(value_str.to_string());
                }
                "analysis.si-units" => {
                    self.analysis
                        .get_or_insert_with(Default::default)
                        .si_units = Some(value_str.parse().map_err(|_| {
                        CliError::Config(format!(
                            "Invalid boolean value for {}: {}",
                            key, value_str
                        ))
                    })?);
                }
                "potential.substance" => {
                    self.potential
                        .get_or_insert_with(Default::default)
                        .substance = Some(value_str.to_string());
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}
