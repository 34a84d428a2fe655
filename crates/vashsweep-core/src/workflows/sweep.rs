use crate::core::io::atomic::write_atomically;
use crate::core::io::log::ThermoLog;
use crate::core::io::vashishta::ParameterFileWriter;
use crate::core::potential::{ParameterOverrides, build_default_table};
use crate::core::units::LjUnits;
use crate::engine::config::SimulationConfig;
use crate::engine::error::EngineError;
use crate::engine::process::{SimulationEngine, Visualizer};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::script::{InputScript, ScriptVariables, substitute};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

pub const SERIES_FILE: &str = "series.csv";

/// One run of the sweep: a directory label, the value bound to `{{extension}}` and
/// the overrides applied on top of the configured ones.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepPoint {
    pub label: String,
    pub extension: String,
    pub overrides: ParameterOverrides,
}

impl SweepPoint {
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            extension: label.clone(),
            label,
            overrides: ParameterOverrides::new(),
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_overrides(mut self, overrides: ParameterOverrides) -> Self {
        self.overrides = overrides;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointOutcome {
    pub label: String,
    pub directory: PathBuf,
    pub parameter_file: PathBuf,
    pub input_script: PathBuf,
    /// Exported series; `None` when the engine was not run.
    pub series: Option<IndexMap<String, Vec<f64>>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SweepResult {
    pub points: Vec<PointOutcome>,
}

/// The water charge/angle grid: for every hydrogen charge `Z_H` and H-O-H angle
/// (degrees), oxygen carries `Z_O = -2 Z_H` and the `OHH` three-body term is centred
/// on the given angle.
pub fn water_charge_angle_grid(charges: &[f64], angles_deg: &[f64]) -> Vec<SweepPoint> {
    let mut points = Vec::with_capacity(charges.len() * angles_deg.len());
    for &z_h in charges {
        let z_o = -2.0 * z_h;
        for &angle in angles_deg {
            let mut overrides = ParameterOverrides::new();
            let mut set = |triple: &str, values: &[(&str, f64)]| {
                let entry = overrides.entry(triple.to_string()).or_default();
                for &(name, value) in values {
                    entry.insert(name.to_string(), value);
                }
            };
            set("HHH", &[("Zi", z_h), ("Zj", z_h)]);
            set("OOO", &[("Zi", z_o), ("Zj", z_o)]);
            set(
                "OHH",
                &[("Zi", z_o), ("Zj", z_h), ("cos(theta)", angle.to_radians().cos())],
            );
            set("HOO", &[("Zi", z_h), ("Zj", z_o)]);

            points.push(
                SweepPoint::new(format!("ZH{}_theta{}", z_h, angle))
                    .with_extension(z_h.to_string())
                    .with_overrides(overrides),
            );
        }
    }
    points
}

#[instrument(skip_all, name = "sweep_workflow", fields(points = points.len()))]
pub fn run(
    config: &SimulationConfig,
    points: &[SweepPoint],
    engine: &dyn SimulationEngine,
    visualizer: &dyn Visualizer,
    reporter: &ProgressReporter,
) -> Result<SweepResult, EngineError> {
    reporter.report(Progress::SweepStart {
        total_points: points.len() as u64,
    });
    info!(
        "Starting {} sweep over {} point(s) in {:?}.",
        config.substance,
        points.len(),
        config.output_dir
    );

    let writer = ParameterFileWriter::from_header_path(&config.header_path)?;
    let script = InputScript::from_path(&config.script_template)?;

    let mut result = SweepResult::default();
    for point in points {
        reporter.report(Progress::PointStart {
            label: point.label.clone(),
        });
        let outcome = run_point(config, point, &writer, &script, engine, visualizer, reporter)?;
        result.points.push(outcome);
        reporter.report(Progress::PointFinish);
    }

    reporter.report(Progress::SweepFinish);
    info!("Sweep complete. {} point(s) processed.", result.points.len());
    Ok(result)
}

fn run_point(
    config: &SimulationConfig,
    point: &SweepPoint,
    writer: &ParameterFileWriter,
    script: &InputScript,
    engine: &dyn SimulationEngine,
    visualizer: &dyn Visualizer,
    reporter: &ProgressReporter,
) -> Result<PointOutcome, EngineError> {
    let (mut table, masses) = build_default_table(config.substance);
    table.apply_overrides(&config.overrides)?;
    table.apply_overrides(&point.overrides)?;

    let directory = config.output_dir.join(&point.label);
    std::fs::create_dir_all(&directory).map_err(|e| io_error(&directory, e))?;

    let parameter_file = directory.join(&config.parameter_file);
    writer.write_to_path(&table, &parameter_file)?;

    let variables = ScriptVariables::new(
        &point.extension,
        &config.read_data,
        &config.parameter_file,
        &masses,
    );
    let input_script = directory.join(&config.script_name);
    script.write_to_path(&variables, &input_script)?;

    let mut outcome = PointOutcome {
        label: point.label.clone(),
        directory: directory.clone(),
        parameter_file,
        input_script,
        series: None,
    };

    if config.dry_run {
        info!("Prepared '{}' (dry run, engine not started).", point.label);
        return Ok(outcome);
    }

    engine.run(Path::new(&config.script_name), &directory)?;

    let log_path = directory.join(substitute(&config.log_name, &variables)?);
    let log = ThermoLog::read_from_path(&log_path, config.analysis.ignore_first)?;
    debug!(
        "Parsed {} sample(s) from {} block(s) of {:?}",
        log.len(),
        log.blocks_read(),
        log_path
    );

    let series = select_series(&log, &config.analysis.series, config.analysis.si_units)?;
    write_series_csv(&directory.join(SERIES_FILE), &series)?;

    for request in &config.visualizations {
        let input = directory.join(substitute(&request.input, &variables)?);
        let output = directory.join(substitute(&request.output, &variables)?);
        if let Err(e) = visualizer.visualize(&input, &output) {
            warn!("Visualization of {:?} failed: {}", input, e);
            reporter.report(Progress::Message(format!(
                "'{}': visualization of {} failed: {}",
                point.label,
                input.display(),
                e
            )));
        }
    }

    outcome.series = Some(series);
    info!("Finished '{}'.", point.label);
    Ok(outcome)
}

/// Picks `names` (every column when empty) from `log`, converted to SI on request.
pub fn select_series(
    log: &ThermoLog,
    names: &[String],
    si_units: bool,
) -> Result<IndexMap<String, Vec<f64>>, EngineError> {
    let all: IndexMap<String, Vec<f64>> = if si_units {
        log.to_si(&LjUnits::from_reference_mass(log.mass()))
    } else {
        log.iter()
            .map(|(name, values)| (name.to_string(), values.to_vec()))
            .collect()
    };
    if names.is_empty() {
        return Ok(all);
    }

    let mut selected = IndexMap::with_capacity(names.len());
    for name in names {
        log.find(name)?;
        if let Some(values) = all.get(name) {
            selected.insert(name.clone(), values.clone());
        }
    }
    Ok(selected)
}

/// Writes `series` column-wise with a header row of series names.
pub fn write_series_csv(
    path: &Path,
    series: &IndexMap<String, Vec<f64>>,
) -> Result<(), EngineError> {
    let export_error = |e: csv::Error| EngineError::Export {
        path: path.to_string_lossy().to_string(),
        source: e,
    };

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(series.keys())
        .map_err(export_error)?;
    let rows = series.values().map(Vec::len).min().unwrap_or(0);
    for row in 0..rows {
        writer
            .write_record(series.values().map(|values| values[row].to_string()))
            .map_err(export_error)?;
    }
    let buffer = writer
        .into_inner()
        .map_err(|e| io_error(path, e.into_error()))?;

    write_atomically(path, &buffer).map_err(|e| io_error(path, e))
}

fn io_error(path: &Path, source: std::io::Error) -> EngineError {
    EngineError::Io {
        path: path.to_string_lossy().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::log::LogError;
    use crate::core::io::vashishta::read_records;
    use crate::core::potential::{ParameterName, Substance};
    use crate::engine::config::{CommandLine, SimulationConfigBuilder};
    use crate::engine::process::NoVisualizer;
    use std::cell::RefCell;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::{TempDir, tempdir};

    const HEADER: &str = "# Vashishta parameters\n";
    const TEMPLATE: &str = "variable extension equal {{extension}}\nread_data {{read_data}}\n\
                            pair_coeff * * {{parameter_file}} {{elements}}\n{{masses}}\n";

    fn log_text() -> String {
        let mut text = String::from("timestep 0.002\nmass 1 15.9994\n");
        for block in 0..2 {
            text.push_str("Step Temp TotEng\n");
            for i in 0..3 {
                let step = block * 3 + i;
                text.push_str(&format!("{} {} {}\n", step, 300 + step, -1.5));
            }
            text.push_str("Loop time of 1.0 on 1 procs\n");
        }
        text
    }

    /// Writes a canned log into the working directory instead of simulating.
    struct FakeEngine {
        log_name: String,
        calls: RefCell<Vec<PathBuf>>,
    }

    impl FakeEngine {
        fn new(log_name: &str) -> Self {
            Self {
                log_name: log_name.to_string(),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl SimulationEngine for FakeEngine {
        fn run(&self, input_script: &Path, working_dir: &Path) -> Result<(), EngineError> {
            assert!(working_dir.join(input_script).exists());
            self.calls.borrow_mut().push(working_dir.to_path_buf());
            fs::write(working_dir.join(&self.log_name), log_text()).unwrap();
            Ok(())
        }
    }

    struct FailingEngine;

    impl SimulationEngine for FailingEngine {
        fn run(&self, _: &Path, _: &Path) -> Result<(), EngineError> {
            Err(EngineError::EngineFailed {
                command: "lmp".to_string(),
                code: Some(1),
            })
        }
    }

    struct FailingVisualizer {
        calls: RefCell<usize>,
    }

    impl Visualizer for FailingVisualizer {
        fn visualize(&self, _: &Path, _: &Path) -> Result<(), EngineError> {
            *self.calls.borrow_mut() += 1;
            Err(EngineError::EngineFailed {
                command: "ovito".to_string(),
                code: Some(2),
            })
        }
    }

    fn setup() -> (TempDir, SimulationConfigBuilder) {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("header.vashishta"), HEADER).unwrap();
        fs::write(dir.path().join("shell.in"), TEMPLATE).unwrap();
        let builder = SimulationConfigBuilder::new()
            .substance(Substance::Water)
            .engine(CommandLine::new("lmp"))
            .script_template(dir.path().join("shell.in"))
            .header_path(dir.path().join("header.vashishta"))
            .read_data("../water.data")
            .output_dir(dir.path().join("runs"));
        (dir, builder)
    }

    #[test]
    fn grid_couples_oxygen_charge_and_converts_angle() {
        let points = water_charge_angle_grid(&[0.4, 0.5], &[90.0, 104.5]);
        let labels: Vec<_> = points.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["ZH0.4_theta90", "ZH0.4_theta104.5", "ZH0.5_theta90", "ZH0.5_theta104.5"]
        );

        let point = &points[0];
        assert_eq!(point.extension, "0.4");
        assert_eq!(point.overrides["OOO"]["Zi"], -0.8);
        assert_eq!(point.overrides["HOO"]["Zj"], -0.8);
        assert_eq!(point.overrides["HHH"]["Zj"], 0.4);
        assert!(point.overrides["OHH"]["cos(theta)"].abs() < 1e-15);
        assert_eq!(point.overrides.len(), 4);
    }

    #[test]
    fn sweep_writes_artifacts_and_series_per_point() {
        let (_dir, builder) = setup();
        let config = builder
            .log_name("log.{{extension}}")
            .ignore_first(1)
            .series(vec!["Step".to_string(), "Temp".to_string()])
            .visualize("water.{{extension}}.data", "water.{{extension}}.png")
            .build()
            .unwrap();
        let engine = FakeEngine::new("log.0.45");
        let points = water_charge_angle_grid(&[0.45], &[100.0]);

        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            events.lock().unwrap().push(format!("{:?}", event));
        }));
        let result = run(&config, &points, &engine, &NoVisualizer, &reporter).unwrap();

        assert_eq!(result.points.len(), 1);
        let outcome = &result.points[0];
        assert_eq!(outcome.directory, config.output_dir.join("ZH0.45_theta100"));
        assert_eq!(engine.calls.borrow().as_slice(), &[outcome.directory.clone()]);

        let written = fs::read_to_string(&outcome.parameter_file).unwrap();
        let table = read_records(&written[HEADER.len()..]).unwrap();
        assert_eq!(table.get("OOO").unwrap()[ParameterName::Zi], -0.9);
        assert_eq!(table.get("HHH").unwrap()[ParameterName::Zj], 0.45);

        let script = fs::read_to_string(&outcome.input_script).unwrap();
        assert!(script.starts_with("variable extension equal 0.45\n"));
        assert!(script.contains("pair_coeff * * H2O.vashishta O H\n"));

        let series = outcome.series.as_ref().unwrap();
        assert_eq!(series["Step"], vec![3.0, 4.0, 5.0]);
        assert_eq!(series["Temp"], vec![303.0, 304.0, 305.0]);
        assert!(!series.contains_key("TotEng"));

        let csv = fs::read_to_string(outcome.directory.join(SERIES_FILE)).unwrap();
        assert_eq!(csv, "Step,Temp\n3,303\n4,304\n5,305\n");

        drop(reporter);
        let events = events.into_inner().unwrap();
        assert_eq!(events.first().unwrap(), "SweepStart { total_points: 1 }");
        assert_eq!(events.last().unwrap(), "SweepFinish");
    }

    #[test]
    fn si_export_scales_thermo_columns() {
        let (_dir, builder) = setup();
        let config = builder
            .series(vec!["TotEng".to_string()])
            .si_units(true)
            .build()
            .unwrap();
        let engine = FakeEngine::new(&config.log_name);
        let result = run(
            &config,
            &[SweepPoint::new("base")],
            &engine,
            &NoVisualizer,
            &ProgressReporter::new(),
        )
        .unwrap();
        let energy = &result.points[0].series.as_ref().unwrap()["TotEng"];
        assert_eq!(energy.len(), 6);
        assert!((energy[0] - -1.5 * 1.602_176_634e-19).abs() < 1e-30);
    }

    #[test]
    fn dry_run_prepares_without_running_engine() {
        let (_dir, builder) = setup();
        let config = builder.dry_run(true).build().unwrap();
        let result = run(
            &config,
            &water_charge_angle_grid(&[0.4], &[95.0, 96.0]),
            &FailingEngine,
            &NoVisualizer,
            &ProgressReporter::new(),
        )
        .unwrap();

        assert_eq!(result.points.len(), 2);
        for outcome in &result.points {
            assert!(outcome.parameter_file.exists());
            assert!(outcome.input_script.exists());
            assert!(outcome.series.is_none());
            assert!(!outcome.directory.join(SERIES_FILE).exists());
        }
    }

    #[test]
    fn engine_failure_aborts_the_sweep() {
        let (_dir, builder) = setup();
        let config = builder.build().unwrap();
        let result = run(
            &config,
            &[SweepPoint::new("a"), SweepPoint::new("b")],
            &FailingEngine,
            &NoVisualizer,
            &ProgressReporter::new(),
        );
        assert!(matches!(result, Err(EngineError::EngineFailed { .. })));
        assert!(config.output_dir.join("a").exists());
        assert!(!config.output_dir.join("b").exists());
    }

    #[test]
    fn unknown_override_stops_before_writing() {
        let (_dir, builder) = setup();
        let config = builder.build().unwrap();
        let mut overrides = ParameterOverrides::new();
        overrides
            .entry("SiSiSi".to_string())
            .or_default()
            .insert("H".to_string(), 1.0);
        let point = SweepPoint::new("bad").with_overrides(overrides);

        let result = run(
            &config,
            &[point],
            &FakeEngine::new(&config.log_name),
            &NoVisualizer,
            &ProgressReporter::new(),
        );
        assert!(matches!(result, Err(EngineError::Potential { .. })));
        assert!(!config.output_dir.join("bad").exists());
    }

    #[test]
    fn unknown_series_is_reported() {
        let (_dir, builder) = setup();
        let config = builder.series(vec!["Density".to_string()]).build().unwrap();
        let result = run(
            &config,
            &[SweepPoint::new("p")],
            &FakeEngine::new(&config.log_name),
            &NoVisualizer,
            &ProgressReporter::new(),
        );
        assert!(matches!(
            result,
            Err(EngineError::Log {
                source: LogError::UnknownSeries(ref name)
            }) if name == "Density"
        ));
    }

    #[test]
    fn visualization_failures_do_not_abort() {
        let (_dir, builder) = setup();
        let config = builder
            .visualize("a.data", "a.png")
            .visualize("b.data", "b.png")
            .build()
            .unwrap();
        let visualizer = FailingVisualizer {
            calls: RefCell::new(0),
        };
        let messages = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::Message(text) = event {
                messages.lock().unwrap().push(text);
            }
        }));
        let result = run(
            &config,
            &[SweepPoint::new("p")],
            &FakeEngine::new(&config.log_name),
            &visualizer,
            &reporter,
        );
        assert!(result.is_ok());
        assert_eq!(*visualizer.calls.borrow(), 2);

        drop(reporter);
        let messages = messages.into_inner().unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].starts_with("'p': visualization of "));
        assert!(messages[0].contains("a.data failed"));
        assert!(messages[1].contains("b.data failed"));
    }
}
