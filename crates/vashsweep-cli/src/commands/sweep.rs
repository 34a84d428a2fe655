use crate::cli::SweepArgs;
use crate::config::PartialSweepConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use tracing::{info, warn};
use vashsweep::engine::process::{CommandVisualizer, ExternalEngine, NoVisualizer, Visualizer};
use vashsweep::engine::progress::ProgressReporter;
use vashsweep::workflows;

pub fn run(args: SweepArgs) -> Result<()> {
    let partial_config = PartialSweepConfig::from_file(&args.config)?;
    info!("Merging configuration from file and CLI arguments...");
    let plan = partial_config.merge_with_cli(&args)?;

    let engine = ExternalEngine::new(plan.config.engine.clone());
    let visualizer: Box<dyn Visualizer> = match &plan.config.visualizer {
        Some(command) => Box::new(CommandVisualizer::new(command.clone())),
        None => {
            if !plan.config.visualizations.is_empty() {
                warn!("Visualization files are configured but no visualization command is set.");
            }
            Box::new(NoVisualizer)
        }
    };

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    if plan.config.dry_run {
        println!(
            "Preparing {} sweep point(s) (dry run)...",
            plan.points.len()
        );
    } else {
        println!(
            "Starting sweep over {} point(s) with '{}'...",
            plan.points.len(),
            plan.config.engine
        );
    }
    info!("Invoking the core sweep workflow...");

    let result = workflows::sweep::run(
        &plan.config,
        &plan.points,
        &engine,
        visualizer.as_ref(),
        &reporter,
    )?;

    for outcome in &result.points {
        match &outcome.series {
            Some(series) => println!(
                "  ✓ {} -> {} ({} series)",
                outcome.label,
                outcome.directory.display(),
                series.len()
            ),
            None => println!("  ✓ {} -> {}", outcome.label, outcome.directory.display()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use crate::error::CliError;
    use clap::Parser;
    use std::fs;
    use tempfile::tempdir;
    use vashsweep::engine::error::EngineError;

    fn sweep_args(args: &[&str]) -> SweepArgs {
        let mut argv = vec!["vashsweep", "sweep"];
        argv.extend_from_slice(args);
        match Cli::parse_from(argv).command {
            Commands::Sweep(args) => args,
            other => panic!("Expected 'sweep' subcommand, got {:?}", other),
        }
    }

    fn write_inputs(dir: &std::path::Path) -> std::path::PathBuf {
        fs::write(dir.join("header.vashishta"), "# header\n").unwrap();
        fs::write(
            dir.join("shell.in"),
            "read_data {{read_data}}\npair_coeff * * {{parameter_file}} {{elements}}\n",
        )
        .unwrap();
        let config = dir.join("sweep.toml");
        fs::write(
            &config,
            r#"
            [potential]
            header = "header.vashishta"

            [simulation]
            script-template = "shell.in"
            read-data = "../water.data"
            output-dir = "runs"
            executable = "vashsweep-no-such-engine"

            [sweep.water-grid]
            charges = [0.5]
            angles-deg = [104.5]
            "#,
        )
        .unwrap();
        config
    }

    #[test]
    fn dry_run_prepares_every_point() {
        let dir = tempdir().unwrap();
        let config = write_inputs(dir.path());

        run(sweep_args(&["-c", config.to_str().unwrap(), "--dry-run"])).unwrap();

        let point = dir.path().join("runs").join("ZH0.5_theta104.5");
        let script = fs::read_to_string(point.join("in.lammps")).unwrap();
        assert_eq!(
            script,
            "read_data ../water.data\npair_coeff * * H2O.vashishta O H\n"
        );
        assert!(
            fs::read_to_string(point.join("H2O.vashishta"))
                .unwrap()
                .starts_with("# header\n")
        );
    }

    #[test]
    fn missing_engine_fails_the_sweep() {
        let dir = tempdir().unwrap();
        let config = write_inputs(dir.path());

        let result = run(sweep_args(&["-c", config.to_str().unwrap()]));
        assert!(matches!(
            result,
            Err(CliError::Engine(EngineError::Launch { .. }))
        ));
    }
}
