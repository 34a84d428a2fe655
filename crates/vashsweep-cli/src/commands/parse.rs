use crate::cli::ParseArgs;
use crate::error::{CliError, Result};
use tracing::info;
use vashsweep::core::io::log::ThermoLog;
use vashsweep::workflows::sweep::{select_series, write_series_csv};

pub fn run(args: ParseArgs) -> Result<()> {
    info!("Reading thermo log {:?}", &args.log);
    let log = ThermoLog::read_from_path(&args.log, args.ignore_first).map_err(|e| {
        CliError::FileParsing {
            path: args.log.clone(),
            source: e.into(),
        }
    })?;
    info!(
        "Found {} block(s); kept {} sample(s) after skipping {}.",
        log.blocks_read(),
        log.len(),
        args.ignore_first
    );

    let series = select_series(&log, &args.series, args.si_units)?;

    if let Some(path) = &args.csv {
        write_series_csv(path, &series)?;
        println!(
            "✓ Wrote {} series of {} sample(s) to {}",
            series.len(),
            log.len(),
            path.display()
        );
        return Ok(());
    }

    println!(
        "{:<12} {:>8} {:>16} {:>16} {:>16}",
        "Series", "Samples", "First", "Last", "Mean"
    );
    for (name, values) in &series {
        match summarize(values) {
            Some((first, last, mean)) => println!(
                "{:<12} {:>8} {:>16.6e} {:>16.6e} {:>16.6e}",
                name,
                values.len(),
                first,
                last,
                mean
            ),
            None => println!("{:<12} {:>8}", name, 0),
        }
    }
    Ok(())
}

/// First, last and mean value of a non-empty series.
fn summarize(values: &[f64]) -> Option<(f64, f64, f64)> {
    let first = *values.first()?;
    let last = *values.last()?;
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    Some((first, last, mean))
}
