use crate::cli::{DumpArgs, Observable};
use crate::error::{CliError, Result};
use indexmap::IndexMap;
use tracing::info;
use vashsweep::core::io::dump::{DumpError, DumpFile, DumpFrame};
use vashsweep::engine::error::EngineError;
use vashsweep::workflows::sweep::write_series_csv;

pub fn run(args: DumpArgs) -> Result<()> {
    info!("Reading dump {:?}", &args.dump);
    let dump = DumpFile::read_from_path(&args.dump).map_err(|e| CliError::FileParsing {
        path: args.dump.clone(),
        source: e.into(),
    })?;
    info!("Read {} frame(s).", dump.frames().len());

    let values = per_frame(&dump, args.observable, args.dt).map_err(EngineError::from)?;
    let name = column_name(args.observable);

    if let Some(path) = &args.csv {
        let mut series = IndexMap::new();
        series.insert(
            "timestep".to_string(),
            dump.frames().iter().map(|f| f.timestep as f64).collect(),
        );
        series.insert(name.to_string(), values);
        write_series_csv(path, &series)?;
        println!(
            "✓ Wrote {} frame(s) of {} to {}",
            dump.frames().len(),
            name,
            path.display()
        );
        return Ok(());
    }

    println!("{:>12} {:>8} {:>16}", "Timestep", "Atoms", name);
    for (frame, value) in dump.frames().iter().zip(values) {
        println!(
            "{:>12} {:>8} {:>16.6e}",
            frame.timestep,
            frame.num_atoms(),
            value
        );
    }
    Ok(())
}

type FrameResult<T> = std::result::Result<T, DumpError>;

fn column_name(observable: Observable) -> &'static str {
    match observable {
        Observable::Radial => "mean_radius",
        Observable::Speed => "mean_speed",
        Observable::Msd => "msd",
        Observable::Diffusion => "diffusion",
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// One value per frame: the atom average for per-atom observables.
fn per_frame(dump: &DumpFile, observable: Observable, dt: f64) -> FrameResult<Vec<f64>> {
    let average = |f: fn(&DumpFrame) -> FrameResult<Vec<f64>>| -> FrameResult<Vec<f64>> {
        dump.frames()
            .iter()
            .map(|frame| f(frame).map(|v| mean(&v)))
            .collect()
    };
    match observable {
        Observable::Radial => average(DumpFrame::radial_distances),
        Observable::Speed => average(DumpFrame::speeds),
        Observable::Msd => dump.mean_squared_displacement(),
        Observable::Diffusion => dump.diffusion_coefficients(dt),
    }
}
