use crate::cli::GenerateArgs;
use crate::error::Result;
use std::io::Write;
use tracing::info;
use vashsweep::core::io::vashishta::{ParameterFileWriter, load_overrides};
use vashsweep::core::potential::{Substance, build_default_table};

pub fn run(args: GenerateArgs) -> Result<()> {
    let substance: Substance = args.substance.parse()?;
    info!("Building default {} table.", substance);
    let (mut table, masses) = build_default_table(substance);

    if let Some(path) = &args.overrides {
        let overrides = load_overrides(path)?;
        info!(
            "Applying overrides for {} interaction(s) from {:?}",
            overrides.len(),
            path
        );
        table.apply_overrides(&overrides)?;
    }

    let writer = match &args.header {
        Some(path) => ParameterFileWriter::from_header_path(path)?,
        None => ParameterFileWriter::with_header(""),
    };

    match &args.output {
        Some(path) => {
            writer.write_to_path(&table, path)?;
            let elements: Vec<&str> = masses.symbols().collect();
            println!(
                "✓ Wrote {} interaction(s) for {} ({}) to {}",
                table.len(),
                substance,
                elements.join(" "),
                path.display()
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writer.write_to(&table, &mut stdout)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use std::fs;
    use tempfile::tempdir;
    use vashsweep::core::io::vashishta::read_records;
    use vashsweep::core::potential::{ParameterName, PotentialError};

    #[test]
    fn writes_header_defaults_and_overrides() {
        let dir = tempdir().unwrap();
        let header = dir.path().join("header.vashishta");
        let overrides = dir.path().join("overrides.toml");
        let output = dir.path().join("SiO2.vashishta");
        fs::write(&header, "# silica\n").unwrap();
        fs::write(&overrides, "[SiOO]\nB = 19.5\n").unwrap();

        run(GenerateArgs {
            substance: "sio2".to_string(),
            header: Some(header),
            overrides: Some(overrides),
            output: Some(output.clone()),
        })
        .unwrap();

        let text = fs::read_to_string(output).unwrap();
        assert!(text.starts_with("# silica\n\nSi  Si  Si  "));
        let table = read_records(&text["# silica\n".len()..]).unwrap();
        assert_eq!(table.len(), 8);
        assert_eq!(table.get("SiOO").unwrap()[ParameterName::B], 19.5);
    }

    #[test]
    fn unknown_override_key_fails_without_writing() {
        let dir = tempdir().unwrap();
        let overrides = dir.path().join("overrides.toml");
        let output = dir.path().join("H2O.vashishta");
        fs::write(&overrides, "[OHH]\nkappa = 1.0\n").unwrap();

        let result = run(GenerateArgs {
            substance: "water".to_string(),
            header: None,
            overrides: Some(overrides),
            output: Some(output.clone()),
        });
        assert!(matches!(
            result,
            Err(CliError::Potential(PotentialError::UnknownKey { .. }))
        ));
        assert!(!output.exists());
    }

    #[test]
    fn unknown_substance_is_rejected() {
        let result = run(GenerateArgs {
            substance: "argon".to_string(),
            header: None,
            overrides: None,
            output: None,
        });
        assert!(matches!(
            result,
            Err(CliError::Potential(PotentialError::UnknownSubstance(_)))
        ));
    }
}
