use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Even Marius Nordhagen",
    version,
    about = "vashsweep - Vashishta potential parameter sweeps for water and silica, driven through LAMMPS.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a Vashishta parameter file from the built-in defaults and optional overrides.
    Generate(GenerateArgs),
    /// Extract thermo time series from a LAMMPS log file.
    Parse(ParseArgs),
    /// Summarize a LAMMPS text dump (radial distances, speeds, mean-squared displacement).
    Dump(DumpArgs),
    /// Run a parameter sweep described by a TOML configuration file.
    Sweep(SweepArgs),
}

/// Arguments for the `generate` subcommand.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Substance whose default table is used (water, silica, silica-water).
    #[arg(short, long, default_value = "water", value_name = "NAME")]
    pub substance: String,

    /// Header template copied verbatim to the top of the file.
    #[arg(long, value_name = "PATH")]
    pub header: Option<PathBuf>,

    /// TOML file with one table per interaction triple, e.g. `[OHH] Zi = -0.9`.
    #[arg(long, value_name = "PATH")]
    pub overrides: Option<PathBuf>,

    /// Destination file. Printed to stdout when omitted.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// Arguments for the `parse` subcommand.
#[derive(Args, Debug)]
pub struct ParseArgs {
    /// LAMMPS log file to read.
    #[arg(required = true, value_name = "PATH")]
    pub log: PathBuf,

    /// Number of leading thermo blocks to discard.
    #[arg(short, long, default_value_t = 0, value_name = "INT")]
    pub ignore_first: usize,

    /// Series to extract. Can be used multiple times; defaults to every column.
    #[arg(short, long = "series", value_name = "NAME")]
    pub series: Vec<String>,

    /// Convert reduced (LJ) values to SI using the log's reference mass.
    #[arg(long)]
    pub si_units: bool,

    /// Write the selected series to a CSV file instead of printing a summary.
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observable {
    /// Distance of every atom from the origin.
    Radial,
    /// Magnitude of every atom's velocity.
    Speed,
    /// Mean-squared displacement relative to the first frame.
    Msd,
    /// Diffusion estimate MSD / (6 t).
    Diffusion,
}

/// Arguments for the `dump` subcommand.
#[derive(Args, Debug)]
pub struct DumpArgs {
    /// LAMMPS text dump to read.
    #[arg(required = true, value_name = "PATH")]
    pub dump: PathBuf,

    /// Observable to compute.
    #[arg(short, long, value_enum, default_value_t = Observable::Msd)]
    pub observable: Observable,

    /// Time per step used by the diffusion estimate.
    #[arg(long, default_value_t = 0.005, value_name = "DT")]
    pub dt: f64,

    /// Write one row per frame (timestep and observable) to a CSV file.
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,
}

/// Arguments for the `sweep` subcommand.
#[derive(Args, Debug)]
pub struct SweepArgs {
    /// Path to the sweep configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Override the output directory from the config file.
    #[arg(short, long, value_name = "PATH")]
    pub output_dir: Option<PathBuf>,

    /// Override the simulation executable, e.g. "mpirun -n 4 lmp_mpi".
    #[arg(short, long, value_name = "COMMAND")]
    pub executable: Option<String>,

    /// Override the substance from the config file.
    #[arg(long, value_name = "NAME")]
    pub substance: Option<String>,

    /// Override the number of leading thermo blocks to discard.
    #[arg(long, value_name = "INT")]
    pub ignore_first: Option<usize>,

    /// Export series in SI units, overriding the config file.
    #[arg(long)]
    pub si_units: bool,

    /// Write parameter files and input scripts without starting the engine.
    #[arg(long)]
    pub dry_run: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S simulation.ignore-first=1
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}
