//! # Boundary Check CLI
//!
//! ```bash
//! boundary-check                       # reads ./boundary.toml
//! boundary-check --config path/to/boundary.toml --format json
//! ```
//!
//! Exit codes: `0` clean, `1` violations found, `2` the check could not run.

use std::path::PathBuf;
use std::process::ExitCode;

use boundary_check::{check, BoundaryConfig, CheckError, Report};
use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "boundary-check")]
#[command(about = "Verify the ingestion → decision → presentation flow rules")]
struct Args {
    /// Boundary configuration file
    #[arg(short, long, default_value = "boundary.toml")]
    config: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: Format,
}

fn run(args: &Args) -> Result<Report, CheckError> {
    let config = BoundaryConfig::load(&args.config)?;
    check(&config)
}

fn main() -> ExitCode {
    let args = Args::parse();

    let report = match run(&args) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("boundary-check: {e}");
            return ExitCode::from(2);
        }
    };

    match args.format {
        Format::Text => print!("{}", report.to_text()),
        Format::Json => match report.to_json() {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("boundary-check: {e}");
                return ExitCode::from(2);
            }
        },
    }

    if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
