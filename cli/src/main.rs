#![deny(missing_docs)]

//! # OAS2JS CLI
//!
//! Extracts every titled request/response schema of an OpenAPI document
//! into standalone JSON Schema files.
//!
//! ```text
//! oas2js <INPUT> <OUT_DIR> [OPTIONS]
//! ```

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod extract;

#[derive(Parser, Debug)]
#[clap(author, version, about = "OpenAPI to JSON Schema extractor")]
struct Cli {
    #[clap(flatten)]
    extract: extract::ExtractArgs,

    /// More log output on stderr (`-v` info, `-vv` debug). Overrides `RUST_LOG`.
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match extract::execute(&cli.extract) {
        Ok(report) => {
            tracing::debug!(files = report.written.len(), "done");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}
