//! OpenAPI from annotations - Command-line tool for generating OpenAPI documentation.
//!
//! Reads the API-wide annotation block of a Go main file and the endpoint
//! annotation blocks of a source tree, and writes an OpenAPI 3.0.2 document.
//!
//! # Usage
//!
//! ```bash
//! openapi-from-annotations [OPTIONS]
//! ```
//!
//! # Examples
//!
//! Generate `docs/api/openapi.yaml` for the current project:
//! ```bash
//! openapi-from-annotations -m main.go -e ./
//! ```
//!
//! Generate JSON into another directory:
//! ```bash
//! openapi-from-annotations -m cmd/api/main.go -e internal -o build -f json
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use openapi_from_annotations::cli;

fn main() -> Result<()> {
    // Parse once so the verbose flag can pick the log level before validation logs anything
    let args_for_verbose = cli::CliArgs::parse();

    let log_level = if args_for_verbose.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("OpenAPI from annotations starting...");

    let args = cli::parse_args_from_parsed(args_for_verbose)?;

    cli::run(args)?;

    info!("OpenAPI document generation completed successfully");

    Ok(())
}
