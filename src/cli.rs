use crate::pipeline::{self, Config};
use anyhow::Result;
use clap::Parser;
use log::{debug, info};
use std::env;
use std::path::PathBuf;

pub use crate::pipeline::OutputFormat;

/// OpenAPI from annotations - Generate OpenAPI documentation from Go annotation comments
#[derive(Parser, Debug)]
#[command(name = "openapi-from-annotations")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Go file holding the API-wide annotation block
    #[arg(short = 'm', long = "main", value_name = "FILE", default_value = "main.go")]
    pub main_file: PathBuf,

    /// Directory searched recursively for endpoint annotations
    #[arg(short = 'e', long = "endpoints", value_name = "DIR", default_value = "./")]
    pub endpoints_root: PathBuf,

    /// Directory the document is written to
    #[arg(short = 'o', long = "output", value_name = "DIR", default_value = "docs/api")]
    pub output_dir: PathBuf,

    /// Directory imported module paths are relative to (defaults to $GOPATH/src)
    #[arg(short = 's', long = "source-root", value_name = "DIR")]
    pub source_root: Option<PathBuf>,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl CliArgs {
    /// The source root, falling back to `$GOPATH/src`, then the current directory.
    pub fn source_root(&self) -> PathBuf {
        if let Some(root) = &self.source_root {
            return root.clone();
        }
        match env::var_os("GOPATH") {
            Some(gopath) if !gopath.is_empty() => PathBuf::from(gopath).join("src"),
            _ => PathBuf::from("."),
        }
    }

    pub fn to_config(&self) -> Config {
        Config {
            main_file: self.main_file.clone(),
            endpoints_root: self.endpoints_root.clone(),
            output_dir: self.output_dir.clone(),
            source_root: self.source_root(),
            format: self.output_format,
            verbose: self.verbose,
        }
    }
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.main_file.exists() {
        anyhow::bail!("Main file does not exist: {}", args.main_file.display());
    }
    if !args.main_file.is_file() {
        anyhow::bail!("Main file is not a file: {}", args.main_file.display());
    }

    if !args.endpoints_root.exists() {
        anyhow::bail!(
            "Endpoints path does not exist: {}",
            args.endpoints_root.display()
        );
    }
    if !args.endpoints_root.is_dir() {
        anyhow::bail!(
            "Endpoints path is not a directory: {}",
            args.endpoints_root.display()
        );
    }

    info!("Main file: {}", args.main_file.display());
    info!("Endpoints: {}", args.endpoints_root.display());
    info!("Source root: {}", args.source_root().display());
    info!("Output format: {:?}", args.output_format);
    info!("Output directory: {}", args.output_dir.display());

    Ok(args)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    info!("Starting OpenAPI document generation...");

    let config = args.to_config();
    let path = pipeline::run(&config)?;

    info!("Document written to {}", path.display());
    Ok(())
}
