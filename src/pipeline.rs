//! End-to-end document generation: extraction, reference resolution,
//! tokenization, subrouter resolution, generation and output.

use crate::error::Error;
use crate::extractor::{Block, Extractor};
use crate::openapi_builder::OpenApiBuilder;
use crate::scanner::FileScanner;
use crate::serializer::{write_to_file, yaml_to_json};
use crate::subrouter::resolve_subrouters;
use crate::tokenizer::{Token, Tokenizer};
use crate::type_resolver::ReferenceResolver;
use anyhow::{Context, Result};
use clap::ValueEnum;
use log::{debug, info, warn};
use std::path::PathBuf;

/// Keys the main block must declare
const REQUIRED_MAIN_KEYS: &[&str] = &["title", "ver"];

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    #[default]
    Yaml,
    /// JSON format
    Json,
}

impl OutputFormat {
    pub fn file_name(self) -> &'static str {
        match self {
            OutputFormat::Yaml => "openapi.yaml",
            OutputFormat::Json => "openapi.json",
        }
    }
}

/// Generation settings
#[derive(Debug, Clone)]
pub struct Config {
    /// File holding the API-wide annotation block
    pub main_file: PathBuf,
    /// Directory searched for endpoint annotations
    pub endpoints_root: PathBuf,
    /// Directory the document is written to
    pub output_dir: PathBuf,
    /// Directory imported module paths are relative to
    pub source_root: PathBuf,
    pub format: OutputFormat,
    pub verbose: bool,
}

impl Config {
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(self.format.file_name())
    }
}

/// Generates the document and writes it to the output directory.
///
/// Returns the path of the written file. Nothing is written when any step
/// fails.
pub fn run(config: &Config) -> Result<PathBuf> {
    let (main, endpoints) = collect_tokens(config)?;
    let builder = OpenApiBuilder::new(config.verbose);
    let path = config.output_path();

    info!("Step 6: Writing document to {}", path.display());
    match config.format {
        OutputFormat::Yaml => builder.write(&main, &endpoints, &path)?,
        OutputFormat::Json => {
            let json = yaml_to_json(&builder.generate(&main, &endpoints))?;
            write_to_file(&json, &path)?;
        }
    }
    Ok(path)
}

/// Generates the YAML document in memory.
pub fn build_document(config: &Config) -> Result<String> {
    let (main, endpoints) = collect_tokens(config)?;
    info!("Step 6: Generating document...");
    Ok(OpenApiBuilder::new(config.verbose).generate(&main, &endpoints))
}

/// Runs every stage up to generation: the main tokens and the endpoint
/// token sets with mount paths applied.
fn collect_tokens(config: &Config) -> Result<(Vec<Token>, Vec<Vec<Token>>)> {
    let extractor = Extractor::new(config.verbose);

    // Step 1: main block
    info!("Step 1: Extracting main file {}", config.main_file.display());
    let mut blocks = extractor
        .extract(&config.main_file)
        .with_context(|| format!("Failed to read main file: {}", config.main_file.display()))?;
    if blocks.is_empty() {
        anyhow::bail!(
            "No annotation block found in main file: {}",
            config.main_file.display()
        );
    }

    // Step 2: endpoint blocks
    info!("Step 2: Scanning endpoints in {}", config.endpoints_root.display());
    let scan_result = FileScanner::new(config.endpoints_root.clone())
        .with_excluded(config.main_file.clone())
        .scan()?;
    if !scan_result.warnings.is_empty() {
        warn!("{} paths under the endpoints root could not be read", scan_result.warnings.len());
    }
    info!("Found {} Go files", scan_result.go_files.len());

    for file in &scan_result.go_files {
        let file_blocks = extractor
            .extract(file)
            .with_context(|| format!("Failed to read endpoint file: {}", file.display()))?;
        debug!("{} blocks in {}", file_blocks.len(), file.display());
        blocks.extend(file_blocks);
    }

    // Step 3: references
    info!("Step 3: Resolving type references...");
    let mut resolver = ReferenceResolver::new(config.source_root.clone(), config.verbose);
    resolver.resolve(&mut blocks)?;

    // Step 4: tokens
    info!("Step 4: Tokenizing {} blocks...", blocks.len());
    let tokenizer = Tokenizer::new(config.verbose);
    let (main, endpoints) = tokenize_blocks(&tokenizer, &blocks)?;
    info!("Found {} endpoint blocks", endpoints.len());

    // Step 5: subrouters
    info!("Step 5: Resolving subrouters...");
    let endpoints = resolve_subrouters(endpoints)?;

    Ok((main, endpoints))
}

/// Tokenizes the main block (the first one) and the endpoint blocks,
/// dropping endpoints that yield no tokens.
fn tokenize_blocks(
    tokenizer: &Tokenizer,
    blocks: &[Block],
) -> crate::error::Result<(Vec<Token>, Vec<Vec<Token>>)> {
    let Some((main_block, endpoint_blocks)) = blocks.split_first() else {
        return Err(Error::MissingToken(REQUIRED_MAIN_KEYS[0].to_string()));
    };

    let main = tokenizer.parse(main_block);
    for key in REQUIRED_MAIN_KEYS {
        if !main.iter().any(|t| t.key == *key) {
            return Err(Error::MissingToken(key.to_string()));
        }
    }

    let endpoints = endpoint_blocks
        .iter()
        .map(|b| tokenizer.parse(b))
        .filter(|tokens| !tokens.is_empty())
        .collect();
    Ok((main, endpoints))
}
