//! Annotation block extraction from Go source files.
//!
//! A block is an uninterrupted run of `//` comment lines holding at least one
//! `@key ...` annotation entry. Continuation lines without `@` are folded into the
//! preceding entry, which is how multi-line descriptions are written. Runs without
//! any annotation entry are discarded.
//!
//! When a run is closed by a route registration call, the [`gorilla`] module
//! infers the route, its methods and its path parameters from that call.
//!
//! # Example
//!
//! ```no_run
//! use openapi_from_annotations::extractor::Extractor;
//! use std::path::Path;
//!
//! let extractor = Extractor::new(false);
//! let blocks = extractor.extract(Path::new("handler/person.go")).unwrap();
//! for block in &blocks {
//!     println!("{}: {:?}", block.source_file.display(), block.lines);
//! }
//! ```

pub mod gorilla;

use crate::error::Result;
use log::debug;
use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static RE_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*//\s*(.*)").unwrap());
static RE_ANNOTATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^@(\S.*)").unwrap());

/// One contiguous annotated comment run, tied to the file it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// File containing this block
    pub source_file: PathBuf,
    /// Annotation entries without the leading `@`, in source order
    pub lines: Vec<String>,
}

impl Block {
    pub fn new(source_file: impl Into<PathBuf>, lines: Vec<String>) -> Self {
        Self {
            source_file: source_file.into(),
            lines,
        }
    }

    /// Returns true when any entry starts with `<key> `.
    pub fn has_entry(&self, key: &str) -> bool {
        let prefix = format!("{} ", key);
        self.lines.iter().any(|l| l.starts_with(&prefix))
    }
}

/// Reads Go files and splits their annotation comments into blocks.
pub struct Extractor {
    verbose: bool,
}

impl Extractor {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Extracts all annotation blocks from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or read. A file without any
    /// annotation yields an empty vector.
    pub fn extract(&self, path: &Path) -> Result<Vec<Block>> {
        debug!("Extracting annotations from {}", path.display());
        let file = File::open(path)?;
        self.parse(BufReader::new(file), path)
    }

    /// Extracts blocks from any line source; `file` is recorded as their origin.
    pub fn parse<R: BufRead>(&self, reader: R, file: &Path) -> Result<Vec<Block>> {
        let mut blocks = Vec::new();
        let mut entries: Vec<String> = Vec::new();
        let mut in_comment = false;

        for line in reader.lines() {
            let line = line?;

            if let Some(caps) = RE_COMMENT.captures(&line) {
                in_comment = true;
                let text = caps[1].trim_end();
                if let Some(entry) = RE_ANNOTATION.captures(text) {
                    entries.push(entry[1].to_string());
                } else if !text.is_empty() {
                    // Text ahead of the first entry is a plain Go doc comment.
                    if let Some(last) = entries.last_mut() {
                        last.push(' ');
                        last.push_str(text.trim_start());
                    }
                }
                continue;
            }

            if in_comment {
                in_comment = false;
                if !entries.is_empty() {
                    let mut block = Block::new(file, std::mem::take(&mut entries));
                    gorilla::infer_route(&mut block, &line, self.verbose);
                    blocks.push(block);
                }
            }
        }

        if !entries.is_empty() {
            blocks.push(Block::new(file, entries));
        }

        debug!("Found {} blocks in {}", blocks.len(), file.display());
        Ok(blocks)
    }
}
