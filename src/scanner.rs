use anyhow::Result;
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File scanner for collecting the Go sources that may carry endpoint annotations.
///
/// The `FileScanner` recursively walks the endpoints root and returns every `.go`
/// file in a stable, name-sorted order so that blocks are discovered the same way
/// on every run. Hidden directories and `vendor` are never entered.
///
/// # Example
///
/// ```no_run
/// use openapi_from_annotations::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let scanner = FileScanner::new(PathBuf::from("./api"))
///     .with_excluded(PathBuf::from("./api/main.go"));
/// let result = scanner.scan().unwrap();
/// println!("Found {} Go files", result.go_files.len());
/// ```
pub struct FileScanner {
    root_path: PathBuf,
    excluded: Option<PathBuf>,
}

/// Result of directory scanning operation.
pub struct ScanResult {
    /// Discovered `.go` files, in traversal order
    pub go_files: Vec<PathBuf>,
    /// Warning messages for paths that could not be accessed
    pub warnings: Vec<String>,
}

impl FileScanner {
    /// Creates a new `FileScanner` for the specified root directory.
    pub fn new(root_path: PathBuf) -> Self {
        Self {
            root_path,
            excluded: None,
        }
    }

    /// Skips one file during the scan, typically the main documentation file,
    /// whose blocks have already been extracted.
    pub fn with_excluded(mut self, path: PathBuf) -> Self {
        self.excluded = Some(canonical(&path));
        self
    }

    /// Scans the directory tree and collects all `.go` files.
    ///
    /// Inaccessible entries are logged and reported in the result; the scan
    /// carries on with the rest of the tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory does not exist.
    pub fn scan(&self) -> Result<ScanResult> {
        if !self.root_path.exists() {
            anyhow::bail!(
                "Endpoints root does not exist: {}",
                self.root_path.display()
            );
        }

        let mut go_files = Vec::new();
        let mut warnings = Vec::new();

        for entry in WalkDir::new(&self.root_path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                if e.path() == self.root_path {
                    return true;
                }

                let file_name = e.file_name().to_string_lossy();
                let is_hidden = file_name.starts_with('.');
                let is_vendor = e.file_type().is_dir() && file_name == "vendor";

                !is_hidden && !is_vendor
            })
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("go")
                    {
                        continue;
                    }
                    if self.excluded.as_deref() == Some(canonical(path).as_path()) {
                        debug!("Skipping excluded file: {}", path.display());
                        continue;
                    }
                    go_files.push(path.to_path_buf());
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        Ok(ScanResult { go_files, warnings })
    }
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
