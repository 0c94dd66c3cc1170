//! Output helpers: the indented YAML line buffer, value escaping, JSON
//! conversion and writing the document to disk.

use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::Path;

const INDENT: &str = "  ";

/// Words YAML 1.1 readers load as booleans.
const YAML11_BOOLS: &[&str] = &["y", "n", "yes", "no", "on", "off"];

/// Line buffer producing two-space indented YAML.
///
/// Every write takes the indentation level of the line; labels end with `:`.
#[derive(Debug, Default, Clone)]
pub struct YamlBuffer {
    lines: Vec<String>,
}

impl YamlBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes raw content, without a line break.
    pub fn write(&mut self, content: &str, indent: usize) {
        self.lines.push(format!("{}{}", INDENT.repeat(indent), content));
    }

    /// Writes one line.
    pub fn line(&mut self, content: &str, indent: usize) {
        self.write(&format!("{}\n", content), indent);
    }

    /// Writes `label:`.
    pub fn label(&mut self, label: &str, indent: usize) {
        self.line(&format!("{}:", label.trim()), indent);
    }

    /// Writes `key: value`; the value is written as given.
    pub fn key_value(&mut self, key: &str, value: &str, indent: usize) {
        self.line(&format!("{}: {}", key.trim(), value), indent);
    }

    /// Written lines, each with its indentation and trailing line break.
    #[cfg(test)]
    pub(crate) fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Joins the buffer into the final text.
    pub fn flush(&self) -> String {
        self.lines.concat()
    }
}

/// Makes a value safe to place after `key: `.
///
/// A value already written as a valid double-quoted scalar is kept. Any other
/// value that YAML would not read back as the same string (indicators,
/// `key: value` shapes, comments, booleans, numbers, nulls, invalid escapes)
/// is emitted as a double-quoted string.
pub fn safe_value(value: &str) -> String {
    if is_quoted_scalar(value) || reads_back_as_itself(value) {
        return value.to_string();
    }
    // A JSON string literal is a valid YAML double-quoted scalar.
    serde_json::Value::from(value).to_string()
}

fn is_quoted_scalar(value: &str) -> bool {
    value.len() >= 2
        && value.starts_with('"')
        && value.ends_with('"')
        && serde_yaml::from_str::<String>(value).is_ok()
}

fn reads_back_as_itself(value: &str) -> bool {
    matches!(
        serde_yaml::from_str::<serde_yaml::Value>(value),
        Ok(serde_yaml::Value::String(ref s)) if s == value
    ) && !YAML11_BOOLS.contains(&value.to_lowercase().as_str())
}

/// Converts a YAML document to pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if the YAML does not parse.
pub fn yaml_to_json(yaml: &str) -> Result<String> {
    debug!("Converting document to JSON");
    let value: serde_yaml::Value =
        serde_yaml::from_str(yaml).context("Failed to parse generated YAML document")?;
    serde_json::to_string_pretty(&value).context("Failed to serialize document to JSON")
}

/// Writes string content to a file.
///
/// Parent directories are created when missing; an existing file is replaced.
///
/// # Errors
///
/// Returns an error if the directory or the file cannot be written.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_buffer_writes_indented_lines() {
        let mut b = YamlBuffer::new();
        b.label("info", 0);
        b.key_value("title", "API", 1);
        b.line("- item", 1);
        b.write("openapi: \"3.0.2\"", 0);

        assert_eq!(b.flush(), "info:\n  title: API\n  - item\nopenapi: \"3.0.2\"");
    }

    #[test]
    fn test_buffer_label_trims() {
        let mut b = YamlBuffer::new();
        b.label(" paths ", 0);
        b.label("", 1);
        assert_eq!(b.flush(), "paths:\n  :\n");
    }

    #[test]
    fn test_safe_value() {
        assert_eq!(safe_value("Sample API"), "Sample API");
        assert_eq!(safe_value("https://domain.go/contact"), "https://domain.go/contact");
        assert_eq!(safe_value("support@shop.example"), "support@shop.example");
        assert_eq!(safe_value("\"1.0\""), "\"1.0\"");
        assert_eq!(safe_value(""), "\"\"");
        assert_eq!(safe_value("Note: read this"), "\"Note: read this\"");
        assert_eq!(safe_value("@handle"), "\"@handle\"");
        assert_eq!(safe_value("say \"hi\" # now"), "\"say \\\"hi\\\" # now\"");
        assert_eq!(safe_value("ends:"), "\"ends:\"");
        assert_eq!(safe_value("'quoted'"), "\"'quoted'\"");
    }

    #[test]
    fn test_safe_value_quotes_non_string_scalars() {
        assert_eq!(safe_value("true"), "\"true\"");
        assert_eq!(safe_value("yes"), "\"yes\"");
        assert_eq!(safe_value("Off"), "\"Off\"");
        assert_eq!(safe_value("yesterday"), "yesterday");
        assert_eq!(safe_value("null"), "\"null\"");
        assert_eq!(safe_value("~"), "\"~\"");
        assert_eq!(safe_value("1.0"), "\"1.0\"");
        assert_eq!(safe_value("42"), "\"42\"");
    }

    #[test]
    fn test_safe_value_requotes_broken_quoted_values() {
        assert_eq!(safe_value("\"a\" and \"b\""), "\"\\\"a\\\" and \\\"b\\\"\"");
        assert_eq!(safe_value(r#""\d+""#), r#""\"\\d+\"""#);
        assert_eq!(safe_value(r#""\\d+""#), r#""\\d+""#);

        for value in [r#""a" and "b""#, r#""\d+""#, "true", "Lorem: ipsum"] {
            let line = format!("description: {}", safe_value(value));
            let parsed: serde_yaml::Value = serde_yaml::from_str(&line).unwrap();
            assert_eq!(parsed["description"].as_str(), Some(value));
        }
    }

    #[test]
    fn test_yaml_to_json() {
        let json = yaml_to_json("info:\n  title: API\n  version: \"1.0\"\n").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["info"]["title"], "API");
        assert_eq!(value["info"]["version"], "1.0");
    }

    #[test]
    fn test_yaml_to_json_rejects_invalid_yaml() {
        assert!(yaml_to_json("a: [unclosed").is_err());
    }

    #[test]
    fn test_write_to_file_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("docs/api/openapi.yaml");

        write_to_file("openapi: \"3.0.2\"", &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "openapi: \"3.0.2\"");
    }
}
