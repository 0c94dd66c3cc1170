use crate::error::Result;
use indexmap::IndexMap;
use log::debug;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static RE_IMPORT_SINGLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"import\s+"([^"]*)""#).unwrap());
static RE_IMPORT_MULTI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"import\s*\(([^)]+)\)").unwrap());
static RE_STRUCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"type\s+(\w+)\s+struct\s*\{([^}]*)\}").unwrap());
static RE_FIELD_DOC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^//\s?(.*)").unwrap());
static RE_FIELD_TAGGED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\S+)\s+(\S+)\s+`(.*)`").unwrap());
static RE_FIELD_PLAIN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\S+)\s+(\S+)").unwrap());
static RE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"([a-z]+):"([^"]+)""#).unwrap());

/// Tag overriding the field name.
const TAG_NAME: &str = "json";
/// Tag overriding the field type.
const TAG_TYPE: &str = "apitype";
/// Tag overriding the required flag.
const TAG_REQUIRED: &str = "required";

/// Parser for the small subset of Go declarations the annotations refer to.
///
/// Only imports and `type X struct { ... }` declarations are recognised; the
/// rest of the file is ignored.
///
/// # Example
///
/// ```no_run
/// use openapi_from_annotations::parser::GoParser;
/// use std::path::Path;
///
/// let parsed = GoParser::parse_file(Path::new("model/person.go")).unwrap();
/// println!("Declared {} record types", parsed.types.len());
/// ```
pub struct GoParser;

/// The declarations found in one Go file.
#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    /// Path to the source file
    pub path: PathBuf,
    /// Import alias to module path
    pub imports: HashMap<String, String>,
    /// Record type name to the raw body between its braces
    pub types: IndexMap<String, String>,
}

/// One field line of a record body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub name: String,
    /// Declared type with pointer markers removed, possibly `[]`-prefixed
    pub type_name: String,
    pub required: bool,
    /// Text of the comment line directly above the field
    pub description: Option<String>,
}

impl GoParser {
    /// Reads and parses a single Go file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn parse_file(path: &Path) -> Result<ParsedFile> {
        debug!("Parsing file: {}", path.display());
        let content = fs::read_to_string(path)?;
        Ok(Self::parse_source(path, &content))
    }

    /// Parses every `.go` file directly inside `dir`, in file name order.
    ///
    /// Subdirectories are separate modules and are not entered.
    pub fn parse_package(dir: &Path) -> Result<IndexMap<PathBuf, ParsedFile>> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("go") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut files = IndexMap::new();
        for path in paths {
            let parsed = Self::parse_file(&path)?;
            files.insert(path, parsed);
        }
        debug!("Parsed {} files in module {}", files.len(), dir.display());
        Ok(files)
    }

    /// Parses Go source text; `path` is recorded as its origin.
    pub fn parse_source(path: &Path, content: &str) -> ParsedFile {
        // `interface{}` would cut struct bodies short and renders as an object anyway.
        let content = content.replace("interface{}", "object");

        let mut imports = HashMap::new();
        for caps in RE_IMPORT_SINGLE.captures_iter(&content) {
            if let Some(alias) = default_alias(&caps[1]) {
                imports.insert(alias, caps[1].to_string());
            }
        }
        for caps in RE_IMPORT_MULTI.captures_iter(&content) {
            for line in caps[1].lines() {
                if let Some((alias, module)) = parse_import_line(line) {
                    imports.insert(alias, module);
                }
            }
        }

        let types = RE_STRUCT
            .captures_iter(&content)
            .map(|caps| (caps[1].to_string(), caps[2].to_string()))
            .collect();

        ParsedFile {
            path: path.to_path_buf(),
            imports,
            types,
        }
    }
}

/// Alias Go gives an unaliased import: the last path segment. Standard library
/// paths without a `/` are not of interest and yield `None`.
fn default_alias(module: &str) -> Option<String> {
    let segments: Vec<&str> = module.split('/').collect();
    if segments.len() > 1 {
        segments.last().map(|s| s.to_string())
    } else {
        None
    }
}

fn parse_import_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with("//") {
        return None;
    }

    let mut parts = line.split_whitespace();
    let first = parts.next()?;
    if first.starts_with('"') {
        let module = first.trim_matches('"');
        return default_alias(module).map(|alias| (alias, module.to_string()));
    }

    let module = parts.next()?.trim_matches('"');
    Some((first.to_string(), module.to_string()))
}

/// Splits a record body into its field declarations.
///
/// Embedded fields and fields hidden with `json:"-"` are left out.
pub fn parse_fields(body: &str) -> Vec<FieldDecl> {
    let mut fields = Vec::new();
    let mut description: Option<String> = None;

    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = RE_FIELD_DOC.captures(line) {
            let text = caps[1].trim();
            if !text.is_empty() {
                description = Some(text.replace('"', "'"));
            }
            continue;
        }

        let (mut name, mut type_name, tags) = if let Some(caps) = RE_FIELD_TAGGED.captures(line) {
            (
                caps[1].to_string(),
                caps[2].to_string(),
                parse_tags(&caps[3]),
            )
        } else if let Some(caps) = RE_FIELD_PLAIN.captures(line) {
            (caps[1].to_string(), caps[2].to_string(), HashMap::new())
        } else {
            // Embedded field; not resolved.
            description = None;
            continue;
        };

        type_name = type_name.replace(['*', '&'], "");
        let mut required = false;
        if let Some(v) = tags.get(TAG_NAME) {
            name = v.clone();
        }
        if let Some(v) = tags.get(TAG_TYPE) {
            type_name = v.clone();
        }
        if let Some(v) = tags.get(TAG_REQUIRED) {
            required = v == "true";
        }

        let description = description.take();
        if name.is_empty() || name == "-" {
            continue;
        }
        fields.push(FieldDecl {
            name,
            type_name,
            required,
            description,
        });
    }

    fields
}

/// Struct tag values, each cut at its first comma. Empty values are dropped
/// so that `json:",omitempty"` keeps the declared name.
fn parse_tags(raw: &str) -> HashMap<String, String> {
    RE_TAG
        .captures_iter(raw)
        .filter_map(|caps| {
            let value = caps[2].split(',').next().unwrap_or_default();
            if value.is_empty() {
                None
            } else {
                Some((caps[1].to_string(), value.to_string()))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn field(name: &str, type_name: &str, required: bool, description: Option<&str>) -> FieldDecl {
        FieldDecl {
            name: name.to_string(),
            type_name: type_name.to_string(),
            required,
            description: description.map(str::to_string),
        }
    }

    #[test]
    fn test_parse_single_import() {
        let parsed = GoParser::parse_source(
            Path::new("a.go"),
            "package a\n\nimport \"github.com/acme/shop/model\"\n",
        );
        assert_eq!(
            parsed.imports.get("model").map(String::as_str),
            Some("github.com/acme/shop/model")
        );
    }

    #[test]
    fn test_parse_import_block() {
        let parsed = GoParser::parse_source(
            Path::new("a.go"),
            r#"package a

import (
	"fmt"
	"net/http"

	m "github.com/acme/shop/model"
	// Referenced from annotations only
	_ "github.com/acme/shop/common"
)
"#,
        );

        assert_eq!(parsed.imports.len(), 3);
        assert_eq!(parsed.imports["http"], "net/http");
        assert_eq!(parsed.imports["m"], "github.com/acme/shop/model");
        assert_eq!(parsed.imports["_"], "github.com/acme/shop/common");
        assert!(!parsed.imports.contains_key("fmt"));
    }

    #[test]
    fn test_parse_struct_declarations() {
        let parsed = GoParser::parse_source(
            Path::new("a.go"),
            r#"package a

type Person struct {
	Name string
	Meta interface{}
}

type Status int

type Address struct{
	City string
}
"#,
        );

        let names: Vec<_> = parsed.types.keys().cloned().collect();
        assert_eq!(names, vec!["Person", "Address"]);
        assert!(parsed.types["Person"].contains("Meta object"));
    }

    #[test]
    fn test_parse_fields_with_tags_and_docs() {
        let fields = parse_fields(
            r#"
	Name string `json:"fullname" required:"true"`
	// User's "public" profile
	Detail *Detail `json:"profile,omitempty"`
	Age int
	Status Status `json:"status" apitype:"int"`
	Secret string `json:"-"`
	Nick string `json:",omitempty"`
"#,
        );

        assert_eq!(
            fields,
            vec![
                field("fullname", "string", true, None),
                field("profile", "Detail", false, Some("User's 'public' profile")),
                field("Age", "int", false, None),
                field("status", "int", false, None),
                field("Nick", "string", false, None),
            ]
        );
    }

    #[test]
    fn test_description_applies_to_next_line_only() {
        let fields = parse_fields("// first\nA string\nB string\n");
        assert_eq!(
            fields,
            vec![
                field("A", "string", false, Some("first")),
                field("B", "string", false, None),
            ]
        );
    }

    #[test]
    fn test_embedded_field_is_skipped() {
        let fields = parse_fields("// base\nBase\nItems []*Item\n");
        assert_eq!(fields, vec![field("Items", "[]Item", false, None)]);
    }

    #[test]
    fn test_parse_package_is_not_recursive() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir(root.join("inner")).unwrap();
        fs::write(root.join("b.go"), "type B struct {\n X int\n}\n").unwrap();
        fs::write(root.join("a.go"), "type A struct {\n X int\n}\n").unwrap();
        fs::write(root.join("inner/c.go"), "type C struct {\n X int\n}\n").unwrap();
        fs::write(root.join("notes.txt"), "type D struct {\n X int\n}\n").unwrap();

        let files = GoParser::parse_package(root).unwrap();
        let names: Vec<_> = files
            .keys()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.go", "b.go"]);
    }

    #[test]
    fn test_parse_package_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        assert!(GoParser::parse_package(&temp_dir.path().join("missing")).is_err());
    }
}
