use crate::error::{Error, Result};
use crate::extractor::Block;
use crate::parser::{parse_fields, GoParser, ParsedFile};
use indexmap::IndexMap;
use log::{debug, warn};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static RE_BODY_REF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^body\s+(\S+)").unwrap());
static RE_RESPONSE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:success|failure).*\{object\}\s+(\S+)").unwrap());

/// Go builtin types, plus `object` standing in for `interface{}`.
const BASIC_TYPES: &[&str] = &[
    "bool", "string", "int", "int8", "int16", "int32", "int64", "uint", "uint8", "uint16",
    "uint32", "uint64", "uintptr", "byte", "rune", "float32", "float64", "complex64",
    "complex128", "object",
];

/// Annotation keys whose argument names a record type, and the tag the
/// injected field lines are given.
const REFERENCE_KEYS: &[(&str, RefKind, &str)] = &[
    ("body", RefKind::Body, "bref"),
    ("success", RefKind::Response, "sref"),
    ("failure", RefKind::Response, "fref"),
    ("swrap", RefKind::Wrapper, "swrapref"),
    ("fwrap", RefKind::Wrapper, "fwrapref"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefKind {
    Body,
    Response,
    Wrapper,
}

/// One field of a flattened record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatField {
    /// Field name, prefixed with its parents' names (`profile.age`)
    pub path: String,
    pub kind: FieldKind,
}

/// What a flattened field holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// A primitive value; `type_name` is the Go type, possibly `[]`-prefixed
    Scalar {
        type_name: String,
        required: bool,
        description: Option<String>,
    },
    /// A nested record whose fields follow under `path.`
    Object { array: bool },
}

/// A record type resolved to its qualified name and flattened fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedType {
    /// `<module path>.<Type>`, unique across the source tree
    pub qualified_name: String,
    pub fields: Vec<FlatField>,
}

impl ResolvedType {
    /// Renders the fields as annotation lines under `tag`.
    ///
    /// With `pointer` set (wrapper references) every scalar carries an extra
    /// payload flag after its required flag, and the object field named by the
    /// pointer is marked `true true`.
    pub fn annotation_lines(&self, tag: &str, pointer: Option<&str>) -> Vec<String> {
        self.fields
            .iter()
            .map(|field| {
                let mut line = format!("{} {} {}", tag, self.qualified_name, field.path);
                match &field.kind {
                    FieldKind::Scalar {
                        type_name,
                        required,
                        description,
                    } => {
                        line.push_str(&format!(" {{{}}} {}", type_name, required));
                        if let Some(ptr) = pointer {
                            line.push_str(&format!(" {}", field.path == ptr));
                        }
                        if let Some(desc) = description {
                            line.push_str(&format!(" \"{}\"", escape_description(desc)));
                        }
                    }
                    FieldKind::Object { array } => {
                        line.push_str(if *array { " {[]object}" } else { " {object}" });
                        if pointer == Some(field.path.as_str()) {
                            line.push_str(" true true");
                        }
                    }
                }
                line
            })
            .collect()
    }
}

/// Doubles backslashes so the description stays a valid double-quoted scalar.
fn escape_description(desc: &str) -> String {
    desc.replace('\\', "\\\\")
}

/// The files of one module directory
struct Module {
    files: IndexMap<PathBuf, ParsedFile>,
}

impl Module {
    fn file(&self, path: &Path) -> Option<&ParsedFile> {
        self.files.get(path).or_else(|| {
            self.files
                .values()
                .find(|f| f.path.file_name() == path.file_name())
        })
    }

    fn find_type(&self, name: &str) -> Option<(&ParsedFile, &str)> {
        self.files
            .values()
            .find_map(|f| f.types.get(name).map(|body| (f, body.as_str())))
    }
}

/// Reference resolver - replaces type references in annotation blocks with the
/// flattened fields of the referenced Go record types.
///
/// Modules are parsed lazily, one directory at a time, the first time a
/// reference leads into them. Imported modules are looked up under the source
/// root, the way a Go workspace lays them out.
pub struct ReferenceResolver {
    /// Directory import paths are relative to
    source_root: PathBuf,
    verbose: bool,
    /// Parsed modules by module key
    packages: HashMap<String, Module>,
    /// Flattened fields by qualified type name
    types: HashMap<String, Vec<FlatField>>,
    /// Qualified names currently being flattened, to cut self-references
    resolving_stack: HashSet<String>,
    /// Number of self-references cut so far
    cycle_cuts: usize,
}

impl ReferenceResolver {
    pub fn new(source_root: PathBuf, verbose: bool) -> Self {
        debug!("Initializing ReferenceResolver at {}", source_root.display());
        Self {
            source_root: canonical(&source_root),
            verbose,
            packages: HashMap::new(),
            types: HashMap::new(),
            resolving_stack: HashSet::new(),
            cycle_cuts: 0,
        }
    }

    /// Resolves every reference in the blocks, in place.
    ///
    /// Each referencing line is replaced by the tagged field lines of its
    /// type followed by the line itself, with the reference rewritten to the
    /// qualified type name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvedReference`] for the first reference that
    /// cannot be located; the blocks may be partially rewritten at that point.
    pub fn resolve(&mut self, blocks: &mut [Block]) -> Result<()> {
        for block in blocks.iter_mut() {
            let mut resolved = Vec::with_capacity(block.lines.len());

            for line in &block.lines {
                let Some((kind, tag)) = classify(line) else {
                    resolved.push(line.clone());
                    continue;
                };

                match kind {
                    RefKind::Body | RefKind::Response => {
                        let Some(span) = reference_span(line, kind) else {
                            resolved.push(line.clone());
                            continue;
                        };
                        let reference = &line[span.clone()];
                        let (array, bare) = match reference.strip_prefix("[]") {
                            Some(bare) => ("[]", bare),
                            None => ("", reference),
                        };

                        let rt = self.resolve_reference(bare, &block.source_file)?;
                        resolved.extend(rt.annotation_lines(tag, None));
                        resolved.push(format!(
                            "{}{}{}{}",
                            &line[..span.start],
                            array,
                            rt.qualified_name,
                            &line[span.end..]
                        ));
                    }
                    RefKind::Wrapper => {
                        let sections: Vec<&str> = line.split_whitespace().collect();
                        // <key> <reference> <payload field>
                        if sections.len() != 3 {
                            if self.verbose {
                                warn!(
                                    "reference resolving: wrapper \"{}\" in the file \"{}\" needs a reference and a payload field, skipped.",
                                    line,
                                    block.source_file.display()
                                );
                            }
                            continue;
                        }

                        let rt = self.resolve_reference(sections[1], &block.source_file)?;
                        resolved.extend(rt.annotation_lines(tag, Some(sections[2])));
                        resolved.push(format!(
                            "{} {} {}",
                            sections[0], rt.qualified_name, sections[2]
                        ));
                    }
                }
            }

            block.lines = resolved;
        }
        Ok(())
    }

    /// Resolves one reference, `Type` or `alias.Type`, as seen from `file`.
    ///
    /// # Errors
    ///
    /// Fails when the alias is not imported by `file`, a module directory
    /// cannot be read, or the module does not declare the type.
    pub fn resolve_reference(&mut self, reference: &str, file: &Path) -> Result<ResolvedType> {
        self.resolve_type(reference, file)
            .map_err(|reason| Error::UnresolvedReference {
                reference: reference.to_string(),
                file: file.to_path_buf(),
                reason,
            })
    }

    fn resolve_type(
        &mut self,
        reference: &str,
        file: &Path,
    ) -> std::result::Result<ResolvedType, String> {
        debug!("Resolving reference {} from {}", reference, file.display());

        let origin = self.load_module(module_dir(file))?;
        let (module_key, type_name) = match reference.split_once('.') {
            Some((alias, type_name)) => {
                let import = self.packages[&origin]
                    .file(file)
                    .and_then(|f| f.imports.get(alias))
                    .cloned();
                let Some(import) = import else {
                    if self.verbose {
                        warn!(
                            "reference resolving: cannot resolve the location of package \"{}\" in the file \"{}\"",
                            alias,
                            file.display()
                        );
                    }
                    return Err(format!("unknown import alias \"{}\"", alias));
                };
                let dir = self.source_root.join(&import);
                (self.load_module(&dir)?, type_name)
            }
            None => (origin, reference),
        };

        let qualified_name = format!("{}.{}", module_key, type_name);
        if let Some(fields) = self.types.get(&qualified_name) {
            debug!("Type {} found in cache", qualified_name);
            return Ok(ResolvedType {
                qualified_name,
                fields: fields.clone(),
            });
        }

        if self.resolving_stack.contains(&qualified_name) {
            self.cycle_cuts += 1;
            return Err(format!("\"{}\" refers to itself", qualified_name));
        }

        let Some((decl_file, body)) = self.packages[&module_key]
            .find_type(type_name)
            .map(|(f, body)| (f.path.clone(), body.to_string()))
        else {
            if self.verbose {
                warn!(
                    "reference resolving: unknown type \"{}\" in the file \"{}\"",
                    type_name,
                    file.display()
                );
            }
            return Err(format!("unknown type \"{}\" in module \"{}\"", type_name, module_key));
        };

        let cuts_before = self.cycle_cuts;
        self.resolving_stack.insert(qualified_name.clone());
        let fields = self.flatten(&body, &decl_file);
        self.resolving_stack.remove(&qualified_name);

        // Fields cut short by a cycle depend on the types being flattened
        // around them; only acyclic results are cached.
        if self.cycle_cuts == cuts_before {
            self.types.insert(qualified_name.clone(), fields.clone());
        }
        Ok(ResolvedType {
            qualified_name,
            fields,
        })
    }

    /// Flattens a record body. Nested records are expanded recursively;
    /// those that cannot be resolved are dropped.
    fn flatten(&mut self, body: &str, decl_file: &Path) -> Vec<FlatField> {
        let mut fields = Vec::new();

        for decl in parse_fields(body) {
            if is_basic_type(&decl.type_name) {
                fields.push(FlatField {
                    path: decl.name,
                    kind: FieldKind::Scalar {
                        type_name: decl.type_name,
                        required: decl.required,
                        description: decl.description,
                    },
                });
                continue;
            }

            let (array, inner) = match decl.type_name.strip_prefix("[]") {
                Some(inner) => (true, inner),
                None => (false, decl.type_name.as_str()),
            };

            match self.resolve_type(inner, decl_file) {
                Ok(child) if !child.fields.is_empty() => {
                    fields.push(FlatField {
                        path: decl.name.clone(),
                        kind: FieldKind::Object { array },
                    });
                    fields.extend(child.fields.into_iter().map(|f| FlatField {
                        path: format!("{}.{}", decl.name, f.path),
                        kind: f.kind,
                    }));
                }
                Ok(_) => debug!("Field {} has no resolvable fields", decl.name),
                Err(reason) => {
                    if self.verbose {
                        warn!(
                            "reference resolving: field \"{}\" in the file \"{}\" skipped: {}",
                            decl.name,
                            decl_file.display(),
                            reason
                        );
                    }
                }
            }
        }

        fields
    }

    /// Parses a module directory once and returns its key.
    fn load_module(&mut self, dir: &Path) -> std::result::Result<String, String> {
        let key = self.module_key(dir);
        if self.packages.contains_key(&key) {
            return Ok(key);
        }

        let files = GoParser::parse_package(dir).map_err(|e| {
            if self.verbose {
                warn!(
                    "reference resolving: unknown package \"{}\": {}",
                    dir.display(),
                    e
                );
            }
            format!("cannot read module \"{}\": {}", dir.display(), e)
        })?;
        self.packages.insert(key.clone(), Module { files });
        Ok(key)
    }

    /// Module path of a directory: relative to the source root, with forward
    /// slashes and no leading slash.
    fn module_key(&self, dir: &Path) -> String {
        let dir = canonical(dir);
        let relative = dir.strip_prefix(&self.source_root).unwrap_or(&dir);
        let key = relative
            .to_string_lossy()
            .replace('\\', "/")
            .trim_start_matches('/')
            .to_string();

        if key.is_empty() {
            dir.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "main".to_string())
        } else {
            key
        }
    }
}

fn classify(line: &str) -> Option<(RefKind, &'static str)> {
    REFERENCE_KEYS
        .iter()
        .find(|(key, _, _)| {
            line.strip_prefix(key)
                .is_some_and(|rest| rest.starts_with(' '))
        })
        .map(|(_, kind, tag)| (*kind, *tag))
}

/// Byte range of the type reference in a body or response line.
fn reference_span(line: &str, kind: RefKind) -> Option<Range<usize>> {
    let re = match kind {
        RefKind::Body => &RE_BODY_REF,
        _ => &RE_RESPONSE_REF,
    };
    re.captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.range())
}

fn is_basic_type(type_name: &str) -> bool {
    let tested = type_name.strip_prefix("[]").unwrap_or(type_name);
    BASIC_TYPES.contains(&tested)
}

fn module_dir(file: &Path) -> &Path {
    match file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
