//! Route inference from gorilla/mux style registration calls.
//!
//! Recognised shapes, on the line right after an annotation block:
//!
//! - `r.HandleFunc("/path/{id:[0-9]+}", Handler).Methods("GET", "POST")`
//! - `r.Handle("/path", handler)` (method defaults to `get`)
//! - `sr := r.PathPrefix("/prefix").Subrouter()` for mount declarations

use super::Block;
use log::warn;
use regex::Regex;
use std::sync::LazyLock;

static RE_HANDLER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:HandleFunc|Handle)\("([^"]+)".*\.Methods\(([^)]+)\)|(?:HandleFunc|Handle)\("([^"]+)""#,
    )
    .unwrap()
});
static RE_PATH_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"PathPrefix\("([^"]+)"\)"#).unwrap());
static RE_PATH_CONSTRAINT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r":[^}]+").unwrap());
static RE_PATH_PARAM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{([^}]+)\}").unwrap());

/// Enriches a just-closed block from the source line that terminated it.
///
/// Explicit annotations always win over inferred ones.
pub fn infer_route(block: &mut Block, line: &str, verbose: bool) {
    if let Some(caps) = RE_HANDLER.captures(line) {
        let (path, methods) = match caps.get(3) {
            Some(path) => (path.as_str(), None),
            None => (&caps[1], caps.get(2).map(|m| m.as_str())),
        };
        add_route(block, path, methods, verbose);
    } else if let Some(caps) = RE_PATH_PREFIX.captures(line) {
        add_mount_path(block, &caps[1]);
    }
}

fn add_route(block: &mut Block, path: &str, methods: Option<&str>, verbose: bool) {
    if block.has_entry("router") {
        if verbose {
            warn!(
                "extracting, Handler func: router \"{}\" is already defined in the endpoint annotation, skipped.",
                path
            );
        }
        return;
    }

    let methods = match methods {
        Some(m) => m.replace('"', "").to_lowercase(),
        None => "get".to_string(),
    };
    let path = RE_PATH_CONSTRAINT.replace_all(path, "").into_owned();
    block.lines.push(format!("router {} [{}]", path, methods));

    for caps in RE_PATH_PARAM.captures_iter(&path) {
        let param = &caps[1];
        if block.has_entry(&format!("param {}", param)) {
            if verbose {
                warn!(
                    "extracting, Handler func: param \"{}\" defined in the handler url \"{}\" is already defined in the endpoint annotation, skipped.",
                    param, path
                );
            }
            continue;
        }
        block.lines.push(format!("param {} path {{string}} true", param));
    }
}

/// A mount block names itself with a method-less `router` entry; the
/// `PathPrefix` call supplies its relative path.
fn add_mount_path(block: &mut Block, prefix: &str) {
    let declares_mount = block
        .lines
        .iter()
        .any(|l| l.starts_with("router ") && l.split_whitespace().count() == 2);

    if declares_mount && !block.has_entry("routerurl") {
        block.lines.push(format!("routerurl {}", prefix));
    }
}
