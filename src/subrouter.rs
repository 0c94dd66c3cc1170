//! Nested router mounts.
//!
//! A mount is declared by a block of its own, holding nothing but a
//! method-less `router <name>`, an optional `routerurl <relative path>` and an
//! optional `subrouter <parent name>`. Endpoints registered on a mount carry
//! `subrouter <name>`; their route path is prefixed with the mount's absolute
//! path, which is the concatenation of the relative paths up the parent chain.

use crate::error::{Error, Result};
use crate::tokenizer::Token;
use log::debug;
use std::collections::HashMap;

/// Longest parent chain followed before giving up on a cycle.
const MAX_DEPTH: usize = 10;

/// Membership value that is never looked up.
const SELF_TAG: &str = "sub";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Mount {
    name: String,
    relative_path: String,
    parent: Option<String>,
}

impl Mount {
    /// Recognises a mount declaration. Every token must contribute exactly
    /// one of the three mount fields.
    fn from_tokens(tokens: &[Token]) -> Option<Mount> {
        if !(2..=3).contains(&tokens.len()) {
            return None;
        }

        let mut name = None;
        let mut relative_path = None;
        let mut parent = None;
        for t in tokens {
            let matched = match t.key.as_str() {
                "router" if t.meta("method").unwrap_or_default().is_empty() && name.is_none() => {
                    name = Some(t.meta("url").unwrap_or_default().to_string());
                    true
                }
                "routerurl" if relative_path.is_none() => {
                    relative_path = Some(t.meta("value").unwrap_or_default().to_string());
                    true
                }
                "subrouter" if parent.is_none() => {
                    parent = Some(t.meta("value").unwrap_or_default().to_string());
                    true
                }
                _ => false,
            };
            if !matched {
                return None;
            }
        }

        Some(Mount {
            name: name?,
            relative_path: relative_path.unwrap_or_default(),
            parent: parent.filter(|p| !p.is_empty()),
        })
    }
}

/// Removes mount declarations from the endpoint sets and prefixes the route
/// path of every endpoint registered on a mount.
///
/// # Errors
///
/// Returns [`Error::SubrouterCycle`] when a parent chain is longer than
/// allowed, which in practice means it loops.
pub fn resolve_subrouters(endpoints: Vec<Vec<Token>>) -> Result<Vec<Vec<Token>>> {
    let mut mounts = Vec::new();
    let mut filtered = Vec::with_capacity(endpoints.len());
    for tokens in endpoints {
        match Mount::from_tokens(&tokens) {
            Some(mount) => mounts.push(mount),
            None => filtered.push(tokens),
        }
    }

    let mut paths = HashMap::new();
    for mount in &mounts {
        mount_path(&mounts, &mount.name, &mut paths, 0)?;
    }
    debug!("Resolved {} subrouter mounts", paths.len());

    Ok(filtered
        .into_iter()
        .map(|tokens| prefix_route(tokens, &paths))
        .collect())
}

fn prefix_route(mut tokens: Vec<Token>, paths: &HashMap<String, String>) -> Vec<Token> {
    let router = tokens.iter().rposition(|t| t.key == "router");
    let membership = tokens
        .iter()
        .rev()
        .find(|t| t.key == "subrouter")
        .and_then(|t| t.meta("value"))
        .unwrap_or_default();

    if let Some(i) = router {
        if membership != SELF_TAG {
            if let Some(prefix) = paths.get(membership) {
                let url = format!("{}{}", prefix, tokens[i].meta("url").unwrap_or_default());
                tokens[i] = tokens[i].with_meta("url", url);
            }
        }
    }
    tokens
}

fn mount_path(
    mounts: &[Mount],
    name: &str,
    paths: &mut HashMap<String, String>,
    depth: usize,
) -> Result<String> {
    if depth >= MAX_DEPTH {
        return Err(Error::SubrouterCycle(name.to_string()));
    }
    if let Some(path) = paths.get(name) {
        return Ok(path.clone());
    }

    let Some(mount) = mounts.iter().find(|m| m.name == name) else {
        return Ok(String::new());
    };
    let parent_path = match &mount.parent {
        Some(parent) => mount_path(mounts, parent, paths, depth + 1)?,
        None => String::new(),
    };

    let path = format!("{}{}", parent_path, mount.relative_path);
    paths.insert(name.to_string(), path.clone());
    Ok(path)
}
