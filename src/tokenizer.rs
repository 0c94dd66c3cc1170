//! Annotation tokenizer.
//!
//! Each annotation line is split into whitespace separated sections, keeping
//! double-quoted spans together. The first section is the key; it selects a
//! [`TokenKind`], whose positional dictionary names the meta field every
//! following section is stored under. Sections past the end of the dictionary
//! are appended to the last named field, so trailing free text needs no quotes.

use crate::extractor::Block;
use indexmap::IndexMap;
use log::warn;
use regex::Regex;
use std::sync::LazyLock;

static RE_SECTIONS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""[^"]*"|\S+"#).unwrap());

/// Token kinds, grouped by the dictionary that lays out their arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A single free-text value
    Value,
    /// A request parameter
    Param,
    /// An API server
    Server,
    /// A success or failure response
    ReqResp,
    /// The route and its methods
    Method,
    /// A field of a referenced body or response type
    Ref,
    /// A field of a referenced wrapper type
    Wrap,
}

impl TokenKind {
    /// Maps an annotation key to its kind. Unknown keys yield `None`.
    pub fn for_key(key: &str) -> Option<Self> {
        let kind = match key {
            "title" | "desc" | "terms" | "contact.name" | "contact.url" | "contact.email"
            | "lic.name" | "lic.url" | "ver" | "summary" | "id" | "tag" | "accept"
            | "produce" | "swrap" | "fwrap" | "body" | "subrouter" | "routerurl" => {
                TokenKind::Value
            }
            "server" => TokenKind::Server,
            "param" => TokenKind::Param,
            "sref" | "fref" | "bref" => TokenKind::Ref,
            "swrapref" | "fwrapref" => TokenKind::Wrap,
            "success" | "failure" => TokenKind::ReqResp,
            "router" => TokenKind::Method,
            _ => return None,
        };
        Some(kind)
    }

    /// Meta field names, by argument position.
    pub fn dictionary(self) -> &'static [&'static str] {
        match self {
            TokenKind::Value => &["value"],
            TokenKind::Param => &["key", "in", "type", "req", "desc"],
            TokenKind::Server => &["url", "desc"],
            TokenKind::ReqResp => &["code", "type", "ref", "desc"],
            TokenKind::Method => &["url", "method"],
            TokenKind::Ref => &["pkg.type", "key", "type", "req", "desc"],
            TokenKind::Wrap => &["pkg.type", "key", "type", "req", "ptr", "desc"],
        }
    }

    fn post_process(self, meta: &mut IndexMap<String, String>) {
        if self != TokenKind::ReqResp {
            return;
        }
        // A plain string response has no schema reference; the text after
        // the type is all description.
        let is_string = matches!(
            meta.get("type").map(String::as_str),
            Some("{string}") | Some("string")
        );
        if is_string {
            let reference = meta.get("ref").cloned().unwrap_or_default();
            let desc = meta.get("desc").cloned().unwrap_or_default();
            meta.insert("desc".to_string(), format!("{} {}", reference, desc).trim().to_string());
            meta.insert("ref".to_string(), String::new());
        }
    }
}

/// One parsed annotation entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub key: String,
    pub meta: IndexMap<String, String>,
}

impl Token {
    pub fn new(kind: TokenKind, key: impl Into<String>, meta: IndexMap<String, String>) -> Self {
        Self {
            kind,
            key: key.into(),
            meta,
        }
    }

    /// Looks up a meta field.
    pub fn meta(&self, name: &str) -> Option<&str> {
        self.meta.get(name).map(String::as_str)
    }

    /// Returns a copy of the token with one meta field replaced.
    pub fn with_meta(&self, name: &str, value: impl Into<String>) -> Token {
        let mut meta = self.meta.clone();
        meta.insert(name.to_string(), value.into());
        Token {
            kind: self.kind,
            key: self.key.clone(),
            meta,
        }
    }
}

/// Converts resolved blocks into tokens.
pub struct Tokenizer {
    verbose: bool,
}

impl Tokenizer {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Tokenizes every line of a block; lines that cannot be tokenized are skipped.
    pub fn parse(&self, block: &Block) -> Vec<Token> {
        block
            .lines
            .iter()
            .filter_map(|line| self.tokenize(line))
            .collect()
    }

    /// Tokenizes one annotation line.
    pub fn tokenize(&self, line: &str) -> Option<Token> {
        let sections: Vec<&str> = RE_SECTIONS.find_iter(line).map(|m| m.as_str()).collect();
        let Some((key, args)) = sections.split_first() else {
            if self.verbose {
                warn!("tokenization: cannot tokenize this line: {}", line);
            }
            return None;
        };

        let Some(kind) = TokenKind::for_key(key) else {
            if self.verbose {
                warn!("tokenization: unknown token type: {}", key);
            }
            return None;
        };

        let dictionary = kind.dictionary();
        let mut meta = IndexMap::new();
        for (i, arg) in args.iter().enumerate() {
            match dictionary.get(i) {
                Some(name) => {
                    meta.insert(name.to_string(), arg.to_string());
                }
                None => {
                    let last = dictionary[dictionary.len() - 1];
                    if let Some(value) = meta.get_mut(last) {
                        value.push(' ');
                        value.push_str(arg);
                    }
                }
            }
        }
        kind.post_process(&mut meta);

        Some(Token::new(kind, *key, meta))
    }
}
