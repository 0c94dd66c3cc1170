//! Meta value normalisation applied to tokens before document generation.
//!
//! Go type names become OpenAPI primitive types, short media type names are
//! expanded, codes and versions are quoted and method lists lose their
//! brackets. [`transform_tokens`] returns new tokens and leaves its input as is,
//! so every value is transformed exactly once.

use crate::tokenizer::Token;
use regex::Regex;
use std::sync::LazyLock;

static RE_ARRAY_TYPE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\{\[\]").unwrap());
static RE_SPECIAL_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[{}\[\]]").unwrap());

/// Meta transformation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transformation {
    Quote,
    TypeClean,
    MediaType,
    SpecialChars,
}

impl Transformation {
    fn apply(self, input: &str) -> String {
        match self {
            Transformation::Quote => quote(input),
            Transformation::TypeClean => clean_type(input),
            Transformation::MediaType => media_type(input).to_string(),
            Transformation::SpecialChars => strip_special_chars(input),
        }
    }
}

/// Transformations registered for a token key and meta field.
fn transformation_for(key: &str, meta: &str) -> Option<Transformation> {
    match (key, meta) {
        ("ver", "value") => Some(Transformation::Quote),
        ("success" | "failure", "code") => Some(Transformation::Quote),
        (
            "param" | "success" | "failure" | "sref" | "fref" | "bref" | "swrapref" | "fwrapref",
            "type",
        ) => Some(Transformation::TypeClean),
        ("accept" | "produce", "value") => Some(Transformation::MediaType),
        ("router", "method") => Some(Transformation::SpecialChars),
        _ => None,
    }
}

/// Applies every registered transformation to a token sequence.
pub fn transform_tokens(tokens: &[Token]) -> Vec<Token> {
    tokens.iter().map(transform_token).collect()
}

fn transform_token(token: &Token) -> Token {
    let mut transformed = token.clone();
    for (name, value) in transformed.meta.iter_mut() {
        if let Some(t) = transformation_for(&token.key, name) {
            *value = t.apply(value);
        }
    }
    transformed
}

/// Wraps the input in double quotes unless already quoted.
pub fn quote(input: &str) -> String {
    let mut output = String::with_capacity(input.len() + 2);
    if !input.starts_with('"') {
        output.push('"');
    }
    output.push_str(input);
    if !input.ends_with('"') || input.len() == 1 {
        output.push('"');
    }
    output
}

/// `{[]int64}` becomes `array integer`, `{uint8}` becomes `integer`.
pub fn clean_type(input: &str) -> String {
    let marked = RE_ARRAY_TYPE.replace(input, "{array ");
    let stripped = strip_special_chars(&marked);
    match stripped.strip_prefix("array ") {
        Some(element) => format!("array {}", openapi_type(element)),
        None => openapi_type(&stripped).to_string(),
    }
}

fn strip_special_chars(input: &str) -> String {
    RE_SPECIAL_CHARS.replace_all(input, "").into_owned()
}

/// Maps Go primitive type names to OpenAPI types; other names pass through.
pub fn openapi_type(go_type: &str) -> &str {
    match go_type {
        "byte" | "rune" | "int" | "int8" | "int16" | "int32" | "int64" | "uint" | "uint8"
        | "uint16" | "uint32" | "uint64" | "uintptr" => "integer",
        "float32" | "float64" => "number",
        "bool" => "boolean",
        other => other,
    }
}

/// Expands short media type names; full names pass through.
pub fn media_type(short: &str) -> &str {
    match short {
        "text" => "text/plain",
        "html" => "text/html",
        "xml" => "text/xml",
        "json" => "application/json",
        "form" => "application/x-www-form-urlencoded",
        "multipart" => "multipart/form-data",
        "json-api" => "application/vnd.api+json",
        "json-stream" => "application/x-json-stream",
        "octet-stream" => "application/octet-stream",
        "png" => "image/png",
        "jpeg" | "jpg" => "image/jpeg",
        "gif" => "image/gif",
        other => other,
    }
}
