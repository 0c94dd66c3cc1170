use crate::schema_generator::{SchemaGenerator, SchemaLine, Wrapper};
use crate::serializer::{safe_value, write_to_file, YamlBuffer};
use crate::tokenizer::Token;
use crate::transform::{media_type, transform_tokens};
use anyhow::Result;
use log::{debug, warn};
use std::collections::HashSet;
use std::path::Path;

/// OpenAPI version written at the end of every document
pub const OPENAPI_VERSION: &str = "3.0.2";

/// Wrappers declared by one endpoint
#[derive(Debug, Default)]
struct EndpointWrappers {
    success: Option<Wrapper>,
    failure: Option<Wrapper>,
}

/// OpenAPI document builder
///
/// Renders the main section tokens and the endpoint token sets into an
/// OpenAPI YAML document. Component schemas are collected per call, so one
/// builder can generate any number of independent documents.
pub struct OpenApiBuilder {
    verbose: bool,
}

impl OpenApiBuilder {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Generates the document text.
    ///
    /// Layout: `info`, `servers`, `components`, `paths`, then the trailing
    /// `openapi` version field.
    pub fn generate(&self, main: &[Token], endpoints: &[Vec<Token>]) -> String {
        let main = transform_tokens(main);
        let endpoints: Vec<Vec<Token>> = endpoints.iter().map(|e| transform_tokens(e)).collect();

        let mut buffer = YamlBuffer::new();
        self.main_section(&mut buffer, &main);

        let mut schemas = SchemaGenerator::new(self.verbose);
        let wrappers: Vec<EndpointWrappers> = endpoints
            .iter()
            .map(|e| {
                schemas.register_components(e);
                EndpointWrappers {
                    success: schemas.wrapper(e, "swrapref"),
                    failure: schemas.wrapper(e, "fwrapref"),
                }
            })
            .collect();

        if !schemas.is_empty() {
            buffer.label("components", 0);
            buffer.label("schemas", 1);
            schemas.write_components(&mut buffer, 2);
        }

        buffer.label("paths", 0);
        let mut rendered = HashSet::new();
        for (index, tokens) in endpoints.iter().enumerate() {
            let Some(url) = self.route_url(tokens) else {
                continue;
            };
            if !rendered.insert(url) {
                continue;
            }

            debug!("Adding path: {}", url);
            buffer.label(url, 1);
            for (sibling, sibling_tokens) in endpoints.iter().enumerate().skip(index) {
                if self.route_url(sibling_tokens) == Some(url) {
                    self.operations(&mut buffer, sibling_tokens, &wrappers[sibling], &schemas);
                }
            }
        }

        buffer.write(&format!("openapi: \"{}\"", OPENAPI_VERSION), 0);
        buffer.flush()
    }

    /// Generates the document and writes it to `output`, creating missing
    /// directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the output location cannot be created or written.
    pub fn write(&self, main: &[Token], endpoints: &[Vec<Token>], output: &Path) -> Result<()> {
        write_to_file(&self.generate(main, endpoints), output)
    }

    fn main_section(&self, buffer: &mut YamlBuffer, main: &[Token]) {
        buffer.label("info", 0);
        write_meta(buffer, find_token(main, "title"), "value", "title", 1);
        write_meta(buffer, find_token(main, "ver"), "value", "version", 1);
        write_meta(buffer, find_token(main, "desc"), "value", "description", 1);
        write_meta(buffer, find_token(main, "terms"), "value", "termsOfService", 1);

        for (prefix, label) in [("contact.", "contact"), ("lic.", "license")] {
            let group: Vec<&Token> = main.iter().filter(|t| t.key.starts_with(prefix)).collect();
            if group.is_empty() {
                continue;
            }
            buffer.label(label, 1);
            for t in group {
                if let Some(value) = t.meta("value") {
                    buffer.key_value(&t.key[prefix.len()..], &safe_value(value), 2);
                }
            }
        }

        let servers = find_tokens(main, "server");
        if !servers.is_empty() {
            buffer.label("servers", 0);
            for t in servers {
                write_meta(buffer, Some(t), "url", "- url", 1);
                write_meta(buffer, Some(t), "desc", "description", 2);
            }
        }
    }

    /// Route path of an endpoint with at least one method.
    fn route_url<'a>(&self, tokens: &'a [Token]) -> Option<&'a str> {
        let router = find_token(tokens, "router")?;
        let url = router.meta("url")?;
        if parse_array(router.meta("method").unwrap_or_default()).is_empty() {
            if self.verbose {
                warn!("generator: route \"{}\" declares no method, skipped", url);
            }
            return None;
        }
        Some(url)
    }

    fn operations(
        &self,
        buffer: &mut YamlBuffer,
        tokens: &[Token],
        wrappers: &EndpointWrappers,
        schemas: &SchemaGenerator,
    ) {
        let tags = find_token(tokens, "tag")
            .and_then(|t| t.meta("value"))
            .map(parse_array)
            .unwrap_or_default();
        let methods = find_token(tokens, "router")
            .and_then(|t| t.meta("method"))
            .map(parse_array)
            .unwrap_or_default();

        for method in methods {
            buffer.label(&method, 2);
            write_meta(buffer, find_token(tokens, "summary"), "value", "summary", 3);
            write_meta(buffer, find_token(tokens, "id"), "value", "operationId", 3);
            write_meta(buffer, find_token(tokens, "desc"), "value", "description", 3);

            if !tags.is_empty() {
                buffer.label("tags", 3);
                for tag in &tags {
                    buffer.line(&format!("- {}", safe_value(tag)), 3);
                }
            }

            let params = find_tokens(tokens, "param");
            if !params.is_empty() {
                params_section(buffer, &params, 3);
            }

            if let Some(body) = find_token(tokens, "body") {
                let accept = find_token(tokens, "accept")
                    .and_then(|t| t.meta("value"))
                    .map(parse_media_types)
                    .unwrap_or_default();
                if !accept.is_empty() {
                    body_section(buffer, body, &accept, schemas, 3);
                }
            }

            self.response_section(buffer, tokens, wrappers, schemas, 3);
        }
    }

    fn response_section(
        &self,
        buffer: &mut YamlBuffer,
        tokens: &[Token],
        wrappers: &EndpointWrappers,
        schemas: &SchemaGenerator,
        depth: usize,
    ) {
        buffer.label("responses", depth);
        let produce = find_token(tokens, "produce")
            .and_then(|t| t.meta("value"))
            .map(parse_media_types)
            .unwrap_or_default();

        for (key, wrapper) in [
            ("success", wrappers.success.as_ref()),
            ("failure", wrappers.failure.as_ref()),
        ] {
            for t in find_tokens(tokens, key) {
                let Some(code) = t.meta("code") else {
                    continue;
                };
                buffer.label(code, depth + 1);
                write_meta(buffer, Some(t), "desc", "description", depth + 2);
                buffer.label("content", depth + 2);

                let data_type = t.meta("type").unwrap_or_default();
                if data_type != "object" {
                    buffer.label("text/plain", depth + 3);
                    buffer.label("schema", depth + 4);
                    write_type(buffer, data_type, depth + 5);
                    continue;
                }

                let reference = t.meta("ref").unwrap_or_default();
                for mt in &produce {
                    buffer.label(mt, depth + 3);
                    buffer.label("schema", depth + 4);
                    match wrapper {
                        Some(w) if w.has_slot() => {
                            write_wrapped(buffer, w, reference, schemas, depth + 4)
                        }
                        Some(_) => {
                            if self.verbose {
                                warn!(
                                    "generator: {} wrapper has no payload field, \"{}\" is referenced directly",
                                    key, reference
                                );
                            }
                            write_reference(buffer, reference, schemas, depth + 5);
                        }
                        None => write_reference(buffer, reference, schemas, depth + 5),
                    }
                }
            }
        }
    }
}

fn params_section(buffer: &mut YamlBuffer, params: &[&Token], depth: usize) {
    buffer.label("parameters", depth);
    for &t in params {
        write_meta(buffer, Some(t), "key", "- name", depth);
        write_meta(buffer, Some(t), "desc", "description", depth + 1);
        write_meta(buffer, Some(t), "in", "in", depth + 1);
        if let Some(required) = t.meta("req") {
            buffer.key_value("required", &(required == "true").to_string(), depth + 1);
        }
        buffer.label("schema", depth + 1);
        if let Some(type_name) = t.meta("type") {
            write_type(buffer, type_name, depth + 2);
        }
    }
}

fn body_section(
    buffer: &mut YamlBuffer,
    body: &Token,
    media_types: &[String],
    schemas: &SchemaGenerator,
    depth: usize,
) {
    buffer.label("requestBody", depth);
    buffer.label("content", depth + 1);
    for mt in media_types {
        buffer.label(mt, depth + 2);
        buffer.label("schema", depth + 3);
        if let Some(reference) = body.meta("value") {
            write_reference(buffer, reference, schemas, depth + 4);
        }
    }
}

/// Writes the wrapper's schema with the payload reference in its slot. The
/// wrapper's own (nameless) label is left out.
fn write_wrapped(
    buffer: &mut YamlBuffer,
    wrapper: &Wrapper,
    reference: &str,
    schemas: &SchemaGenerator,
    base: usize,
) {
    for line in wrapper.lines().iter().skip(1) {
        match line {
            SchemaLine::Text { indent, content } => buffer.line(content, base + indent),
            SchemaLine::PayloadSlot { indent } => {
                write_reference(buffer, reference, schemas, base + indent)
            }
        }
    }
}

/// `$ref` to a component, or an array of them for `[]`-prefixed references.
fn write_reference(buffer: &mut YamlBuffer, reference: &str, schemas: &SchemaGenerator, indent: usize) {
    match reference.strip_prefix("[]") {
        Some(element) => {
            buffer.key_value("type", "array", indent);
            buffer.label("items", indent);
            buffer.key_value("$ref", &schemas.component_ref(element), indent + 1);
        }
        None => buffer.key_value("$ref", &schemas.component_ref(reference), indent),
    }
}

/// Writes `type`, expanding `array <element>` into an items schema.
fn write_type(buffer: &mut YamlBuffer, type_name: &str, indent: usize) {
    match type_name.strip_prefix("array ") {
        Some(element) => {
            buffer.key_value("type", "array", indent);
            buffer.label("items", indent);
            buffer.key_value("type", element, indent + 1);
        }
        None => buffer.key_value("type", &safe_value(type_name), indent),
    }
}

fn write_meta(buffer: &mut YamlBuffer, token: Option<&Token>, meta: &str, key: &str, indent: usize) {
    if let Some(value) = token.and_then(|t| t.meta(meta)) {
        buffer.key_value(key, &safe_value(value), indent);
    }
}

fn find_token<'a>(tokens: &'a [Token], key: &str) -> Option<&'a Token> {
    tokens.iter().find(|t| t.key == key)
}

fn find_tokens<'a>(tokens: &'a [Token], key: &str) -> Vec<&'a Token> {
    tokens.iter().filter(|t| t.key == key).collect()
}

/// Splits a comma separated list, dropping empty items.
fn parse_array(content: &str) -> Vec<String> {
    content
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_media_types(content: &str) -> Vec<String> {
    parse_array(content)
        .iter()
        .map(|mt| media_type(mt).to_string())
        .collect()
}
