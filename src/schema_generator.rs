use crate::serializer::{safe_value, YamlBuffer};
use crate::tokenizer::Token;
use indexmap::IndexMap;
use log::{debug, warn};
use std::collections::HashSet;

/// Token keys carrying the fields of a referenced body or response type
const COMPONENT_KEYS: &[&str] = &["bref", "sref", "fref"];

/// One rendered schema line, relative to the schema's own indentation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaLine {
    Text { indent: usize, content: String },
    /// Where a wrapper's payload reference goes
    PayloadSlot { indent: usize },
}

/// An envelope type a response payload is nested in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wrapper {
    lines: Vec<SchemaLine>,
}

impl Wrapper {
    pub fn lines(&self) -> &[SchemaLine] {
        &self.lines
    }

    pub fn has_slot(&self) -> bool {
        self.lines
            .iter()
            .any(|l| matches!(l, SchemaLine::PayloadSlot { .. }))
    }
}

/// A field of a referenced type, read back from its token
#[derive(Debug, Clone)]
struct Property {
    key: String,
    type_name: String,
    required: bool,
    description: Option<String>,
    pointer: bool,
}

impl Property {
    fn from_token(token: &Token) -> Self {
        Self {
            key: token.meta("key").unwrap_or_default().to_string(),
            type_name: token.meta("type").unwrap_or_default().to_string(),
            required: token.meta("req") == Some("true"),
            description: token.meta("desc").map(str::to_string),
            pointer: token.meta("ptr") == Some("true"),
        }
    }
}

/// Schema generator - turns referenced type fields into component schemas
/// and response wrappers.
///
/// Components are cached by qualified type name for the lifetime of the
/// generator; each gets a short display name unique within the document.
pub struct SchemaGenerator {
    verbose: bool,
    /// Rendered component schemas by qualified name, in first-seen order
    components: IndexMap<String, Vec<SchemaLine>>,
    /// Display name by qualified name
    names: IndexMap<String, String>,
    /// Display names already handed out
    taken: HashSet<String>,
}

impl SchemaGenerator {
    pub fn new(verbose: bool) -> Self {
        debug!("Initializing SchemaGenerator");
        Self {
            verbose,
            components: IndexMap::new(),
            names: IndexMap::new(),
            taken: HashSet::new(),
        }
    }

    /// Builds and caches the component schemas referenced by one endpoint.
    pub fn register_components(&mut self, tokens: &[Token]) {
        let mut groups: IndexMap<&str, Vec<&Token>> = IndexMap::new();
        for t in tokens.iter().filter(|t| COMPONENT_KEYS.contains(&t.key.as_str())) {
            if let Some(qualified) = t.meta("pkg.type") {
                groups.entry(qualified).or_default().push(t);
            }
        }

        for (qualified, defs) in groups {
            if self.components.contains_key(qualified) {
                continue;
            }

            let name = self.unique_name(qualified);
            debug!("Registering component {} as {}", qualified, name);

            // A type referenced as body and response in one endpoint shows up
            // once per tag; one set of fields is enough.
            let first_key = &defs[0].key;
            let mut seen = HashSet::new();
            let properties: Vec<Property> = defs
                .iter()
                .filter(|t| &t.key == first_key)
                .map(|t| Property::from_token(t))
                .filter(|p| seen.insert(p.key.clone()))
                .collect();

            let lines = render_object(&name, &properties, 0, false);
            self.components.insert(qualified.to_string(), lines);
        }
    }

    /// Builds the wrapper declared by `key` tokens (`swrapref`/`fwrapref`).
    pub fn wrapper(&self, tokens: &[Token], key: &str) -> Option<Wrapper> {
        let properties: Vec<Property> = tokens
            .iter()
            .filter(|t| t.key == key)
            .map(Property::from_token)
            .collect();
        if properties.is_empty() {
            return None;
        }
        Some(Wrapper {
            lines: render_object("", &properties, 0, false),
        })
    }

    /// The quoted `$ref` value of a component, or an empty string when the
    /// type was never registered.
    pub fn component_ref(&self, qualified: &str) -> String {
        match self.names.get(qualified) {
            Some(name) => format!("\"#/components/schemas/{}\"", name),
            None => {
                if self.verbose {
                    warn!("generator: missing component reference \"{}\"", qualified);
                }
                String::new()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Writes all cached component schemas.
    pub fn write_components(&self, buffer: &mut YamlBuffer, indent: usize) {
        for lines in self.components.values() {
            write_lines(buffer, lines, indent);
        }
    }

    /// Last segment of the qualified name, suffixed with 1, 2, ... when
    /// already taken by another type.
    fn unique_name(&mut self, qualified: &str) -> String {
        if let Some(name) = self.names.get(qualified) {
            return name.clone();
        }

        let base = qualified.rsplit('.').next().unwrap_or(qualified);
        let mut name = base.to_string();
        let mut i = 0;
        while self.taken.contains(&name) {
            i += 1;
            name = format!("{}{}", base, i);
        }

        self.taken.insert(name.clone());
        self.names.insert(qualified.to_string(), name.clone());
        name
    }
}

/// Writes schema lines shifted by `base`. Payload slots are skipped.
pub fn write_lines(buffer: &mut YamlBuffer, lines: &[SchemaLine], base: usize) {
    for line in lines {
        if let SchemaLine::Text { indent, content } = line {
            buffer.line(content, base + indent);
        }
    }
}

fn text(lines: &mut Vec<SchemaLine>, indent: usize, content: String) {
    lines.push(SchemaLine::Text { indent, content });
}

/// Renders an object schema from flattened properties. Nested objects are
/// rebuilt from the `parent.` prefixes of their fields.
fn render_object(
    name: &str,
    properties: &[Property],
    depth: usize,
    is_array: bool,
) -> Vec<SchemaLine> {
    let name = name.rsplit('.').next().unwrap_or(name);
    let mut lines = Vec::new();

    text(&mut lines, depth, format!("{}:", name.trim()));
    let mut depth = depth;
    if is_array {
        text(&mut lines, depth + 1, "type: array".to_string());
        text(&mut lines, depth + 1, "items:".to_string());
        depth += 1;
    }
    text(&mut lines, depth + 1, "type: object".to_string());

    let (local, nested): (Vec<&Property>, Vec<&Property>) =
        properties.iter().partition(|p| !p.key.contains('.'));

    let required: Vec<&&Property> = local.iter().filter(|p| p.required).collect();
    if !required.is_empty() {
        text(&mut lines, depth + 1, "required:".to_string());
        for p in required {
            text(&mut lines, depth + 1, format!("- {}", p.key));
        }
    }

    if local.is_empty() {
        return lines;
    }

    text(&mut lines, depth + 1, "properties:".to_string());
    for p in local {
        let (array, type_name) = match p.type_name.strip_prefix("array ") {
            Some(element) => (true, element),
            None => (false, p.type_name.as_str()),
        };

        if type_name == "object" {
            if p.pointer {
                text(&mut lines, depth + 2, format!("{}:", p.key));
                lines.push(SchemaLine::PayloadSlot { indent: depth + 3 });
            } else {
                let prefix = format!("{}.", p.key);
                let children: Vec<Property> = nested
                    .iter()
                    .filter_map(|c| {
                        c.key.strip_prefix(&prefix).map(|key| Property {
                            key: key.to_string(),
                            ..(*c).clone()
                        })
                    })
                    .collect();
                lines.extend(render_object(&p.key, &children, depth + 2, array));
            }
            continue;
        }

        text(&mut lines, depth + 2, format!("{}:", p.key));
        if let Some(desc) = &p.description {
            text(&mut lines, depth + 3, format!("description: {}", safe_value(desc)));
        }
        if array {
            text(&mut lines, depth + 3, "type: array".to_string());
            text(&mut lines, depth + 3, "items:".to_string());
            text(&mut lines, depth + 4, format!("type: {}", type_name));
        } else {
            text(&mut lines, depth + 3, format!("type: {}", type_name));
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::Tokenizer;
    use crate::transform::transform_tokens;
    use pretty_assertions::assert_eq;

    fn tokens(lines: &[&str]) -> Vec<Token> {
        let tokenizer = Tokenizer::new(false);
        let raw: Vec<Token> = lines.iter().filter_map(|l| tokenizer.tokenize(l)).collect();
        transform_tokens(&raw)
    }

    fn render(lines: &[SchemaLine], base: usize) -> String {
        let mut buffer = YamlBuffer::new();
        write_lines(&mut buffer, lines, base);
        buffer.flush()
    }

    #[test]
    fn test_component_with_required_and_types() {
        let mut generator = SchemaGenerator::new(false);
        generator.register_components(&tokens(&[
            "bref pkg.Person Name {string} true",
            "bref pkg.Person Age {int} false",
            "body pkg.Person",
        ]));

        let mut buffer = YamlBuffer::new();
        generator.write_components(&mut buffer, 0);
        assert_eq!(
            buffer.flush(),
            "Person:
  type: object
  required:
  - Name
  properties:
    Name:
      type: string
    Age:
      type: integer
"
        );
        assert_eq!(generator.component_ref("pkg.Person"), "\"#/components/schemas/Person\"");
    }

    #[test]
    fn test_nested_and_array_properties() {
        let mut generator = SchemaGenerator::new(false);
        generator.register_components(&tokens(&[
            r#"sref m.User name {string} false "Display name""#,
            "sref m.User tags {[]string} false",
            "sref m.User home {object}",
            "sref m.User home.city {string} true",
            "sref m.User pets {[]object}",
            "sref m.User pets.kind {string} false",
        ]));

        let mut buffer = YamlBuffer::new();
        generator.write_components(&mut buffer, 0);
        assert_eq!(
            buffer.flush(),
            r#"User:
  type: object
  properties:
    name:
      description: "Display name"
      type: string
    tags:
      type: array
      items:
        type: string
    home:
      type: object
      required:
      - city
      properties:
        city:
          type: string
    pets:
      type: array
      items:
        type: object
        properties:
          kind:
            type: string
"#
        );
    }

    #[test]
    fn test_display_name_collisions_are_suffixed() {
        let mut generator = SchemaGenerator::new(false);
        generator.register_components(&tokens(&["sref a/model.Item id {int} false"]));
        generator.register_components(&tokens(&[
            "sref b/model.Item id {int} false",
            "fref c/model.Item id {int} false",
            "sref a/model.Item id {int} false",
        ]));

        assert_eq!(generator.component_ref("a/model.Item"), "\"#/components/schemas/Item\"");
        assert_eq!(generator.component_ref("b/model.Item"), "\"#/components/schemas/Item1\"");
        assert_eq!(generator.component_ref("c/model.Item"), "\"#/components/schemas/Item2\"");

        let mut buffer = YamlBuffer::new();
        generator.write_components(&mut buffer, 0);
        let labels: Vec<_> = buffer
            .lines()
            .iter()
            .filter(|l| !l.starts_with(' '))
            .cloned()
            .collect();
        assert_eq!(labels, vec!["Item:\n", "Item1:\n", "Item2:\n"]);
    }

    #[test]
    fn test_same_type_under_several_tags_is_rendered_once() {
        let mut generator = SchemaGenerator::new(false);
        generator.register_components(&tokens(&[
            "bref pkg.Person Name {string} true",
            "sref pkg.Person Name {string} true",
            "sref pkg.Person Name {string} true",
        ]));

        let mut buffer = YamlBuffer::new();
        generator.write_components(&mut buffer, 0);
        assert_eq!(
            buffer.flush(),
            "Person:\n  type: object\n  required:\n  - Name\n  properties:\n    Name:\n      type: string\n"
        );
    }

    #[test]
    fn test_missing_component_reference_is_empty() {
        let generator = SchemaGenerator::new(true);
        assert_eq!(generator.component_ref("pkg.Ghost"), "");
        assert!(generator.is_empty());
    }

    #[test]
    fn test_wrapper_with_top_level_payload() {
        let generator = SchemaGenerator::new(false);
        let wrapper = generator
            .wrapper(
                &tokens(&[
                    "swrapref r.Envelope status {string} false false",
                    "swrapref r.Envelope data {object} false true",
                    "swrap r.Envelope data",
                ]),
                "swrapref",
            )
            .unwrap();

        assert!(wrapper.has_slot());
        assert_eq!(
            wrapper.lines()[wrapper.lines().len() - 1],
            SchemaLine::PayloadSlot { indent: 3 }
        );
        assert_eq!(
            render(wrapper.lines(), 0),
            ":\n  type: object\n  properties:\n    status:\n      type: string\n    data:\n"
        );
        assert!(generator.wrapper(&[], "fwrapref").is_none());
    }

    #[test]
    fn test_wrapper_with_nested_payload() {
        let generator = SchemaGenerator::new(false);
        let wrapper = generator
            .wrapper(
                &tokens(&[
                    "fwrapref r.Nested meta {object}",
                    "fwrapref r.Nested meta.code {int} false false",
                    "fwrapref r.Nested meta.error {object} true true",
                ]),
                "fwrapref",
            )
            .unwrap();

        let slot = wrapper
            .lines()
            .iter()
            .find_map(|l| match l {
                SchemaLine::PayloadSlot { indent } => Some(*indent),
                _ => None,
            })
            .unwrap();
        assert_eq!(slot, 5);
    }
}
