//! Schema readers
//!
//! Thin adapters from schema text to the generic node representation:
//! - XML (tree dialect) via `quick-xml`
//! - YAML (flat dialect) via `serde_yaml`
//!
//! Readers perform no schema interpretation; reserved attributes, directives and
//! type names are left for the models.

use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Deserialize;
use serde_yaml::Value;

use crate::error::{CodegenError, Result};
use crate::node::{FlatEntry, FlatUnit, FlatValue, SchemaNode};

/// Schema dialect of an input file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Nested attributed tree (XML)
    Tree,
    /// Flat field lists (YAML)
    Flat,
}

impl Dialect {
    /// Detect the dialect from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "xml" => Some(Dialect::Tree),
            "yml" | "yaml" => Some(Dialect::Flat),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Tree => "tree",
            Dialect::Flat => "flat",
        }
    }
}

// =============================================================================
// XML
// =============================================================================

/// Read an XML document into its root [`SchemaNode`]
pub fn read_tree(text: &str) -> Result<SchemaNode> {
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<SchemaNode> = Vec::new();
    let mut root: Option<SchemaNode> = None;

    loop {
        match reader.read_event().map_err(CodegenError::xml)? {
            Event::Start(start) => stack.push(element(&start)?),
            Event::Empty(start) => {
                let node = element(&start)?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::End(_) => {
                let node = stack.pop().ok_or_else(|| {
                    CodegenError::InvalidDocument("unbalanced end tag".to_string())
                })?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    let text = text.unescape().map_err(CodegenError::xml)?;
                    push_text(top, &text);
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    let bytes = data.into_inner();
                    push_text(top, &String::from_utf8_lossy(&bytes));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(CodegenError::InvalidDocument(format!(
            "element '{}' is never closed",
            open.tag
        )));
    }

    root.ok_or_else(|| CodegenError::InvalidDocument("document has no root element".to_string()))
}

fn element(start: &BytesStart<'_>) -> Result<SchemaNode> {
    let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut node = SchemaNode::new(tag);

    for attribute in start.attributes() {
        let attribute = attribute.map_err(CodegenError::xml)?;
        let name = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute.unescape_value().map_err(CodegenError::xml)?.into_owned();
        node.attributes.push((name, value));
    }

    Ok(node)
}

fn attach(stack: &mut [SchemaNode], root: &mut Option<SchemaNode>, node: SchemaNode) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
        return Ok(());
    }
    if root.is_some() {
        return Err(CodegenError::InvalidDocument(
            "document has more than one root element".to_string(),
        ));
    }
    *root = Some(node);
    Ok(())
}

fn push_text(node: &mut SchemaNode, text: &str) {
    match node.text.as_mut() {
        Some(existing) => existing.push_str(text),
        None => node.text = Some(text.to_string()),
    }
}

// =============================================================================
// YAML
// =============================================================================

/// Read every flat schema unit of a (possibly multi-document) YAML text.
///
/// Each document is a mapping of unit name to an ordered list of single-key
/// entries.
pub fn read_flat(text: &str) -> Result<Vec<FlatUnit>> {
    let mut units = Vec::new();

    for document in serde_yaml::Deserializer::from_str(text) {
        match Value::deserialize(document)? {
            Value::Null => continue,
            Value::Mapping(mapping) => {
                for (name, body) in mapping {
                    units.push(flat_unit(&name, body)?);
                }
            }
            _ => {
                return Err(CodegenError::InvalidDocument(
                    "a flat schema document must be a mapping of unit names".to_string(),
                ))
            }
        }
    }

    Ok(units)
}

fn flat_unit(name: &Value, body: Value) -> Result<FlatUnit> {
    let name = scalar(name).ok_or_else(|| {
        CodegenError::InvalidDocument("schema unit names must be scalars".to_string())
    })?;

    let Value::Sequence(items) = body else {
        return Err(CodegenError::InvalidDocument(format!(
            "schema unit '{}' must be a list of entries",
            name
        )));
    };

    // entry-level problems become malformed entries; the unit and its file still load
    let mut entries = Vec::with_capacity(items.len());
    for (position, item) in items.into_iter().enumerate() {
        let Value::Mapping(mapping) = item else {
            entries.push(FlatEntry {
                key: format!("#{}", position),
                value: FlatValue::Malformed("an entry must be a 'key: value' mapping".to_string()),
            });
            continue;
        };
        for (key, value) in mapping {
            let Some(key) = scalar(&key) else {
                entries.push(FlatEntry {
                    key: format!("#{}", position),
                    value: FlatValue::Malformed("an entry key must be a scalar".to_string()),
                });
                continue;
            };
            entries.push(FlatEntry {
                key,
                value: flat_value(value),
            });
        }
    }

    Ok(FlatUnit::new(name, entries))
}

fn flat_value(value: Value) -> FlatValue {
    let nested = || FlatValue::Malformed("nested values are not supported".to_string());

    match value {
        Value::Null => FlatValue::Malformed("the entry has no value".to_string()),
        Value::Sequence(items) => match items.iter().map(scalar).collect::<Option<Vec<_>>>() {
            Some(names) => FlatValue::List(names),
            None => nested(),
        },
        Value::Mapping(mapping) => match mapping
            .iter()
            .map(|(k, v)| Some((scalar(k)?, scalar(v)?)))
            .collect::<Option<Vec<_>>>()
        {
            Some(pairs) => FlatValue::Map(pairs),
            None => nested(),
        },
        other => scalar(&other).map(FlatValue::Scalar).unwrap_or_else(nested),
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_tree() {
        let xml = r#"<?xml version="1.0"?>
<config>
    <!-- the master node -->
    <master>string</master>
    <app name="string" cont_="map" key_="name">string</app>
    <list prop1="int" cont_="vector"/>
</config>"#;

        let root = read_tree(xml).unwrap();
        assert_eq!(root.tag, "config");
        assert_eq!(root.trimmed_text(), None);
        assert_eq!(root.children.len(), 3);

        let app = &root.children[1];
        assert_eq!(app.tag, "app");
        assert_eq!(app.attribute("cont_"), Some("map"));
        assert_eq!(app.trimmed_text(), Some("string"));
        assert_eq!(
            app.attributes.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>(),
            vec!["name", "cont_", "key_"]
        );

        assert_eq!(root.children[2].attribute("prop1"), Some("int"));
        assert!(root.children[2].children.is_empty());
    }

    #[test]
    fn test_read_tree_rejects_multiple_roots() {
        assert!(read_tree("<a/><b/>").is_err());
        assert!(read_tree("").is_err());
    }

    #[test]
    fn test_read_flat() {
        let yaml = r#"
Player:
  - name: string
  - level: uint8
  - tag: { type: char, size: 16, comment: "display tag" }
  - $key: [name]
  - $comment: a player
"#;
        let units = read_flat(yaml).unwrap();
        assert_eq!(units.len(), 1);

        let player = &units[0];
        assert_eq!(player.name, "Player");
        assert_eq!(player.entries.len(), 5);
        assert_eq!(player.entries[0], FlatEntry::scalar("name", "string"));
        assert_eq!(player.entries[2].value.get("size"), Some("16"));
        assert_eq!(player.entries[3], FlatEntry::list("$key", ["name"]));
    }

    #[test]
    fn test_read_flat_multiple_documents() {
        let yaml = "A:\n  - x: int\n---\nB:\n  - y: bool\nC:\n  - z: float\n";
        let units = read_flat(yaml).unwrap();
        let names: Vec<_> = units.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_read_flat_keeps_malformed_entries() {
        let yaml = "Player:\n  - name:\n  - level: uint8\n  - stats: { hp: [1, 2] }\n  - plain\nGuild:\n  - id: uint32\n";
        let units = read_flat(yaml).unwrap();
        let names: Vec<_> = units.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Player", "Guild"]);

        let player = &units[0];
        assert_eq!(player.entries.len(), 4);
        assert!(matches!(player.entries[0].value, FlatValue::Malformed(_)));
        assert_eq!(player.entries[1], FlatEntry::scalar("level", "uint8"));
        assert!(matches!(player.entries[2].value, FlatValue::Malformed(_)));
        assert_eq!(player.entries[3].key, "#3");
        assert_eq!(units[1].entries, vec![FlatEntry::scalar("id", "uint32")]);
    }

    #[test]
    fn test_dialect_from_path() {
        assert_eq!(Dialect::from_path(Path::new("a/config.xml")), Some(Dialect::Tree));
        assert_eq!(Dialect::from_path(Path::new("player.yml")), Some(Dialect::Flat));
        assert_eq!(Dialect::from_path(Path::new("player.yaml")), Some(Dialect::Flat));
        assert_eq!(Dialect::from_path(Path::new("player.txt")), None);
    }
}
