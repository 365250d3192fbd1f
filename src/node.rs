//! Generic schema node representation
//!
//! Both dialects are consumed through these shapes, never through the raw
//! document format:
//! - tree dialect: [`SchemaNode`] (tag, ordered attributes, ordered children,
//!   optional text)
//! - flat dialect: [`FlatUnit`] (named, ordered key/value entries)
//!
//! A [`SchemaNode`] also serves as the in-memory document the reference
//! evaluator parses from and writes into.

/// A tag/attribute/children/text tree node
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchemaNode {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<SchemaNode>,
    pub text: Option<String>,
}

impl SchemaNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Builder: add an attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Builder: add a child
    pub fn with_child(mut self, child: SchemaNode) -> Self {
        self.children.push(child);
        self
    }

    /// Builder: set text content
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing an existing value in place
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    /// Text content trimmed of surrounding whitespace, if any remains
    pub fn trimmed_text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    /// First child with the given tag
    pub fn child(&self, tag: &str) -> Option<&SchemaNode> {
        self.children.iter().find(|child| child.tag == tag)
    }

    /// All children with the given tag, in document order
    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a SchemaNode> + 'a {
        self.children.iter().filter(move |child| child.tag == tag)
    }

    /// Append a child and return it for further writing
    pub fn create_child(&mut self, tag: &str) -> &mut SchemaNode {
        self.children.push(SchemaNode::new(tag));
        let last = self.children.len() - 1;
        &mut self.children[last]
    }
}

// =============================================================================
// Flat dialect
// =============================================================================

/// Value of one flat entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlatValue {
    Scalar(String),
    List(Vec<String>),
    Map(Vec<(String, String)>),
    /// A value the reader could not represent; the reason is kept for the report
    Malformed(String),
}

impl FlatValue {
    /// Look up a key in a map value
    pub fn get(&self, key: &str) -> Option<&str> {
        match self {
            FlatValue::Map(entries) => entries
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }
}

/// One `key: value` entry of a flat schema unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatEntry {
    pub key: String,
    pub value: FlatValue,
}

impl FlatEntry {
    pub fn scalar(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: FlatValue::Scalar(value.into()),
        }
    }

    pub fn list<I, S>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into(),
            value: FlatValue::List(values.into_iter().map(Into::into).collect()),
        }
    }

    pub fn map<I, K, V>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            key: key.into(),
            value: FlatValue::Map(
                values
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

/// One named flat schema unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatUnit {
    pub name: String,
    pub entries: Vec<FlatEntry>,
}

impl FlatUnit {
    pub fn new(name: impl Into<String>, entries: Vec<FlatEntry>) -> Self {
        Self {
            name: name.into(),
            entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trimmed_text() {
        assert_eq!(SchemaNode::new("a").with_text("  int \n").trimmed_text(), Some("int"));
        assert_eq!(SchemaNode::new("a").with_text(" \n\t ").trimmed_text(), None);
        assert_eq!(SchemaNode::new("a").trimmed_text(), None);
    }

    #[test]
    fn test_set_attribute_replaces_in_place() {
        let mut node = SchemaNode::new("a")
            .with_attribute("x", "1")
            .with_attribute("y", "2");
        node.set_attribute("x", "3");
        node.set_attribute("z", "4");

        assert_eq!(
            node.attributes,
            vec![
                ("x".to_string(), "3".to_string()),
                ("y".to_string(), "2".to_string()),
                ("z".to_string(), "4".to_string()),
            ]
        );
    }

    #[test]
    fn test_children_named() {
        let node = SchemaNode::new("guild")
            .with_child(SchemaNode::new("member").with_attribute("name", "a"))
            .with_child(SchemaNode::new("rank"))
            .with_child(SchemaNode::new("member").with_attribute("name", "b"));

        let names: Vec<_> = node
            .children_named("member")
            .filter_map(|m| m.attribute("name"))
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(node.child("rank").map(|n| n.tag.as_str()), Some("rank"));
    }
}
