//! Dynamic tree values
//!
//! Executes the generated `parse`/`write`/`reset` procedures against
//! [`SchemaNode`] documents, following the same rules as the emitted code:
//! absent nodes return false, map children keep the last element per key,
//! multimaps and sequences keep every element in document order, and plain
//! children read the first matching child.
//!
//! Map keys keep the key attribute's type, so `write` emits map elements in
//! key order (numeric for integer keys) rather than document order.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::row::FieldValue;
use crate::model::{ContainerKind, NodeId, TreeNode, TreeSchema};
use crate::node::SchemaNode;

/// Key of a map element: its key attribute's typed value.
///
/// Ordered like the generated map's native key type. Floats use a total
/// order; values of different types (never produced by one schema) order by
/// type.
#[derive(Debug, Clone)]
pub struct MapKey(FieldValue);

impl MapKey {
    pub fn value(&self) -> &FieldValue {
        &self.0
    }

    fn rank(&self) -> u8 {
        match self.0 {
            FieldValue::Int(_) => 0,
            FieldValue::UInt(_) => 1,
            FieldValue::Float(_) => 2,
            FieldValue::Bool(_) => 3,
            FieldValue::Text(_) => 4,
            FieldValue::Bytes(_) => 5,
        }
    }
}

impl From<FieldValue> for MapKey {
    fn from(value: FieldValue) -> Self {
        Self(value)
    }
}

impl From<&str> for MapKey {
    fn from(text: &str) -> Self {
        Self(FieldValue::Text(text.to_string()))
    }
}

impl Ord for MapKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.0, &other.0) {
            (FieldValue::Int(a), FieldValue::Int(b)) => a.cmp(b),
            (FieldValue::UInt(a), FieldValue::UInt(b)) => a.cmp(b),
            (FieldValue::Float(a), FieldValue::Float(b)) => a.total_cmp(b),
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a.cmp(b),
            (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
            (FieldValue::Bytes(a), FieldValue::Bytes(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for MapKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for MapKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MapKey {}

/// Value of one child member
#[derive(Debug, Clone, PartialEq)]
pub enum ChildValue {
    Plain(TreeValue),
    Sequence(Vec<TreeValue>),
    Map(BTreeMap<MapKey, TreeValue>),
    MultiMap(BTreeMap<MapKey, Vec<TreeValue>>),
}

impl ChildValue {
    fn new(schema: &TreeSchema, id: NodeId) -> Self {
        match schema.node(id).container {
            ContainerKind::None => ChildValue::Plain(TreeValue::new(schema, id)),
            ContainerKind::Sequence => ChildValue::Sequence(Vec::new()),
            ContainerKind::Map { multi: false, .. } => ChildValue::Map(BTreeMap::new()),
            ContainerKind::Map { multi: true, .. } => ChildValue::MultiMap(BTreeMap::new()),
        }
    }

    /// Number of elements; a plain child counts as one
    pub fn len(&self) -> usize {
        match self {
            ChildValue::Plain(_) => 1,
            ChildValue::Sequence(items) => items.len(),
            ChildValue::Map(items) => items.len(),
            ChildValue::MultiMap(items) => items.values().map(Vec::len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Elements in write order
    pub fn elements(&self) -> Vec<&TreeValue> {
        match self {
            ChildValue::Plain(value) => vec![value],
            ChildValue::Sequence(items) => items.iter().collect(),
            ChildValue::Map(items) => items.values().collect(),
            ChildValue::MultiMap(items) => items.values().flatten().collect(),
        }
    }
}

/// In-memory value of one tree node, shaped by its [`TreeNode`]
#[derive(Debug, Clone, PartialEq)]
pub struct TreeValue {
    id: NodeId,
    content: Option<FieldValue>,
    attributes: Vec<FieldValue>,
    children: Vec<ChildValue>,
}

impl TreeValue {
    /// Value with every member at its default
    pub fn new(schema: &TreeSchema, id: NodeId) -> Self {
        let node = schema.node(id);
        Self {
            id,
            content: node.content.as_ref().map(|ty| FieldValue::default_for(ty.kind())),
            attributes: node
                .attributes
                .iter()
                .map(|a| FieldValue::default_for(a.ty.kind()))
                .collect(),
            children: node
                .children
                .iter()
                .map(|&child| ChildValue::new(schema, child))
                .collect(),
        }
    }

    /// Default value of the schema root
    pub fn root(schema: &TreeSchema) -> Self {
        Self::new(schema, schema.root())
    }

    pub fn content(&self) -> Option<&FieldValue> {
        self.content.as_ref()
    }

    pub fn attribute(&self, schema: &TreeSchema, name: &str) -> Option<&FieldValue> {
        let index = schema.node(self.id).attributes.iter().position(|a| a.name == name)?;
        self.attributes.get(index)
    }

    /// Set an attribute from text, with the same conversion `parse` applies
    pub fn set_attribute(&mut self, schema: &TreeSchema, name: &str, raw: &str) -> bool {
        let node = schema.node(self.id);
        let Some(index) = node.attributes.iter().position(|a| a.name == name) else {
            return false;
        };
        match FieldValue::parse(node.attributes[index].ty.kind(), raw) {
            Some(value) => {
                self.attributes[index] = value;
                true
            }
            None => false,
        }
    }

    /// Child member by tag
    pub fn child(&self, schema: &TreeSchema, tag: &str) -> Option<&ChildValue> {
        let index = schema
            .node(self.id)
            .children
            .iter()
            .position(|&child| schema.node(child).tag == tag)?;
        self.children.get(index)
    }

    /// Read from `node`; false when the node is absent
    pub fn parse(&mut self, schema: &TreeSchema, node: Option<&SchemaNode>) -> bool {
        let Some(node) = node else {
            return false;
        };
        let shape = schema.node(self.id);

        if let (Some(ty), Some(slot)) = (&shape.content, self.content.as_mut()) {
            if let Some(value) = node.text.as_deref().and_then(|text| FieldValue::parse(ty.kind(), text.trim())) {
                *slot = value;
            }
        }

        for (attribute, slot) in shape.attributes.iter().zip(self.attributes.iter_mut()) {
            if let Some(value) = node
                .attribute(&attribute.name)
                .and_then(|raw| FieldValue::parse(attribute.ty.kind(), raw))
            {
                *slot = value;
            }
        }

        for (&child_id, slot) in shape.children.iter().zip(self.children.iter_mut()) {
            let child = schema.node(child_id);
            match slot {
                ChildValue::Plain(value) => {
                    value.parse(schema, node.child(&child.tag));
                }
                ChildValue::Sequence(items) => {
                    for element_node in node.children_named(&child.tag) {
                        items.push(parse_element(schema, child_id, element_node));
                    }
                }
                ChildValue::Map(items) => {
                    for element_node in node.children_named(&child.tag) {
                        let element = parse_element(schema, child_id, element_node);
                        items.insert(element.key(schema, child), element);
                    }
                }
                ChildValue::MultiMap(items) => {
                    for element_node in node.children_named(&child.tag) {
                        let element = parse_element(schema, child_id, element_node);
                        items.entry(element.key(schema, child)).or_default().push(element);
                    }
                }
            }
        }

        true
    }

    /// Write into `node`; false when the node is absent
    pub fn write(&self, schema: &TreeSchema, node: Option<&mut SchemaNode>) -> bool {
        let Some(node) = node else {
            return false;
        };
        let shape = schema.node(self.id);

        if let Some(content) = &self.content {
            node.text = Some(content.to_string());
        }
        for (attribute, value) in shape.attributes.iter().zip(&self.attributes) {
            node.set_attribute(&attribute.name, value.to_string());
        }

        for (&child_id, value) in shape.children.iter().zip(&self.children) {
            let tag = &schema.node(child_id).tag;
            for element in value.elements() {
                element.write(schema, Some(node.create_child(tag)));
            }
        }

        true
    }

    /// Restore defaults, clear containers and reset plain children
    pub fn reset(&mut self, schema: &TreeSchema) {
        let shape = schema.node(self.id);

        if let (Some(ty), Some(slot)) = (&shape.content, self.content.as_mut()) {
            *slot = FieldValue::default_for(ty.kind());
        }
        for (attribute, slot) in shape.attributes.iter().zip(self.attributes.iter_mut()) {
            *slot = FieldValue::default_for(attribute.ty.kind());
        }
        for child in &mut self.children {
            match child {
                ChildValue::Plain(value) => value.reset(schema),
                ChildValue::Sequence(items) => items.clear(),
                ChildValue::Map(items) => items.clear(),
                ChildValue::MultiMap(items) => items.clear(),
            }
        }
    }

    /// Write into a fresh document rooted at this node's tag
    pub fn to_document(&self, schema: &TreeSchema) -> SchemaNode {
        let mut document = SchemaNode::new(schema.node(self.id).tag.clone());
        self.write(schema, Some(&mut document));
        document
    }

    fn key(&self, schema: &TreeSchema, shape: &TreeNode) -> MapKey {
        let value = match &shape.container {
            ContainerKind::Map { key, .. } => self.attribute(schema, key).cloned(),
            _ => None,
        };
        MapKey(value.unwrap_or_else(|| FieldValue::Text(String::new())))
    }
}

fn parse_element(schema: &TreeSchema, id: NodeId, node: &SchemaNode) -> TreeValue {
    let mut element = TreeValue::new(schema, id);
    element.parse(schema, Some(node));
    element
}
