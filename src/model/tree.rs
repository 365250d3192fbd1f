//! Tree Schema Model
//!
//! A [`SchemaNode`] document becomes a [`TreeSchema`]: one [`TreeNode`] per
//! element, held in an arena in depth-first order. Parents own their children
//! by [`NodeId`]; there are no back references.
//!
//! Key constraints:
//! - The reserved attributes `container_`/`cont_` and `key_` are read once here
//!   and become a typed [`ContainerKind`]. Emitters never see them.
//! - Member order is content, attributes, children, all in document order.
//! - A child whose container annotation is invalid is excluded with its whole
//!   subtree. It is classified before descending, so nothing of it reaches the
//!   arena.
//! - The root is never a container.

use std::collections::HashSet;

use crate::codegen::names::{member_ident, type_ident, QualifiedPath};
use crate::diagnostics::Diagnostics;
use crate::error::SchemaError;
use crate::node::SchemaNode;
use crate::types::{PrimitiveType, TypeResolver};

const CONTAINER_ATTRS: [&str; 2] = ["container_", "cont_"];
const KEY_ATTR: &str = "key_";

const SEQUENCE_KINDS: [&str; 5] = ["vector", "list", "deque", "dequeue", "seq"];
const MAP_KIND: &str = "map";
const MULTIMAP_KIND: &str = "multimap";

/// Member name of a node's text content
pub const CONTENT_MEMBER: &str = "content";

/// Whether an attribute name is reserved for container annotation
pub fn is_reserved(name: &str) -> bool {
    CONTAINER_ATTRS.contains(&name) || name == KEY_ATTR
}

// =============================================================================
// Node Types
// =============================================================================

/// Index of a node in its [`TreeSchema`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// How a node is held by its parent
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ContainerKind {
    /// A single nested value
    #[default]
    None,
    /// Ordered elements, document order preserved
    Sequence,
    /// Elements keyed by the value of attribute `key`.
    ///
    /// Unique maps keep the last element parsed for a key; multimaps keep all.
    Map { key: String, multi: bool },
}

impl ContainerKind {
    pub fn is_container(&self) -> bool {
        !matches!(self, ContainerKind::None)
    }
}

/// A typed, non-reserved attribute
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Attribute name as it appears in documents
    pub name: String,
    pub ty: PrimitiveType,
}

impl Attribute {
    pub fn member_name(&self) -> String {
        member_ident(&self.name)
    }
}

/// One element type of a tree schema
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    /// Element tag as it appears in documents
    pub tag: String,
    /// Generated struct name
    pub struct_name: String,
    /// Member name in the parent struct
    pub member_name: String,
    pub attributes: Vec<Attribute>,
    /// Type of the trimmed text content, when the schema declares one
    pub content: Option<PrimitiveType>,
    pub children: Vec<NodeId>,
    pub container: ContainerKind,
}

impl TreeNode {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Key attribute of a map container
    pub fn map_key(&self) -> Option<&Attribute> {
        match &self.container {
            ContainerKind::Map { key, .. } => self.attribute(key),
            _ => None,
        }
    }
}

// =============================================================================
// Tree Schema
// =============================================================================

/// Arena-held tree of element types for one schema unit
#[derive(Debug, Clone, PartialEq)]
pub struct TreeSchema {
    nodes: Vec<TreeNode>,
    root: NodeId,
}

impl TreeSchema {
    /// Build the model from a document root, reporting skipped elements into `diags`
    pub fn parse(root: &SchemaNode, resolver: &TypeResolver, diags: &mut Diagnostics) -> Self {
        let mut schema = TreeSchema {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        let unit = root.tag.clone();
        let path = QualifiedPath::root(type_ident(&root.tag));

        let mut parser = Parser {
            unit: &unit,
            resolver,
            diags,
        };
        schema.root = parser.parse_node(&mut schema.nodes, root, ContainerKind::None, &path);

        tracing::debug!(unit = %unit, nodes = schema.nodes.len(), "built tree schema");
        schema
    }

    /// Schema unit name (the root tag)
    pub fn name(&self) -> &str {
        &self.root_node().tag
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_node(&self) -> &TreeNode {
        self.node(self.root)
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0]
    }

    /// Children of a node in document order
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &TreeNode)> {
        self.children_of(self.node(id))
    }

    /// Children of an already looked-up node
    pub fn children_of<'a>(&'a self, node: &'a TreeNode) -> impl Iterator<Item = (NodeId, &'a TreeNode)> + 'a {
        node.children.iter().map(move |&child| (child, self.node(child)))
    }

    /// All nodes in depth-first order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &TreeNode)> {
        self.nodes.iter().enumerate().map(|(i, node)| (NodeId(i), node))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Depth-first walk from the root
    pub fn walk<V: TreeVisitor>(&self, visitor: &mut V) {
        let path = QualifiedPath::root(self.root_node().struct_name.clone());
        self.walk_node(self.root, &path, visitor);
    }

    fn walk_node<V: TreeVisitor>(&self, id: NodeId, path: &QualifiedPath, visitor: &mut V) {
        visitor.enter(self, id, path);
        for (child_id, child) in self.children(id) {
            let child_path = path.child(child.struct_name.clone());
            self.walk_node(child_id, &child_path, visitor);
        }
        visitor.leave(self, id, path);
    }
}

/// Callbacks for a depth-first walk of a [`TreeSchema`].
///
/// `enter` runs before a node's children, `leave` after them.
pub trait TreeVisitor {
    fn enter(&mut self, schema: &TreeSchema, id: NodeId, path: &QualifiedPath);

    fn leave(&mut self, _schema: &TreeSchema, _id: NodeId, _path: &QualifiedPath) {}
}

// =============================================================================
// Parser
// =============================================================================

struct Parser<'a> {
    unit: &'a str,
    resolver: &'a TypeResolver,
    diags: &'a mut Diagnostics,
}

impl Parser<'_> {
    fn parse_node(
        &mut self,
        arena: &mut Vec<TreeNode>,
        node: &SchemaNode,
        container: ContainerKind,
        path: &QualifiedPath,
    ) -> NodeId {
        let id = NodeId(arena.len());
        arena.push(TreeNode {
            tag: node.tag.clone(),
            struct_name: path.name().to_string(),
            member_name: member_ident(&node.tag),
            attributes: Vec::new(),
            content: None,
            children: Vec::new(),
            container,
        });

        let mut members = HashSet::new();

        let content = node.trimmed_text().and_then(|type_name| {
            self.resolve(path, CONTENT_MEMBER, type_name)
        });
        if content.is_some() {
            members.insert(CONTENT_MEMBER.to_string());
        }

        let mut attributes = Vec::new();
        for (name, type_name) in &node.attributes {
            if is_reserved(name) {
                continue;
            }
            let Some(ty) = self.resolve(path, name, type_name) else {
                continue;
            };
            if !members.insert(member_ident(name)) {
                self.report_duplicate(path, name);
                continue;
            }
            attributes.push(Attribute {
                name: name.clone(),
                ty,
            });
        }

        arena[id.0].content = content;
        arena[id.0].attributes = attributes;

        for child in &node.children {
            let child_path = path.child(type_ident(&child.tag));

            // an excluded child leaves its member name free for a later sibling
            let container = match self.classify(child) {
                Ok(container) => container,
                Err(err) => {
                    self.diags.report_at(self.unit, &child_path.to_string(), err);
                    continue;
                }
            };

            if !members.insert(member_ident(&child.tag)) {
                self.report_duplicate(path, &child.tag);
                continue;
            }

            let child_id = self.parse_node(arena, child, container, &child_path);
            arena[id.0].children.push(child_id);
        }

        id
    }

    /// Read a child's container annotation from its own attributes
    fn classify(&self, node: &SchemaNode) -> Result<ContainerKind, SchemaError> {
        let value = match CONTAINER_ATTRS.iter().find_map(|name| node.attribute(name)) {
            Some(value) => value.trim(),
            None => return Ok(ContainerKind::None),
        };

        if SEQUENCE_KINDS.contains(&value) {
            return Ok(ContainerKind::Sequence);
        }
        if value != MAP_KIND && value != MULTIMAP_KIND {
            return Err(SchemaError::InvalidContainer {
                node: node.tag.clone(),
                value: value.to_string(),
            });
        }

        let key = node
            .attribute(KEY_ATTR)
            .map(str::trim)
            .ok_or_else(|| SchemaError::MissingMapKeyDeclaration {
                node: node.tag.clone(),
            })?;

        let key_type = node
            .attribute(key)
            .filter(|_| !is_reserved(key))
            .ok_or_else(|| SchemaError::MissingMapKey {
                node: node.tag.clone(),
                key: key.to_string(),
            })?;

        // the key must survive resolution or the map would have no key type
        if self.resolver.resolve(key_type).is_none() {
            return Err(SchemaError::UnresolvedType {
                element: format!("{}.{}", node.tag, key),
                type_name: key_type.to_string(),
                suggestion: self.resolver.suggest(key_type),
            });
        }

        Ok(ContainerKind::Map {
            key: key.to_string(),
            multi: value == MULTIMAP_KIND,
        })
    }

    fn resolve(&mut self, path: &QualifiedPath, member: &str, type_name: &str) -> Option<PrimitiveType> {
        let resolved = self.resolver.resolve(type_name);
        if resolved.is_none() {
            self.diags.report_at(
                self.unit,
                &path.to_string(),
                SchemaError::UnresolvedType {
                    element: format!("{}.{}", path, member),
                    type_name: type_name.trim().to_string(),
                    suggestion: self.resolver.suggest(type_name),
                },
            );
        }
        resolved
    }

    fn report_duplicate(&mut self, path: &QualifiedPath, member: &str) {
        self.diags.report_at(
            self.unit,
            &path.to_string(),
            SchemaError::DuplicateMember {
                owner: path.to_string(),
                member: member.to_string(),
            },
        );
    }
}
