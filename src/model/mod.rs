//! Schema Models
//!
//! Resolved, emitter-facing views of one schema unit:
//! - [`FlatStruct`]: flat field list with keys and indexes
//! - [`TreeSchema`]: arena of nested element types with container annotations
//!
//! Models are built once per unit and never mutated by emitters.

pub mod flat;
pub mod tree;

pub use flat::{Field, FlatStruct, IndexSpec};
pub use tree::{Attribute, ContainerKind, NodeId, TreeNode, TreeSchema, TreeVisitor};

use crate::reader::Dialect;

/// A resolved schema unit of either dialect
#[derive(Debug, Clone, PartialEq)]
pub enum Model {
    Flat(FlatStruct),
    Tree(TreeSchema),
}

impl Model {
    /// Schema unit name
    pub fn name(&self) -> &str {
        match self {
            Model::Flat(model) => &model.name,
            Model::Tree(model) => model.name(),
        }
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            Model::Flat(_) => Dialect::Flat,
            Model::Tree(_) => Dialect::Tree,
        }
    }
}
