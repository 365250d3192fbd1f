//! Reference evaluator
//!
//! Runs the semantics of generated storage conversions and tree marshal
//! procedures on dynamic values:
//! - [`FlatRecord`]: value lists, assignments, key assignments, row decoding
//! - [`TreeValue`]: parse/write/reset against [`SchemaNode`](crate::node::SchemaNode) documents

pub mod row;
pub mod tree;

pub use row::{FieldValue, FlatRecord};
pub use tree::{ChildValue, MapKey, TreeValue};
