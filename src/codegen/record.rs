//! Record Emitter
//!
//! Emits the in-memory record types:
//! - flat: one struct, one member per field in declaration order
//! - tree: one struct per node in depth-first order; a node's children live in
//!   a module named after the node, emitted right after it
//!   (`Config::App` → `config::App`)
//!
//! Every struct gets an explicit `impl Default` built from the type default
//! tokens. Fixed-capacity text has no literal initializer and takes
//! `Default::default()`.

use super::names::QualifiedPath;
use super::{CodeWriter, RenderProfile};
use crate::model::tree::CONTENT_MEMBER;
use crate::model::{ContainerKind, FlatStruct, NodeId, TreeSchema, TreeVisitor};
use crate::types::PrimitiveType;

// =============================================================================
// Flat
// =============================================================================

/// Emit the record struct of a flat model
pub fn emit_flat(model: &FlatStruct, profile: &RenderProfile) -> String {
    let mut w = CodeWriter::new();

    if model.fields.iter().any(|f| f.ty.is_fixed_text()) {
        w.line(format!("use {}::FixedText;", profile.storage_runtime));
        w.blank();
    }

    w.doc(model.comment.as_deref());
    if let Some(derive) = profile.derive_attribute() {
        w.line(derive);
    }
    w.open(format!("pub struct {} {{", model.name));
    for field in &model.fields {
        w.doc(field.comment.as_deref());
        w.line(format!("pub {}: {},", member(&field.name), field.ty.repr()));
    }
    w.close("}");
    w.blank();

    let defaults = model
        .fields
        .iter()
        .map(|field| (member(&field.name), initializer(&field.ty).to_string()))
        .collect::<Vec<_>>();
    emit_default_impl(&mut w, &model.name, &defaults);

    w.finish()
}

fn member(name: &str) -> String {
    super::names::member_ident(name)
}

/// Default-initializer token of a record member
pub(crate) fn initializer(ty: &PrimitiveType) -> &str {
    if ty.is_fixed_text() {
        "Default::default()"
    } else {
        ty.default_value()
    }
}

fn emit_default_impl(w: &mut CodeWriter, name: &str, members: &[(String, String)]) {
    w.open(format!("impl Default for {} {{", name));
    w.open("fn default() -> Self {");
    if members.is_empty() {
        w.line("Self {}");
    } else {
        w.open("Self {");
        for (member, value) in members {
            w.line(format!("{}: {},", member, value));
        }
        w.close("}");
    }
    w.close("}");
    w.close("}");
}

// =============================================================================
// Tree
// =============================================================================

/// Rust type of a child member, as seen from its parent's scope
pub(crate) fn child_member_type(
    schema: &TreeSchema,
    parent: &QualifiedPath,
    child: NodeId,
    profile: &RenderProfile,
) -> String {
    let node = schema.node(child);
    let element = format!("{}::{}", parent.module_ident(), node.struct_name);
    let map = profile.map_container.type_name();

    match &node.container {
        ContainerKind::None => element,
        ContainerKind::Sequence => format!("Vec<{}>", element),
        ContainerKind::Map { multi, .. } => {
            // the model guarantees the key attribute exists
            let key = node.map_key().map(|a| a.ty.repr()).unwrap_or("String");
            if *multi {
                format!("{}<{}, Vec<{}>>", map, key, element)
            } else {
                format!("{}<{}, {}>", map, key, element)
            }
        }
    }
}

/// Initializer of a child member
pub(crate) fn child_initializer(container: &ContainerKind, profile: &RenderProfile) -> String {
    match container {
        ContainerKind::None => "Default::default()".to_string(),
        ContainerKind::Sequence => "Vec::new()".to_string(),
        ContainerKind::Map { .. } => format!("{}::new()", profile.map_container.type_name()),
    }
}

/// Emit every struct of a tree model
pub fn emit_tree(model: &TreeSchema, profile: &RenderProfile) -> String {
    let mut w = CodeWriter::new();

    let has_map = model
        .nodes()
        .any(|(_, node)| matches!(node.container, ContainerKind::Map { .. }));
    let has_fixed_text = model.nodes().any(|(_, node)| {
        node.content.iter().any(PrimitiveType::is_fixed_text)
            || node.attributes.iter().any(|a| a.ty.is_fixed_text())
    });

    if has_map {
        w.line(format!("use std::collections::{};", profile.map_container.type_name()));
    }
    if has_fixed_text {
        w.line(format!("use {}::FixedText;", profile.storage_runtime));
    }

    let mut visitor = RecordVisitor { w, profile };
    model.walk(&mut visitor);
    visitor.w.finish()
}

struct RecordVisitor<'a> {
    w: CodeWriter,
    profile: &'a RenderProfile,
}

impl TreeVisitor for RecordVisitor<'_> {
    fn enter(&mut self, schema: &TreeSchema, id: NodeId, path: &QualifiedPath) {
        let node = schema.node(id);
        let w = &mut self.w;

        // (member, type, initializer) in content/attribute/child order
        let mut members: Vec<(String, String, String)> = Vec::new();
        if let Some(ty) = &node.content {
            members.push((
                CONTENT_MEMBER.to_string(),
                ty.repr().to_string(),
                initializer(ty).to_string(),
            ));
        }
        for attribute in &node.attributes {
            members.push((
                attribute.member_name(),
                attribute.ty.repr().to_string(),
                initializer(&attribute.ty).to_string(),
            ));
        }
        for (child_id, child) in schema.children(id) {
            members.push((
                child.member_name.clone(),
                child_member_type(schema, path, child_id, self.profile),
                child_initializer(&child.container, self.profile),
            ));
        }

        w.blank();
        w.line(format!("/// `<{}>` element", node.tag));
        if let Some(derive) = self.profile.derive_attribute() {
            w.line(derive);
        }
        w.open(format!("pub struct {} {{", node.struct_name));
        for (name, ty, _) in &members {
            w.line(format!("pub {}: {},", name, ty));
        }
        w.close("}");
        w.blank();

        let defaults: Vec<_> = members
            .into_iter()
            .map(|(name, _, init)| (name, init))
            .collect();
        emit_default_impl(w, &node.struct_name, &defaults);

        if !node.children.is_empty() {
            w.blank();
            w.open(format!("pub mod {} {{", path.module_ident()));
            w.line("use super::*;");
        }
    }

    fn leave(&mut self, schema: &TreeSchema, id: NodeId, _path: &QualifiedPath) {
        if !schema.node(id).children.is_empty() {
            self.w.close("}");
        }
    }
}
