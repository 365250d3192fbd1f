//! Tree Marshal Emitter
//!
//! Emits `parse`, `write` and `reset` for every struct of a tree model, as
//! inherent impls scoped by the struct's qualified path.
//!
//! Semantics of the emitted procedures:
//! - `parse` returns false when the node is absent. Map children insert each
//!   parsed element under its key attribute, so a repeated key keeps the last
//!   element; multimaps append. Sequences append in document order. Plain
//!   children parse the first matching child. Child results are ignored.
//! - `write` returns false when the node is absent. It creates one child node
//!   per element, maps in map iteration order.
//! - `reset` restores content and attributes to type defaults, clears
//!   containers and recurses into plain children.
//!
//! Document runtime interface assumed by emitted code (`Element`):
//!
//! ```text
//! fn child(&self, tag: &str) -> Option<&Element>;
//! fn children_named(&self, tag: &str) -> impl Iterator<Item = &Element>;
//! fn read_content<T: FromText>(&self, value: &mut T) -> bool;
//! fn read_attribute<T: FromText>(&self, name: &str, value: &mut T) -> bool;
//! fn write_content<T: ToText>(&mut self, value: &T);
//! fn write_attribute<T: ToText>(&mut self, name: &str, value: &T);
//! fn create_child(&mut self, tag: &str) -> &mut Element;
//! ```

use super::names::{member_ident, QualifiedPath};
use super::{string_literal, CodeWriter, RenderProfile};
use crate::model::tree::CONTENT_MEMBER;
use crate::model::{ContainerKind, NodeId, TreeNode, TreeSchema, TreeVisitor};
use crate::types::PrimitiveType;

/// Alias of the record module inside marshal files
const RECORD: &str = "record";

/// Emit marshal procedures for a tree model
pub fn emit(model: &TreeSchema, profile: &RenderProfile) -> String {
    let mut w = CodeWriter::new();

    w.line(format!("use {}::Element;", profile.document_runtime));
    let has_fixed_text = model.nodes().any(|(_, node)| {
        node.content.iter().any(PrimitiveType::is_fixed_text)
            || node.attributes.iter().any(|a| a.ty.is_fixed_text())
    });
    if has_fixed_text {
        w.line(format!("use {}::FixedText;", profile.storage_runtime));
    }
    w.line(format!("use {} as {};", profile.record_module_for(model.name()), RECORD));

    let mut visitor = MarshalVisitor { w };
    model.walk(&mut visitor);
    visitor.w.finish()
}

struct MarshalVisitor {
    w: CodeWriter,
}

impl TreeVisitor for MarshalVisitor {
    fn enter(&mut self, schema: &TreeSchema, id: NodeId, path: &QualifiedPath) {
        let node = schema.node(id);
        let w = &mut self.w;

        w.blank();
        w.open(format!("impl {}::{} {{", RECORD, path.type_path()));
        emit_parse(w, schema, node, path);
        w.blank();
        emit_write(w, schema, node);
        w.blank();
        emit_reset(w, schema, node);
        w.close("}");
    }
}

fn has_members(node: &TreeNode) -> bool {
    node.content.is_some() || !node.attributes.is_empty() || !node.children.is_empty()
}

fn element_type(path: &QualifiedPath, child: &TreeNode) -> String {
    format!("{}::{}", RECORD, path.child(child.struct_name.clone()).type_path())
}

fn emit_parse(w: &mut CodeWriter, schema: &TreeSchema, node: &TreeNode, path: &QualifiedPath) {
    w.line(format!("/// Read `<{}>` from `node`; false when the node is absent", node.tag));
    if !has_members(node) {
        w.open("pub fn parse(&mut self, node: Option<&Element>) -> bool {");
        w.line("node.is_some()");
        w.close("}");
        return;
    }

    w.open("pub fn parse(&mut self, node: Option<&Element>) -> bool {");
    w.open("let Some(node) = node else {");
    w.line("return false;");
    w.close("};");

    if node.content.is_some() {
        w.line(format!("node.read_content(&mut self.{});", CONTENT_MEMBER));
    }
    for attribute in &node.attributes {
        w.line(format!(
            "node.read_attribute({}, &mut self.{});",
            string_literal(&attribute.name),
            attribute.member_name()
        ));
    }

    for (_, child) in schema.children_of(node) {
        let tag = string_literal(&child.tag);
        let member = &child.member_name;
        match &child.container {
            ContainerKind::None => {
                w.line(format!("self.{}.parse(node.child({}));", member, tag));
            }
            container => {
                w.open(format!("for child in node.children_named({}) {{", tag));
                w.line(format!("let mut element = {}::default();", element_type(path, child)));
                w.line("element.parse(Some(child));");
                let insert = match container {
                    ContainerKind::Map { key, multi: false } => format!(
                        "self.{}.insert(element.{}.clone(), element);",
                        member,
                        member_ident(key)
                    ),
                    ContainerKind::Map { key, multi: true } => format!(
                        "self.{}.entry(element.{}.clone()).or_default().push(element);",
                        member,
                        member_ident(key)
                    ),
                    _ => format!("self.{}.push(element);", member),
                };
                w.line(insert);
                w.close("}");
            }
        }
    }

    w.line("true");
    w.close("}");
}

fn emit_write(w: &mut CodeWriter, schema: &TreeSchema, node: &TreeNode) {
    w.line(format!("/// Write `<{}>` into `node`; false when the node is absent", node.tag));
    if !has_members(node) {
        w.open("pub fn write(&self, node: Option<&mut Element>) -> bool {");
        w.line("node.is_some()");
        w.close("}");
        return;
    }

    w.open("pub fn write(&self, node: Option<&mut Element>) -> bool {");
    w.open("let Some(node) = node else {");
    w.line("return false;");
    w.close("};");

    if node.content.is_some() {
        w.line(format!("node.write_content(&self.{});", CONTENT_MEMBER));
    }
    for attribute in &node.attributes {
        w.line(format!(
            "node.write_attribute({}, &self.{});",
            string_literal(&attribute.name),
            attribute.member_name()
        ));
    }

    for (_, child) in schema.children_of(node) {
        let tag = string_literal(&child.tag);
        let member = &child.member_name;
        let elements = match &child.container {
            ContainerKind::None => {
                w.line(format!("self.{}.write(Some(node.create_child({})));", member, tag));
                continue;
            }
            ContainerKind::Sequence => format!("&self.{}", member),
            ContainerKind::Map { multi: false, .. } => format!("self.{}.values()", member),
            ContainerKind::Map { multi: true, .. } => format!("self.{}.values().flatten()", member),
        };
        w.open(format!("for element in {} {{", elements));
        w.line(format!("element.write(Some(node.create_child({})));", tag));
        w.close("}");
    }

    w.line("true");
    w.close("}");
}

fn emit_reset(w: &mut CodeWriter, schema: &TreeSchema, node: &TreeNode) {
    w.line("/// Restore defaults and drop all container elements");
    if !has_members(node) {
        w.line("pub fn reset(&mut self) {}");
        return;
    }

    w.open("pub fn reset(&mut self) {");
    if let Some(ty) = &node.content {
        w.line(format!("self.{} = {};", CONTENT_MEMBER, ty.default_value()));
    }
    for attribute in &node.attributes {
        w.line(format!(
            "self.{} = {};",
            attribute.member_name(),
            attribute.ty.default_value()
        ));
    }
    for (_, child) in schema.children_of(node) {
        match child.container {
            ContainerKind::None => w.line(format!("self.{}.reset();", child.member_name)),
            _ => w.line(format!("self.{}.clear();", child.member_name)),
        }
    }
    w.close("}");
}
