//! Serialization Schema Emitter
//!
//! Emits a proto2 message per flat struct and the Rust glue converting between
//! the record and the prost-generated message.
//!
//! Key constraints:
//! - tag = declaration index + 1, so field order is part of the wire schema
//! - narrow integers travel as their 32-bit wire type
//! - fixed-capacity text travels as `string` and is truncated on the way back

use super::names::member_ident;
use super::{CodeWriter, RenderProfile};
use crate::model::{Field, FlatStruct};
use crate::types::{TypeKind, TypeResolver};

// =============================================================================
// .proto
// =============================================================================

/// Emit the `.proto` definition of a flat model
pub fn emit_schema(model: &FlatStruct, profile: &RenderProfile) -> String {
    let mut w = CodeWriter::new();

    w.line("syntax = \"proto2\";");
    w.blank();
    w.line(format!("package {};", profile.proto_package));
    w.blank();

    if let Some(comment) = &model.comment {
        for line in comment.lines() {
            w.line(format!("// {}", line.trim()));
        }
    }
    w.open(format!("message {} {{", model.name));
    for (i, field) in model.fields.iter().enumerate() {
        if let Some(comment) = &field.comment {
            for line in comment.lines() {
                w.line(format!("// {}", line.trim()));
            }
        }
        w.line(format!("optional {} {} = {};", field.ty.wire(), field.name, i + 1));
    }
    w.close("}");

    w.finish()
}

// =============================================================================
// Glue
// =============================================================================

/// Emit record ↔ message conversions for a flat model
pub fn emit_glue(model: &FlatStruct, resolver: &TypeResolver, profile: &RenderProfile) -> String {
    let mut w = CodeWriter::new();
    let name = &model.name;

    w.line(format!("use {} as proto;", profile.proto_module_for(name)));
    w.line(format!("use {}::{};", profile.record_module_for(name), name));
    w.blank();

    let record = if model.fields.is_empty() { "_record" } else { "record" };
    w.open(format!("impl From<&{}> for proto::{} {{", name, name));
    w.open(format!("fn from({}: &{}) -> Self {{", record, name));
    w.open("Self {");
    for field in &model.fields {
        w.line(format!(
            "{}: Some({}),",
            member_ident(&field.name),
            to_message(field, resolver)
        ));
    }
    w.close("}");
    w.close("}");
    w.close("}");
    w.blank();

    let message = if model.fields.is_empty() { "_message" } else { "message" };
    w.open(format!("impl From<&proto::{}> for {} {{", name, name));
    w.open(format!("fn from({}: &proto::{}) -> Self {{", message, name));
    if model.fields.is_empty() {
        w.line(format!("{}::default()", name));
    } else {
        w.line(format!("let mut record = {}::default();", name));
        for field in &model.fields {
            w.line(from_message(field, resolver));
        }
        w.line("record");
    }
    w.close("}");
    w.close("}");

    w.finish()
}

fn to_message(field: &Field, resolver: &TypeResolver) -> String {
    let access = format!("record.{}", member_ident(&field.name));
    match field.ty.kind() {
        TypeKind::FixedText { .. } => format!("{}.to_string()", access),
        TypeKind::Text | TypeKind::Bytes => format!("{}.clone()", access),
        _ => match resolver.widen(&field.ty) {
            Some(wide) => format!("{}::from({})", wide.repr(), access),
            None => access,
        },
    }
}

fn from_message(field: &Field, resolver: &TypeResolver) -> String {
    let member = member_ident(&field.name);
    let getter = format!("message.{}()", member);
    match field.ty.kind() {
        TypeKind::FixedText { .. } => format!("record.{}.copy_truncated({});", member, getter),
        TypeKind::Text | TypeKind::Bytes => format!("record.{} = {}.to_owned();", member, getter),
        _ if resolver.widen(&field.ty).is_some() => {
            format!("record.{} = {} as {};", member, getter, field.ty.repr())
        }
        _ => format!("record.{} = {};", member, getter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::node::{FlatEntry, FlatUnit};

    fn player() -> FlatStruct {
        let unit = FlatUnit::new(
            "Player",
            vec![
                FlatEntry::scalar("$comment", "A player"),
                FlatEntry::scalar("name", "string"),
                FlatEntry::map("level", [("type", "uint8"), ("comment", "1-based")]),
                FlatEntry::scalar("guild", "char16"),
                FlatEntry::scalar("avatar", "bytes_tiny"),
                FlatEntry::scalar("gold", "int64"),
                FlatEntry::list("$key", ["name"]),
            ],
        );
        let mut diags = Diagnostics::new();
        FlatStruct::parse(&unit, &TypeResolver::new(), &mut diags)
    }

    #[test]
    fn test_proto_schema() {
        let proto = emit_schema(&player(), &RenderProfile::default());
        assert_eq!(
            proto,
            "syntax = \"proto2\";\n\
             \n\
             package schema;\n\
             \n\
             // A player\n\
             message Player {\n\
             \x20   optional string name = 1;\n\
             \x20   // 1-based\n\
             \x20   optional uint32 level = 2;\n\
             \x20   optional string guild = 3;\n\
             \x20   optional bytes avatar = 4;\n\
             \x20   optional int64 gold = 5;\n\
             }\n"
        );
    }

    #[test]
    fn test_tags_follow_declaration_order() {
        let unit = FlatUnit::new(
            "Pair",
            vec![FlatEntry::scalar("b", "bool"), FlatEntry::scalar("a", "int")],
        );
        let mut diags = Diagnostics::new();
        let model = FlatStruct::parse(&unit, &TypeResolver::new(), &mut diags);
        let proto = emit_schema(&model, &RenderProfile::default());

        assert!(proto.contains("optional bool b = 1;\n    optional int32 a = 2;"));
    }

    #[test]
    fn test_glue_to_message() {
        let code = emit_glue(&player(), &TypeResolver::new(), &RenderProfile::default());

        assert!(code.starts_with("use crate::proto::player as proto;\nuse super::player::Player;\n"));
        assert!(code.contains("impl From<&Player> for proto::Player {"));
        assert!(code.contains("name: Some(record.name.clone()),"));
        assert!(code.contains("level: Some(u32::from(record.level)),"));
        assert!(code.contains("guild: Some(record.guild.to_string()),"));
        assert!(code.contains("avatar: Some(record.avatar.clone()),"));
        assert!(code.contains("gold: Some(record.gold),"));
    }

    #[test]
    fn test_glue_from_message() {
        let code = emit_glue(&player(), &TypeResolver::new(), &RenderProfile::default());

        assert!(code.contains("impl From<&proto::Player> for Player {"));
        assert!(code.contains("let mut record = Player::default();"));
        assert!(code.contains("record.name = message.name().to_owned();"));
        assert!(code.contains("record.level = message.level() as u8;"));
        assert!(code.contains("record.guild.copy_truncated(message.guild());"));
        assert!(code.contains("record.avatar = message.avatar().to_owned();"));
        assert!(code.contains("record.gold = message.gold();"));
    }
}
