//! Storage Descriptor Emitter
//!
//! Emits, per flat struct:
//! - a descriptor type implementing the storage runtime's `StorageDescriptor`
//!   trait (table, key columns, index columns, column DDL, four conversions)
//! - the table's `CREATE TABLE` statement
//!
//! Conversion rules:
//! - text and bytes are pushed quoted, everything else literally
//! - 8-bit integers are widened to 32 bits before they are pushed, so they are
//!   never rendered as characters
//! - row decoding checks the row length before touching any field
//!
//! Storage runtime interface assumed by emitted code:
//!
//! ```text
//! trait StorageDescriptor {
//!     type Object;
//!     const TABLE: &'static str;
//!     const KEYS: &'static [&'static str];
//!     const INDEXES: &'static [&'static [&'static str]];
//!     const COLUMNS: &'static [Column];
//!     fn object_to_query(object: &Self::Object, query: &mut Query);
//!     fn pairs_to_query(object: &Self::Object, query: &mut Query);
//!     fn keys_to_query(object: &Self::Object, query: &mut Query);
//!     fn row_to_object(row: &Row, object: &mut Self::Object) -> Result<(), DecodeError>;
//! }
//! Query: push_value, push_quoted, push_assign, push_assign_quoted,
//!        push_separator, push_key_separator
//! Row:   len, text, text_ref, bytes, parse
//! ```

use super::names::member_ident;
use super::{string_literal, CodeWriter, RenderProfile};
use crate::model::{Field, FlatStruct};
use crate::types::{TypeKind, TypeResolver};

/// Name of the descriptor type for a struct
pub fn descriptor_name(model: &FlatStruct) -> String {
    format!("{}Descriptor", model.name)
}

// =============================================================================
// Descriptor
// =============================================================================

/// Emit the storage descriptor of a flat model
pub fn emit_descriptor(model: &FlatStruct, resolver: &TypeResolver, profile: &RenderProfile) -> String {
    let mut w = CodeWriter::new();
    let name = &model.name;

    w.line(format!(
        "use {}::{{Column, DecodeError, Query, Row, StorageDescriptor}};",
        profile.storage_runtime
    ));
    w.line(format!("use {}::{};", profile.record_module_for(name), name));
    w.blank();

    w.line(format!("/// Storage descriptor for [`{}`]", name));
    w.line(format!("pub struct {};", descriptor_name(model)));
    w.blank();

    w.open(format!("impl StorageDescriptor for {} {{", descriptor_name(model)));
    w.line(format!("type Object = {};", name));
    w.blank();

    w.line(format!("const TABLE: &'static str = {};", string_literal(&model.table_name())));
    w.line(format!(
        "const KEYS: &'static [&'static str] = &[{}];",
        quoted_columns(model.key_fields())
    ));
    let indexes = index_fields(model)
        .into_iter()
        .map(|fields| format!("&[{}]", quoted_columns(fields.into_iter())))
        .collect::<Vec<_>>()
        .join(", ");
    w.line(format!("const INDEXES: &'static [&'static [&'static str]] = &[{}];", indexes));
    w.open("const COLUMNS: &'static [Column] = &[");
    for field in &model.fields {
        w.line(format!(
            "Column::new({}, {}),",
            string_literal(&field.column_name()),
            string_literal(field.ty.storage())
        ));
    }
    w.close("];");
    w.blank();

    emit_push_fn(&mut w, "object_to_query", name, &model.fields, "push_separator", |field| {
        push_value(field, resolver)
    });
    w.blank();
    emit_push_fn(&mut w, "pairs_to_query", name, &model.fields, "push_separator", |field| {
        push_assign(field, resolver)
    });
    w.blank();
    let keys: Vec<Field> = model.key_fields().cloned().collect();
    emit_push_fn(&mut w, "keys_to_query", name, &keys, "push_key_separator", |field| {
        push_assign(field, resolver)
    });
    w.blank();

    emit_row_to_object(&mut w, name, &model.fields);
    w.close("}");

    w.finish()
}

/// Declared fields of each index; an index left with no fields is skipped
fn index_fields(model: &FlatStruct) -> Vec<Vec<&Field>> {
    model
        .indexes
        .iter()
        .map(|index| index.fields.iter().filter_map(|name| model.field(name)).collect::<Vec<_>>())
        .filter(|fields| !fields.is_empty())
        .collect()
}

fn quoted_columns<'a>(fields: impl Iterator<Item = &'a Field>) -> String {
    fields
        .map(|field| string_literal(&field.column_name()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Member access, widened for 8-bit integers
fn value_expr(field: &Field, resolver: &TypeResolver) -> String {
    let access = format!("object.{}", member_ident(&field.name));
    match resolver.widen(&field.ty) {
        Some(wide) => format!("{}::from({})", wide.repr(), access),
        None => access,
    }
}

fn push_value(field: &Field, resolver: &TypeResolver) -> String {
    if field.ty.is_quoted() {
        format!("query.push_quoted(&object.{});", member_ident(&field.name))
    } else {
        format!("query.push_value({});", value_expr(field, resolver))
    }
}

fn push_assign(field: &Field, resolver: &TypeResolver) -> String {
    let column = string_literal(&field.column_name());
    if field.ty.is_quoted() {
        format!(
            "query.push_assign_quoted({}, &object.{});",
            column,
            member_ident(&field.name)
        )
    } else {
        format!("query.push_assign({}, {});", column, value_expr(field, resolver))
    }
}

fn emit_push_fn(
    w: &mut CodeWriter,
    fn_name: &str,
    record: &str,
    fields: &[Field],
    separator: &str,
    push: impl Fn(&Field) -> String,
) {
    let object = if fields.is_empty() { "_object" } else { "object" };
    let query = if fields.is_empty() { "_query" } else { "query" };
    w.open(format!(
        "fn {}({}: &{}, {}: &mut Query) {{",
        fn_name, object, record, query
    ));
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            w.line(format!("query.{}();", separator));
        }
        w.line(push(field));
    }
    w.close("}");
}

fn emit_row_to_object(w: &mut CodeWriter, record: &str, fields: &[Field]) {
    let object = if fields.is_empty() { "_object" } else { "object" };
    w.open(format!(
        "fn row_to_object(row: &Row, {}: &mut {}) -> Result<(), DecodeError> {{",
        object, record
    ));
    w.open("if row.len() != Self::COLUMNS.len() {");
    w.open("return Err(DecodeError::FieldCount {");
    w.line("expected: Self::COLUMNS.len(),");
    w.line("actual: row.len(),");
    w.close("});");
    w.close("}");

    for (i, field) in fields.iter().enumerate() {
        let member = member_ident(&field.name);
        let line = match field.ty.kind() {
            TypeKind::FixedText { .. } => format!("object.{}.copy_truncated(row.text_ref({})?);", member, i),
            TypeKind::Text => format!("object.{} = row.text({})?;", member, i),
            TypeKind::Bytes => format!("object.{} = row.bytes({})?;", member, i),
            TypeKind::Int { .. } | TypeKind::Float { .. } | TypeKind::Bool => {
                format!("object.{} = row.parse({})?;", member, i)
            }
        };
        w.line(line);
    }
    w.line("Ok(())");
    w.close("}");
}

// =============================================================================
// Table DDL
// =============================================================================

/// Indexed prefix of text and blob key columns, in characters (bytes for blobs).
/// 191 utf8mb4 characters fit the 767-byte InnoDB key part limit.
pub const KEY_PREFIX_LEN: usize = 191;

/// Emit `CREATE TABLE` for a flat model
pub fn emit_table_ddl(model: &FlatStruct, profile: &RenderProfile) -> String {
    let table = model.table_name();
    let mut lines: Vec<String> = model
        .fields
        .iter()
        .map(|field| format!("  `{}` {}", field.column_name(), field.ty.storage()))
        .collect();

    let keys: Vec<&Field> = model.key_fields().collect();
    if !keys.is_empty() {
        lines.push(format!("  PRIMARY KEY ({})", key_parts(&keys)));
    }

    for fields in index_fields(model) {
        let names: Vec<String> = fields.iter().map(|field| field.column_name()).collect();
        lines.push(format!("  KEY `IDX_{}_{}` ({})", table, names.join("_"), key_parts(&fields)));
    }

    let options = profile.table_options.trim();
    let tail = if options.is_empty() {
        ");".to_string()
    } else {
        format!(") {};", options)
    };

    format!("CREATE TABLE IF NOT EXISTS `{}` (\n{}\n{}\n", table, lines.join(",\n"), tail)
}

/// Key column list; unbounded text and blobs can only be indexed by prefix
fn key_parts(fields: &[&Field]) -> String {
    fields
        .iter()
        .map(|field| match field.ty.kind() {
            TypeKind::Text | TypeKind::Bytes => format!("`{}`({})", field.column_name(), KEY_PREFIX_LEN),
            _ => format!("`{}`", field.column_name()),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::node::{FlatEntry, FlatUnit};

    fn parse(name: &str, entries: Vec<FlatEntry>) -> FlatStruct {
        let mut diags = Diagnostics::new();
        let model = FlatStruct::parse(&FlatUnit::new(name, entries), &TypeResolver::new(), &mut diags);
        assert!(diags.is_empty(), "{}", diags);
        model
    }

    fn player() -> FlatStruct {
        parse(
            "Player",
            vec![
                FlatEntry::scalar("name", "string"),
                FlatEntry::scalar("level", "uint8"),
                FlatEntry::list("$key", ["name"]),
            ],
        )
    }

    #[test]
    fn test_player_descriptor() {
        let code = emit_descriptor(&player(), &TypeResolver::new(), &RenderProfile::default());

        assert!(code.contains("use super::player::Player;"));
        assert!(code.contains("impl StorageDescriptor for PlayerDescriptor {"));
        assert!(code.contains("const TABLE: &'static str = \"PLAYER\";"));
        assert!(code.contains("const KEYS: &'static [&'static str] = &[\"NAME\"];"));
        assert!(code.contains("const INDEXES: &'static [&'static [&'static str]] = &[];"));
        assert!(code.contains(
            "        Column::new(\"NAME\", \"text\"),\n        Column::new(\"LEVEL\", \"tinyint(3) unsigned NOT NULL default '0'\"),\n"
        ));
    }

    #[test]
    fn test_conversions_quote_and_widen() {
        let code = emit_descriptor(&player(), &TypeResolver::new(), &RenderProfile::default());

        assert!(code.contains(
            "query.push_quoted(&object.name);\n        query.push_separator();\n        query.push_value(u32::from(object.level));"
        ));
        assert!(code.contains(
            "query.push_assign_quoted(\"NAME\", &object.name);\n        query.push_separator();\n        query.push_assign(\"LEVEL\", u32::from(object.level));"
        ));
        assert!(code.contains(
            "fn keys_to_query(object: &Player, query: &mut Query) {\n        query.push_assign_quoted(\"NAME\", &object.name);\n    }"
        ));
    }

    #[test]
    fn test_row_to_object_checks_length_first() {
        let model = parse(
            "Mail",
            vec![
                FlatEntry::scalar("id", "uint64"),
                FlatEntry::scalar("title", "char32"),
                FlatEntry::scalar("body", "string"),
                FlatEntry::scalar("attachment", "bytes"),
            ],
        );
        let code = emit_descriptor(&model, &TypeResolver::new(), &RenderProfile::default());

        let check = code.find("if row.len() != Self::COLUMNS.len()").unwrap();
        let first = code.find("object.id = row.parse(0)?;").unwrap();
        assert!(check < first);
        assert!(code.contains("object.title.copy_truncated(row.text_ref(1)?);"));
        assert!(code.contains("object.body = row.text(2)?;"));
        assert!(code.contains("object.attachment = row.bytes(3)?;"));
        // no keys: nothing to push and no unused bindings
        assert!(code.contains("fn keys_to_query(_object: &Mail, _query: &mut Query) {\n    }"));
    }

    #[test]
    fn test_key_order_is_declared_order() {
        let model = parse(
            "Slot",
            vec![
                FlatEntry::scalar("owner", "uint64"),
                FlatEntry::scalar("bag", "uint8"),
                FlatEntry::scalar("slot", "uint16"),
                FlatEntry::list("$key", ["slot", "owner", "bag"]),
            ],
        );
        let code = emit_descriptor(&model, &TypeResolver::new(), &RenderProfile::default());

        assert!(code.contains("const KEYS: &'static [&'static str] = &[\"SLOT\", \"OWNER\", \"BAG\"];"));
        assert!(code.contains(
            "query.push_assign(\"SLOT\", object.slot);\n        query.push_key_separator();\n        query.push_assign(\"OWNER\", object.owner);\n        query.push_key_separator();\n        query.push_assign(\"BAG\", u32::from(object.bag));"
        ));
    }

    #[test]
    fn test_table_ddl() {
        let model = parse(
            "Player",
            vec![
                FlatEntry::scalar("name", "string"),
                FlatEntry::scalar("level", "uint8"),
                FlatEntry::scalar("guild", "char16"),
                FlatEntry::list("$key", ["name"]),
                FlatEntry::list("$index", ["guild", "level"]),
            ],
        );
        let ddl = emit_table_ddl(&model, &RenderProfile::default());

        assert_eq!(
            ddl,
            "CREATE TABLE IF NOT EXISTS `PLAYER` (\n\
             \x20 `NAME` text,\n\
             \x20 `LEVEL` tinyint(3) unsigned NOT NULL default '0',\n\
             \x20 `GUILD` varchar(16) NOT NULL default '',\n\
             \x20 PRIMARY KEY (`NAME`(191)),\n\
             \x20 KEY `IDX_PLAYER_GUILD_LEVEL` (`GUILD`, `LEVEL`)\n\
             ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;\n"
        );
    }

    #[test]
    fn test_table_ddl_prefixes_unbounded_key_columns() {
        let model = parse(
            "Blob",
            vec![
                FlatEntry::scalar("owner", "uint64"),
                FlatEntry::scalar("data", "bytes"),
                FlatEntry::scalar("tag", "char8"),
                FlatEntry::scalar("note", "string"),
                FlatEntry::list("$key", ["owner", "data"]),
                FlatEntry::list("$index", ["note", "tag"]),
            ],
        );
        let ddl = emit_table_ddl(&model, &RenderProfile::default());

        assert!(ddl.contains("  PRIMARY KEY (`OWNER`, `DATA`(191)),\n"));
        assert!(ddl.contains("  KEY `IDX_BLOB_NOTE_TAG` (`NOTE`(191), `TAG`)\n"));
    }

    #[test]
    fn test_index_without_declared_fields_is_not_emitted() {
        let mut model = player();
        model.indexes.push(crate::model::IndexSpec { fields: Vec::new() });

        let ddl = emit_table_ddl(&model, &RenderProfile::default());
        assert!(!ddl.contains("KEY `IDX_PLAYER_`"));
        assert!(ddl.contains("PRIMARY KEY (`NAME`(191))\n) ENGINE"));

        let code = emit_descriptor(&model, &TypeResolver::new(), &RenderProfile::default());
        assert!(code.contains("const INDEXES: &'static [&'static [&'static str]] = &[];"));
    }

    #[test]
    fn test_table_ddl_without_keys() {
        let model = parse("Log", vec![FlatEntry::scalar("line", "string")]);
        let mut profile = RenderProfile::default();
        profile.table_options.clear();
        let ddl = emit_table_ddl(&model, &profile);

        assert!(!ddl.contains("PRIMARY KEY"));
        assert!(ddl.ends_with("  `LINE` text\n);\n"));
    }
}
