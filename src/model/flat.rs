//! Flat Schema Model
//!
//! A [`FlatUnit`] becomes a [`FlatStruct`]: ordered fields, primary key and
//! secondary indexes. Declaration order is emission order everywhere (record
//! members, columns, proto tags), and key order is composite-key order.
//!
//! Parsing is lenient: a bad field is reported and dropped, the rest of the
//! unit still parses. Key/index references are only checked by
//! [`FlatStruct::validate`], which runs before emission.

use std::collections::HashSet;

use crate::diagnostics::Diagnostics;
use crate::error::SchemaError;
use crate::node::{FlatEntry, FlatUnit, FlatValue};
use crate::types::{PrimitiveType, TypeResolver};

const KEY_DIRECTIVE: &str = "$key";
const INDEX_DIRECTIVE: &str = "$index";
const COMMENT_DIRECTIVE: &str = "$comment";

/// One declared field
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: PrimitiveType,
    /// Explicit size; only set for bounded text, where it equals the capacity
    pub size: Option<usize>,
    pub comment: Option<String>,
}

impl Field {
    /// Storage column name
    pub fn column_name(&self) -> String {
        self.name.to_uppercase()
    }
}

/// Ordered list of field names forming one secondary index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub fields: Vec<String>,
}

/// A flat record definition
#[derive(Debug, Clone, PartialEq)]
pub struct FlatStruct {
    pub name: String,
    pub fields: Vec<Field>,
    pub primary_keys: Vec<String>,
    pub indexes: Vec<IndexSpec>,
    pub comment: Option<String>,
}

impl FlatStruct {
    /// Build a struct from a flat unit, reporting dropped entries into `diags`
    pub fn parse(unit: &FlatUnit, resolver: &TypeResolver, diags: &mut Diagnostics) -> Self {
        let mut model = FlatStruct {
            name: unit.name.clone(),
            fields: Vec::new(),
            primary_keys: Vec::new(),
            indexes: Vec::new(),
            comment: None,
        };
        let mut seen = HashSet::new();

        for entry in &unit.entries {
            if entry.key.starts_with('$') {
                model.apply_directive(entry, diags);
                continue;
            }

            let parsed = parse_field(&unit.name, entry, resolver);
            match parsed {
                Ok((field, is_key)) => {
                    if !seen.insert(field.name.clone()) {
                        diags.report(
                            &unit.name,
                            SchemaError::DuplicateMember {
                                owner: unit.name.clone(),
                                member: field.name,
                            },
                        );
                        continue;
                    }
                    if is_key {
                        model.add_key(&field.name, diags);
                    }
                    tracing::debug!(unit = %unit.name, field = %field.name, ty = %field.ty, "resolved field");
                    model.fields.push(field);
                }
                Err(err) => diags.report(&unit.name, err),
            }
        }

        model
    }

    fn apply_directive(&mut self, entry: &FlatEntry, diags: &mut Diagnostics) {
        let names: Vec<&str> = match &entry.value {
            FlatValue::Scalar(name) => vec![name.as_str()],
            FlatValue::List(names) => names.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        };

        match (entry.key.as_str(), &entry.value) {
            (COMMENT_DIRECTIVE, FlatValue::Scalar(text)) => self.comment = Some(text.clone()),
            (KEY_DIRECTIVE, FlatValue::Scalar(_) | FlatValue::List(_)) => {
                for name in names {
                    self.add_key(name, diags);
                }
            }
            (INDEX_DIRECTIVE, FlatValue::Scalar(_) | FlatValue::List(_)) => self.add_index(names, diags),
            (KEY_DIRECTIVE | INDEX_DIRECTIVE | COMMENT_DIRECTIVE, _) => diags.report(
                &self.name,
                SchemaError::MalformedEntry {
                    entry: entry.key.clone(),
                    reason: "unexpected value shape for directive".to_string(),
                },
            ),
            (other, _) => diags.report(
                &self.name,
                SchemaError::UnknownDirective {
                    directive: other.to_string(),
                },
            ),
        }
    }

    /// Append a primary-key field; a repeat keeps the first position
    fn add_key(&mut self, name: &str, diags: &mut Diagnostics) {
        if self.primary_keys.iter().any(|key| key == name) {
            diags.report(
                &self.name,
                SchemaError::DuplicateKeyField {
                    list: format!("{} of '{}'", KEY_DIRECTIVE, self.name),
                    field: name.to_string(),
                },
            );
            return;
        }
        self.primary_keys.push(name.to_string());
    }

    fn add_index(&mut self, names: Vec<&str>, diags: &mut Diagnostics) {
        let mut fields: Vec<String> = Vec::new();
        for name in names {
            if fields.iter().any(|field| field == name) {
                diags.report(
                    &self.name,
                    SchemaError::DuplicateKeyField {
                        list: format!("{} of '{}'", INDEX_DIRECTIVE, self.name),
                        field: name.to_string(),
                    },
                );
                continue;
            }
            fields.push(name.to_string());
        }

        if fields.is_empty() {
            diags.report(
                &self.name,
                SchemaError::MalformedEntry {
                    entry: INDEX_DIRECTIVE.to_string(),
                    reason: "an index needs at least one field".to_string(),
                },
            );
            return;
        }
        self.indexes.push(IndexSpec { fields });
    }

    /// Check that every key and index name references a declared field.
    ///
    /// A failure makes the whole unit inconsistent; emission must not proceed.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let referenced = self
            .primary_keys
            .iter()
            .map(|name| (KEY_DIRECTIVE, name))
            .chain(
                self.indexes
                    .iter()
                    .flat_map(|index| index.fields.iter().map(|name| (INDEX_DIRECTIVE, name))),
            );

        for (list, name) in referenced {
            if self.field(name).is_none() {
                return Err(SchemaError::UndeclaredField {
                    list: format!("{} of '{}'", list, self.name),
                    field: name.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Primary-key fields in key order
    pub fn key_fields(&self) -> impl Iterator<Item = &Field> {
        self.primary_keys.iter().filter_map(|name| self.field(name))
    }

    /// Storage table name
    pub fn table_name(&self) -> String {
        self.name.to_uppercase()
    }
}

/// Parse one field entry; the flag is set when the field declares itself a key
fn parse_field(
    unit: &str,
    entry: &FlatEntry,
    resolver: &TypeResolver,
) -> Result<(Field, bool), SchemaError> {
    let element = format!("{}.{}", unit, entry.key);

    let (type_name, size, comment, is_key) = match &entry.value {
        FlatValue::Scalar(type_name) => (type_name.clone(), None, None, false),
        FlatValue::Map(_) => {
            let type_name = entry.value.get("type").ok_or_else(|| SchemaError::MalformedEntry {
                entry: element.clone(),
                reason: "field attributes have no 'type'".to_string(),
            })?;
            let size = match entry.value.get("size") {
                Some(raw) => Some(raw.trim().parse::<usize>().map_err(|_| {
                    SchemaError::MalformedEntry {
                        entry: element.clone(),
                        reason: format!("size '{}' is not a positive integer", raw),
                    }
                })?),
                None => None,
            };
            let is_key = entry.value.get("primary_key") == Some("true");
            let comment = entry.value.get("comment").map(str::to_string);
            (type_name.to_string(), size, comment, is_key)
        }
        FlatValue::List(_) => {
            return Err(SchemaError::MalformedEntry {
                entry: element,
                reason: "a field must be a type name or an attribute map".to_string(),
            })
        }
        FlatValue::Malformed(reason) => {
            return Err(SchemaError::MalformedEntry {
                entry: element,
                reason: reason.clone(),
            })
        }
    };

    // `type: char` takes its width from `size`
    let lookup = match (type_name.trim(), size) {
        ("char", Some(width)) => format!("char{}", width),
        (name, _) => name.to_string(),
    };

    let ty = resolver
        .resolve(&lookup)
        .ok_or_else(|| SchemaError::UnresolvedType {
            element: element.clone(),
            type_name: lookup.clone(),
            suggestion: resolver.suggest(&lookup),
        })?;

    Ok((
        Field {
            name: entry.key.clone(),
            size: ty.capacity(),
            ty,
            comment,
        },
        is_key,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticCode;

    fn player_unit() -> FlatUnit {
        FlatUnit::new(
            "Player",
            vec![
                FlatEntry::scalar("name", "string"),
                FlatEntry::scalar("level", "uint8"),
                FlatEntry::map("tag", [("type", "char"), ("size", "16"), ("comment", "display tag")]),
                FlatEntry::list("$key", ["name"]),
                FlatEntry::list("$index", ["level", "tag"]),
                FlatEntry::scalar("$comment", "a player"),
            ],
        )
    }

    #[test]
    fn test_parse_player() {
        let resolver = TypeResolver::new();
        let mut diags = Diagnostics::new();
        let model = FlatStruct::parse(&player_unit(), &resolver, &mut diags);

        assert!(diags.is_empty(), "{}", diags);
        assert_eq!(model.name, "Player");
        let names: Vec<_> = model.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["name", "level", "tag"]);
        assert_eq!(model.primary_keys, vec!["name"]);
        assert_eq!(model.indexes, vec![IndexSpec { fields: vec!["level".into(), "tag".into()] }]);
        assert_eq!(model.comment.as_deref(), Some("a player"));

        let tag = model.field("tag").unwrap();
        assert_eq!(tag.size, Some(16));
        assert_eq!(tag.ty.repr(), "FixedText<16>");
        assert_eq!(tag.comment.as_deref(), Some("display tag"));
        assert!(model.validate().is_ok());
    }

    #[test]
    fn test_unresolved_field_is_dropped() {
        let resolver = TypeResolver::new();
        let mut diags = Diagnostics::new();
        let unit = FlatUnit::new(
            "Item",
            vec![
                FlatEntry::scalar("id", "uint32"),
                FlatEntry::scalar("weight", "decimal"),
                FlatEntry::scalar("count", "uint16"),
            ],
        );
        let model = FlatStruct::parse(&unit, &resolver, &mut diags);

        let names: Vec<_> = model.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "count"]);
        assert_eq!(diags.with_code(DiagnosticCode::UnresolvedType).count(), 1);
    }

    #[test]
    fn test_primary_key_attribute_and_key_order() {
        let resolver = TypeResolver::new();
        let mut diags = Diagnostics::new();
        let unit = FlatUnit::new(
            "Mail",
            vec![
                FlatEntry::scalar("body", "string"),
                FlatEntry::list("$key", ["slot"]),
                FlatEntry::scalar("slot", "uint16"),
                FlatEntry::map("owner", [("type", "uint64"), ("primary_key", "true")]),
            ],
        );
        let model = FlatStruct::parse(&unit, &resolver, &mut diags);

        // keys accumulate in encounter order, directive or attribute alike
        assert!(diags.is_empty());
        assert_eq!(model.primary_keys, vec!["slot", "owner"]);
        let keys: Vec<_> = model.key_fields().map(|f| f.ty.name()).collect();
        assert_eq!(keys, vec!["uint16", "uint64"]);
    }

    #[test]
    fn test_validate_rejects_undeclared_key() {
        let resolver = TypeResolver::new();
        let mut diags = Diagnostics::new();
        let unit = FlatUnit::new(
            "Player",
            vec![
                FlatEntry::scalar("name", "string"),
                FlatEntry::list("$key", ["id"]),
            ],
        );
        let model = FlatStruct::parse(&unit, &resolver, &mut diags);

        assert!(diags.is_empty());
        assert_eq!(
            model.validate(),
            Err(SchemaError::UndeclaredField {
                list: "$key of 'Player'".to_string(),
                field: "id".to_string(),
            })
        );
    }

    #[test]
    fn test_validate_rejects_undeclared_index_field() {
        let resolver = TypeResolver::new();
        let mut diags = Diagnostics::new();
        let unit = FlatUnit::new(
            "Player",
            vec![
                FlatEntry::scalar("name", "string"),
                FlatEntry::scalar("$index", "score"),
            ],
        );
        let model = FlatStruct::parse(&unit, &resolver, &mut diags);
        assert!(matches!(model.validate(), Err(SchemaError::UndeclaredField { .. })));
    }

    #[test]
    fn test_malformed_and_duplicate_entries() {
        let resolver = TypeResolver::new();
        let mut diags = Diagnostics::new();
        let unit = FlatUnit::new(
            "Bag",
            vec![
                FlatEntry::scalar("slot", "uint8"),
                FlatEntry::scalar("slot", "uint16"),
                FlatEntry::map("items", [("comment", "no type")]),
                FlatEntry::list("ids", ["uint32"]),
                FlatEntry::scalar("$unique", "slot"),
            ],
        );
        let model = FlatStruct::parse(&unit, &resolver, &mut diags);

        assert_eq!(model.fields.len(), 1);
        assert_eq!(model.fields[0].ty.name(), "uint8");
        assert_eq!(diags.with_code(DiagnosticCode::DuplicateMember).count(), 1);
        assert_eq!(diags.with_code(DiagnosticCode::MalformedEntry).count(), 2);
        assert_eq!(diags.with_code(DiagnosticCode::UnknownDirective).count(), 1);
    }

    #[test]
    fn test_repeated_key_fields_collapse() {
        let resolver = TypeResolver::new();
        let mut diags = Diagnostics::new();
        let unit = FlatUnit::new(
            "Player",
            vec![
                FlatEntry::list("$key", ["name", "realm", "name"]),
                FlatEntry::map("name", [("type", "string"), ("primary_key", "true")]),
                FlatEntry::scalar("realm", "uint16"),
                FlatEntry::list("$index", ["realm", "realm"]),
            ],
        );
        let model = FlatStruct::parse(&unit, &resolver, &mut diags);

        assert_eq!(model.primary_keys, vec!["name", "realm"]);
        assert_eq!(model.indexes, vec![IndexSpec { fields: vec!["realm".into()] }]);
        assert_eq!(diags.with_code(DiagnosticCode::DuplicateKeyField).count(), 3);
        assert!(!diags.has_errors());
        assert!(model.validate().is_ok());
    }

    #[test]
    fn test_empty_index_is_dropped() {
        let resolver = TypeResolver::new();
        let mut diags = Diagnostics::new();
        let unit = FlatUnit::new(
            "Player",
            vec![
                FlatEntry::scalar("name", "string"),
                FlatEntry::list("$index", Vec::<String>::new()),
                FlatEntry::list("$index", ["name"]),
            ],
        );
        let model = FlatStruct::parse(&unit, &resolver, &mut diags);

        assert_eq!(model.indexes, vec![IndexSpec { fields: vec!["name".into()] }]);
        assert_eq!(diags.with_code(DiagnosticCode::MalformedEntry).count(), 1);
    }

    #[test]
    fn test_malformed_value_is_reported() {
        let resolver = TypeResolver::new();
        let mut diags = Diagnostics::new();
        let unit = FlatUnit::new(
            "Player",
            vec![
                FlatEntry {
                    key: "name".to_string(),
                    value: FlatValue::Malformed("a field needs a type".to_string()),
                },
                FlatEntry::scalar("level", "uint8"),
            ],
        );
        let model = FlatStruct::parse(&unit, &resolver, &mut diags);

        assert_eq!(model.fields.len(), 1);
        let errors: Vec<_> = diags.with_code(DiagnosticCode::MalformedEntry).collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("Player.name"));
    }
}
