//! Dynamic flat records
//!
//! Executes the storage-descriptor conversions on a record held as typed
//! values, so their content can be checked without compiling generated code:
//! value lists, assignment lists, key assignments and row decoding.

use std::fmt;

use crate::error::DecodeError;
use crate::model::{Field, FlatStruct};
use crate::types::TypeKind;

/// A typed member value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Text(String),
    Bytes(Vec<u8>),
}

impl FieldValue {
    /// Default value for a field's type
    pub fn default_for(kind: TypeKind) -> Self {
        match kind {
            TypeKind::Int { signed: true, .. } => FieldValue::Int(0),
            TypeKind::Int { signed: false, .. } => FieldValue::UInt(0),
            TypeKind::Float { .. } => FieldValue::Float(0.0),
            TypeKind::Bool => FieldValue::Bool(false),
            TypeKind::Text | TypeKind::FixedText { .. } => FieldValue::Text(String::new()),
            TypeKind::Bytes => FieldValue::Bytes(Vec::new()),
        }
    }

    /// Parse a raw row value for a field's type
    pub fn parse(kind: TypeKind, raw: &str) -> Option<Self> {
        let value = match kind {
            TypeKind::Int { signed: true, .. } => FieldValue::Int(raw.trim().parse().ok()?),
            TypeKind::Int { signed: false, .. } => FieldValue::UInt(raw.trim().parse().ok()?),
            TypeKind::Float { .. } => FieldValue::Float(raw.trim().parse().ok()?),
            TypeKind::Bool => match raw.trim() {
                "1" | "true" => FieldValue::Bool(true),
                "0" | "false" => FieldValue::Bool(false),
                _ => return None,
            },
            TypeKind::Text => FieldValue::Text(raw.to_string()),
            TypeKind::FixedText { capacity } => FieldValue::Text(truncate(raw, capacity).to_string()),
            TypeKind::Bytes => FieldValue::Bytes(raw.as_bytes().to_vec()),
        };
        Some(value).filter(|value| value.fits(kind))
    }

    /// Whether the value is of the type's variant and, for integers, within its width
    pub fn fits(&self, kind: TypeKind) -> bool {
        match (self, kind) {
            (FieldValue::Int(v), TypeKind::Int { bits, signed: true }) => {
                let limit = 1i128 << (bits - 1);
                (-limit..limit).contains(&i128::from(*v))
            }
            (FieldValue::UInt(v), TypeKind::Int { bits, signed: false }) => bits >= 64 || v >> bits == 0,
            (FieldValue::Float(_), TypeKind::Float { .. })
            | (FieldValue::Bool(_), TypeKind::Bool)
            | (FieldValue::Text(_), TypeKind::Text | TypeKind::FixedText { .. })
            | (FieldValue::Bytes(_), TypeKind::Bytes) => true,
            _ => false,
        }
    }

    /// Rendering inside a query: text and bytes quoted, the rest literal
    fn query_literal(&self) -> String {
        match self {
            FieldValue::Text(text) => quote(text),
            FieldValue::Bytes(bytes) => quote(&String::from_utf8_lossy(bytes)),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::UInt(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Bool(v) => write!(f, "{}", u8::from(*v)),
            FieldValue::Text(v) => write!(f, "{}", v),
            FieldValue::Bytes(v) => write!(f, "{}", String::from_utf8_lossy(v)),
        }
    }
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Longest prefix of `text` that fits `capacity` bytes without splitting a char
fn truncate(text: &str, capacity: usize) -> &str {
    if text.len() <= capacity {
        return text;
    }
    let mut end = capacity;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// A flat record whose members are dynamic values
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRecord<'a> {
    model: &'a FlatStruct,
    values: Vec<FieldValue>,
}

impl<'a> FlatRecord<'a> {
    /// Record with every member at its type default
    pub fn new(model: &'a FlatStruct) -> Self {
        let values = model
            .fields
            .iter()
            .map(|field| FieldValue::default_for(field.ty.kind()))
            .collect();
        Self { model, values }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.position(name).map(|i| &self.values[i])
    }

    /// Assign a member; fixed-capacity text is truncated to its capacity.
    ///
    /// The value must fit the field's type, integer width included.
    pub fn set(&mut self, name: &str, value: FieldValue) -> Result<(), DecodeError> {
        let index = self.position(name).ok_or_else(|| DecodeError::InvalidValue {
            field: name.to_string(),
            value: value.to_string(),
        })?;
        let field = &self.model.fields[index];
        if !value.fits(field.ty.kind()) {
            return Err(DecodeError::InvalidValue {
                field: field.name.clone(),
                value: value.to_string(),
            });
        }

        self.values[index] = match (value, field.ty.capacity()) {
            (FieldValue::Text(text), Some(capacity)) => FieldValue::Text(truncate(&text, capacity).to_string()),
            (value, _) => value,
        };
        Ok(())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.model.fields.iter().position(|f| f.name == name)
    }

    fn fields(&self) -> impl Iterator<Item = (&Field, &FieldValue)> {
        self.model.fields.iter().zip(&self.values)
    }

    /// One value per field in declaration order, as pushed by `object_to_query`
    pub fn value_list(&self) -> String {
        self.fields()
            .map(|(_, value)| value.query_literal())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `COLUMN = value` per field, as pushed by `pairs_to_query`
    pub fn assignment_list(&self) -> String {
        self.fields()
            .map(|(field, value)| assignment(field, value))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `COLUMN = value` per key field in key order, as pushed by `keys_to_query`
    pub fn key_assignments(&self) -> String {
        self.model
            .primary_keys
            .iter()
            .filter_map(|name| {
                let index = self.position(name)?;
                Some(assignment(&self.model.fields[index], &self.values[index]))
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    /// Decode a row, as `row_to_object` does.
    ///
    /// The row length is checked before any value is read; a mismatch never
    /// yields a partially filled record.
    pub fn from_row(model: &'a FlatStruct, row: &[&str]) -> Result<Self, DecodeError> {
        if row.len() != model.fields.len() {
            return Err(DecodeError::FieldCount {
                expected: model.fields.len(),
                actual: row.len(),
            });
        }

        let values = model
            .fields
            .iter()
            .zip(row)
            .map(|(field, raw)| {
                FieldValue::parse(field.ty.kind(), raw).ok_or_else(|| DecodeError::InvalidValue {
                    field: field.name.clone(),
                    value: raw.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { model, values })
    }

    /// Values rendered as a row, the inverse of [`FlatRecord::from_row`]
    pub fn to_row(&self) -> Vec<String> {
        self.values.iter().map(ToString::to_string).collect()
    }
}

fn assignment(field: &Field, value: &FieldValue) -> String {
    format!("{} = {}", field.column_name(), value.query_literal())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::node::{FlatEntry, FlatUnit};
    use crate::types::TypeResolver;

    fn model(entries: Vec<FlatEntry>) -> FlatStruct {
        let mut diags = Diagnostics::new();
        FlatStruct::parse(&FlatUnit::new("Player", entries), &TypeResolver::new(), &mut diags)
    }

    fn player() -> FlatStruct {
        model(vec![
            FlatEntry::scalar("name", "string"),
            FlatEntry::scalar("level", "uint8"),
            FlatEntry::scalar("tag", "char4"),
            FlatEntry::list("$key", ["name"]),
        ])
    }

    #[test]
    fn test_defaults() {
        let model = player();
        let record = FlatRecord::new(&model);
        assert_eq!(record.get("name"), Some(&FieldValue::Text(String::new())));
        assert_eq!(record.get("level"), Some(&FieldValue::UInt(0)));
        assert_eq!(record.value_list(), "'', 0, ''");
    }

    #[test]
    fn test_value_and_assignment_lists() {
        let model = player();
        let mut record = FlatRecord::new(&model);
        record.set("name", FieldValue::Text("o'neil".into())).unwrap();
        record.set("level", FieldValue::UInt(7)).unwrap();
        record.set("tag", FieldValue::Text("guildmaster".into())).unwrap();

        assert_eq!(record.value_list(), "'o''neil', 7, 'guil'");
        assert_eq!(record.assignment_list(), "NAME = 'o''neil', LEVEL = 7, TAG = 'guil'");
        assert_eq!(record.key_assignments(), "NAME = 'o''neil'");
    }

    #[test]
    fn test_key_assignments_follow_key_order() {
        let model = model(vec![
            FlatEntry::scalar("owner", "uint64"),
            FlatEntry::scalar("slot", "uint16"),
            FlatEntry::scalar("item", "string"),
            FlatEntry::list("$key", ["slot", "owner"]),
        ]);
        let mut record = FlatRecord::new(&model);
        record.set("owner", FieldValue::UInt(42)).unwrap();
        record.set("slot", FieldValue::UInt(3)).unwrap();

        assert_eq!(record.key_assignments(), "SLOT = 3 AND OWNER = 42");
    }

    #[test]
    fn test_set_rejects_wrong_type() {
        let model = player();
        let mut record = FlatRecord::new(&model);
        assert!(record.set("level", FieldValue::Text("x".into())).is_err());
        assert!(record.set("missing", FieldValue::UInt(1)).is_err());
    }

    #[test]
    fn test_set_rejects_out_of_range_integers() {
        let model = model(vec![
            FlatEntry::scalar("level", "uint8"),
            FlatEntry::scalar("delta", "int8"),
            FlatEntry::scalar("gold", "uint64"),
        ]);
        let mut record = FlatRecord::new(&model);

        assert_eq!(
            record.set("level", FieldValue::UInt(300)),
            Err(DecodeError::InvalidValue {
                field: "level".into(),
                value: "300".into()
            })
        );
        assert_eq!(record.get("level"), Some(&FieldValue::UInt(0)));
        assert!(record.set("level", FieldValue::UInt(255)).is_ok());

        assert!(record.set("delta", FieldValue::Int(-129)).is_err());
        assert!(record.set("delta", FieldValue::Int(128)).is_err());
        assert!(record.set("delta", FieldValue::Int(-128)).is_ok());

        assert!(record.set("gold", FieldValue::UInt(u64::MAX)).is_ok());
        assert_eq!(record.value_list(), "255, -128, 18446744073709551615");
    }

    #[test]
    fn test_from_row() {
        let model = player();
        let record = FlatRecord::from_row(&model, &["alice", "12", "abcdef"]).unwrap();

        assert_eq!(record.get("name"), Some(&FieldValue::Text("alice".into())));
        assert_eq!(record.get("level"), Some(&FieldValue::UInt(12)));
        assert_eq!(record.get("tag"), Some(&FieldValue::Text("abcd".into())));
        assert_eq!(record.to_row(), vec!["alice", "12", "abcd"]);
    }

    #[test]
    fn test_from_row_length_mismatch() {
        let model = player();

        assert_eq!(
            FlatRecord::from_row(&model, &["alice", "12"]),
            Err(DecodeError::FieldCount { expected: 3, actual: 2 })
        );
        assert_eq!(
            FlatRecord::from_row(&model, &["alice", "12", "x", "extra"]),
            Err(DecodeError::FieldCount { expected: 3, actual: 4 })
        );
    }

    #[test]
    fn test_from_row_invalid_value() {
        let model = player();
        assert_eq!(
            FlatRecord::from_row(&model, &["alice", "300", "x"]),
            Err(DecodeError::InvalidValue {
                field: "level".into(),
                value: "300".into()
            })
        );
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "h");
        assert_eq!(truncate("héllo", 3), "hé");
        assert_eq!(truncate("abc", 8), "abc");
    }
}
