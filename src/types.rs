//! Primitive Type Resolution
//!
//! Maps schema type names to the four tokens every emitter needs:
//! - representation: the Rust type of the in-memory record member
//! - wire: the proto2 scalar type of the serialized field
//! - storage: the column DDL of the storage table
//! - default: the literal a member is initialized/reset to
//!
//! The registry is built once by [`TypeResolver::new`] and never mutated. It is
//! passed by shared reference into every parse and emit call.

use std::collections::HashMap;
use std::fmt;

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use regex::Regex;

// =============================================================================
// Primitive Type
// =============================================================================

/// Semantic classification of a primitive type.
///
/// Drives quoting, widening and row conversion decisions so emitters never
/// compare type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Int { bits: u8, signed: bool },
    Float { bits: u8 },
    Bool,
    /// Variable-length text
    Text,
    /// Variable-length binary
    Bytes,
    /// Fixed-capacity text buffer (`charN`)
    FixedText { capacity: usize },
}

/// A resolved primitive type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimitiveType {
    name: String,
    kind: TypeKind,
    repr: String,
    wire: String,
    storage: String,
    default: String,
}

impl PrimitiveType {
    fn new(name: &str, kind: TypeKind, repr: &str, wire: &str, storage: &str, default: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            repr: repr.to_string(),
            wire: wire.to_string(),
            storage: storage.to_string(),
            default: default.to_string(),
        }
    }

    /// Schema type name (e.g. `uint8`, `char32`)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// In-memory representation token
    pub fn repr(&self) -> &str {
        &self.repr
    }

    /// Serialization wire type token
    pub fn wire(&self) -> &str {
        &self.wire
    }

    /// Storage column DDL token
    pub fn storage(&self) -> &str {
        &self.storage
    }

    /// Default-value literal
    pub fn default_value(&self) -> &str {
        &self.default
    }

    /// Capacity of a fixed-width text type
    pub fn capacity(&self) -> Option<usize> {
        match self.kind {
            TypeKind::FixedText { capacity } => Some(capacity),
            _ => None,
        }
    }

    /// Text and byte values are quoted when written into a query
    pub fn is_quoted(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Text | TypeKind::Bytes | TypeKind::FixedText { .. }
        )
    }

    /// 8-bit integers are widened before emission so they never render as characters
    pub fn is_narrow_int(&self) -> bool {
        matches!(self.kind, TypeKind::Int { bits: 8, .. })
    }

    pub fn is_fixed_text(&self) -> bool {
        matches!(self.kind, TypeKind::FixedText { .. })
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

// =============================================================================
// Type Resolver
// =============================================================================

/// Fixed registry of primitive types plus the parametric `charN` family
pub struct TypeResolver {
    /// name -> registered type
    types: HashMap<String, PrimitiveType>,

    /// Registration order, for deterministic iteration
    order: Vec<String>,

    /// Matches the `char<N>` family
    fixed_text: Regex,
}

impl Default for TypeResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeResolver {
    /// Build the standard registry
    pub fn new() -> Self {
        use TypeKind::*;

        let signed = |bits| Int { bits, signed: true };
        let unsigned = |bits| Int { bits, signed: false };

        let table = [
            PrimitiveType::new("int8", signed(8), "i8", "int32", "tinyint(3) NOT NULL default '0'", "0"),
            PrimitiveType::new("uint8", unsigned(8), "u8", "uint32", "tinyint(3) unsigned NOT NULL default '0'", "0"),
            PrimitiveType::new("int16", signed(16), "i16", "int32", "smallint(5) NOT NULL default '0'", "0"),
            PrimitiveType::new("uint16", unsigned(16), "u16", "uint32", "smallint(5) unsigned NOT NULL default '0'", "0"),
            PrimitiveType::new("int32", signed(32), "i32", "int32", "int(10) NOT NULL default '0'", "0"),
            PrimitiveType::new("uint32", unsigned(32), "u32", "uint32", "int(10) unsigned NOT NULL default '0'", "0"),
            PrimitiveType::new("int", signed(32), "i32", "int32", "int(10) NOT NULL default '0'", "0"),
            PrimitiveType::new("uint", unsigned(32), "u32", "uint32", "int(10) unsigned NOT NULL default '0'", "0"),
            PrimitiveType::new("int64", signed(64), "i64", "int64", "bigint(20) NOT NULL default '0'", "0"),
            PrimitiveType::new("uint64", unsigned(64), "u64", "uint64", "bigint(20) unsigned NOT NULL default '0'", "0"),
            PrimitiveType::new("float", Float { bits: 32 }, "f32", "float", "float NOT NULL default '0'", "0.0"),
            PrimitiveType::new("double", Float { bits: 64 }, "f64", "double", "double NOT NULL default '0'", "0.0"),
            PrimitiveType::new("bool", Bool, "bool", "bool", "bool NOT NULL default '0'", "false"),
            PrimitiveType::new("string", Text, "String", "string", "text", "String::new()"),
            PrimitiveType::new("bytes", Bytes, "Vec<u8>", "bytes", "blob", "Vec::new()"),
            PrimitiveType::new("bytes_tiny", Bytes, "Vec<u8>", "bytes", "tinyblob", "Vec::new()"),
            PrimitiveType::new("bytes_medium", Bytes, "Vec<u8>", "bytes", "mediumblob", "Vec::new()"),
            PrimitiveType::new("bytes_long", Bytes, "Vec<u8>", "bytes", "longblob", "Vec::new()"),
        ];

        let mut types = HashMap::with_capacity(table.len());
        let mut order = Vec::with_capacity(table.len());
        for ty in table {
            order.push(ty.name.clone());
            types.insert(ty.name.clone(), ty);
        }

        Self {
            types,
            order,
            fixed_text: Regex::new(r"^char([0-9]+)$").expect("fixed text pattern is valid"),
        }
    }

    /// Resolve a schema type name.
    ///
    /// Returns `None` for unknown names; callers must treat that as a schema
    /// error rather than falling back to a default.
    pub fn resolve(&self, name: &str) -> Option<PrimitiveType> {
        let name = name.trim();
        if let Some(ty) = self.types.get(name) {
            return Some(ty.clone());
        }
        self.resolve_fixed_text(name)
    }

    fn resolve_fixed_text(&self, name: &str) -> Option<PrimitiveType> {
        let captures = self.fixed_text.captures(name)?;
        let capacity: usize = captures[1].parse().ok()?;
        if capacity == 0 {
            return None;
        }

        Some(PrimitiveType {
            name: format!("char{}", capacity),
            kind: TypeKind::FixedText { capacity },
            repr: format!("FixedText<{}>", capacity),
            wire: "string".to_string(),
            storage: format!("varchar({}) NOT NULL default ''", capacity),
            default: "FixedText::new()".to_string(),
        })
    }

    /// Registered type names in registration order (excludes the `charN` family)
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    /// The 32-bit type an 8-bit integer is widened to before emission
    pub fn widen(&self, ty: &PrimitiveType) -> Option<PrimitiveType> {
        match ty.kind {
            TypeKind::Int { bits: 8, signed: true } => self.resolve("int32"),
            TypeKind::Int { bits: 8, signed: false } => self.resolve("uint32"),
            _ => None,
        }
    }

    /// Rust type of the serialized field carrying `ty`.
    ///
    /// Wire tokens are themselves registered names, so the lookup goes back
    /// through the registry (narrow integers travel as 32-bit).
    pub fn wire_repr(&self, ty: &PrimitiveType) -> String {
        self.types
            .get(ty.wire())
            .map(|wire| wire.repr.clone())
            .unwrap_or_else(|| ty.repr.clone())
    }

    /// Closest registered name to an unknown one
    pub fn suggest(&self, name: &str) -> Option<String> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let matcher = SkimMatcherV2::default();
        self.names()
            .filter_map(|candidate| {
                let forward = matcher.fuzzy_match(candidate, name);
                let backward = matcher.fuzzy_match(name, candidate);
                forward.max(backward).map(|score| (score, candidate))
            })
            .max_by_key(|(score, _)| *score)
            .map(|(_, candidate)| candidate.to_string())
    }
}
