//! Code Generation
//!
//! Renders resolved models into textual artifacts.
//!
//! Architecture:
//! - Model: resolved schema unit ([`FlatStruct`] or [`TreeSchema`]), never mutated here
//! - RenderProfile: rendering choices (runtime paths, containers, derives)
//! - Emitters: one pure function per artifact kind
//!
//! The key constraint: emitters never read schema documents or reserved
//! attributes, only model fields. Every artifact of a unit is derived from the
//! same model, so declaration order, keys and defaults agree across them.

pub mod config;
pub mod marshal;
pub mod names;
pub mod proto;
pub mod record;
pub mod storage;

pub use config::{MapContainer, RenderProfile};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::checksum::Checksum;
use crate::error::{CodegenError, Result};
use crate::model::Model;
use crate::types::TypeResolver;

// =============================================================================
// Artifact Kinds
// =============================================================================

/// One kind of emitted artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Rust record type(s)
    Record,
    /// Rust storage descriptor (flat only)
    StorageDescriptor,
    /// SQL `CREATE TABLE` (flat only)
    TableDdl,
    /// proto2 message definition (flat only)
    ProtoSchema,
    /// Rust record/message conversions (flat only)
    ProtoGlue,
    /// Rust parse/write/reset procedures (tree only)
    TreeMarshal,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 6] = [
        ArtifactKind::Record,
        ArtifactKind::StorageDescriptor,
        ArtifactKind::TableDdl,
        ArtifactKind::ProtoSchema,
        ArtifactKind::ProtoGlue,
        ArtifactKind::TreeMarshal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Record => "record",
            ArtifactKind::StorageDescriptor => "storage_descriptor",
            ArtifactKind::TableDdl => "table_ddl",
            ArtifactKind::ProtoSchema => "proto_schema",
            ArtifactKind::ProtoGlue => "proto_glue",
            ArtifactKind::TreeMarshal => "tree_marshal",
        }
    }

    /// Whether this kind is emitted for the model's dialect
    pub fn applies_to(&self, model: &Model) -> bool {
        match (self, model) {
            (ArtifactKind::Record, _) => true,
            (ArtifactKind::TreeMarshal, Model::Tree(_)) => true,
            (ArtifactKind::TreeMarshal, Model::Flat(_)) => false,
            (_, Model::Flat(_)) => true,
            (_, Model::Tree(_)) => false,
        }
    }

    /// Kinds emitted for a model, in emission order
    pub fn for_model(model: &Model) -> impl Iterator<Item = ArtifactKind> + '_ {
        Self::ALL.into_iter().filter(move |kind| kind.applies_to(model))
    }

    /// File name of this artifact for a unit
    pub fn file_name(&self, unit: &str) -> String {
        let stem = names::snake_case(unit);
        match self {
            ArtifactKind::Record => format!("{}.rs", stem),
            ArtifactKind::StorageDescriptor => format!("{}_storage.rs", stem),
            ArtifactKind::TableDdl => format!("{}.sql", stem),
            ArtifactKind::ProtoSchema => format!("{}.proto", stem),
            ArtifactKind::ProtoGlue => format!("{}_proto.rs", stem),
            ArtifactKind::TreeMarshal => format!("{}_marshal.rs", stem),
        }
    }

    /// Line comment marker of the artifact's language
    pub fn comment_prefix(&self) -> &'static str {
        match self {
            ArtifactKind::TableDdl => "--",
            _ => "//",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Public API
// =============================================================================

/// Render one artifact body for a model.
///
/// Emitting a kind that does not apply to the model's dialect is an
/// [`CodegenError::Unsupported`] error.
pub fn emit(
    model: &Model,
    resolver: &TypeResolver,
    kind: ArtifactKind,
    profile: &RenderProfile,
) -> Result<String> {
    let code = match (kind, model) {
        (ArtifactKind::Record, Model::Flat(model)) => record::emit_flat(model, profile),
        (ArtifactKind::Record, Model::Tree(model)) => record::emit_tree(model, profile),
        (ArtifactKind::StorageDescriptor, Model::Flat(model)) => {
            storage::emit_descriptor(model, resolver, profile)
        }
        (ArtifactKind::TableDdl, Model::Flat(model)) => storage::emit_table_ddl(model, profile),
        (ArtifactKind::ProtoSchema, Model::Flat(model)) => proto::emit_schema(model, profile),
        (ArtifactKind::ProtoGlue, Model::Flat(model)) => proto::emit_glue(model, resolver, profile),
        (ArtifactKind::TreeMarshal, Model::Tree(model)) => marshal::emit(model, profile),
        (kind, model) => {
            return Err(CodegenError::Unsupported {
                kind: kind.to_string(),
                dialect: model.dialect().as_str().to_string(),
            })
        }
    };
    Ok(code)
}

/// "Generated, do not edit" header identifying the unit and its schema source
pub fn header(kind: ArtifactKind, unit: &str, source: &Checksum) -> String {
    let c = kind.comment_prefix();
    let mut out = format!(
        "{c} Generated by schema-codegen from {unit} - DO NOT EDIT\n{c} schema sha256: {source}\n",
        c = c,
        unit = unit,
        source = source
    );
    if kind == ArtifactKind::ProtoSchema {
        out.push_str(&format!(
            "{c}\n{c} Field tags follow declaration order. Reordering, inserting or removing\n{c} fields changes the wire schema.\n",
            c = c
        ));
    }
    out
}

/// Read the schema checksum back out of an artifact header
pub fn header_checksum(artifact: &str) -> Option<Checksum> {
    artifact
        .lines()
        .take(4)
        .find_map(|line| line.split_once("schema sha256: "))
        .map(|(_, hash)| Checksum::from(hash.trim()))
}

// =============================================================================
// Code Writer
// =============================================================================

/// Indentation-aware line buffer shared by the emitters
#[derive(Debug, Default)]
pub(crate) struct CodeWriter {
    out: String,
    level: usize,
}

impl CodeWriter {
    const INDENT: &'static str = "    ";

    pub fn new() -> Self {
        Self::default()
    }

    /// Write one line at the current indentation
    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.level {
                self.out.push_str(Self::INDENT);
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    pub fn blank(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with("\n\n") && !self.out.ends_with("{\n") {
            self.out.push('\n');
        }
    }

    /// Write `text` and indent what follows
    pub fn open(&mut self, text: impl AsRef<str>) {
        self.line(text);
        self.level += 1;
    }

    /// Dedent and write `text`
    pub fn close(&mut self, text: impl AsRef<str>) {
        self.level = self.level.saturating_sub(1);
        self.line(text);
    }

    /// Doc comment lines for an optional comment
    pub fn doc(&mut self, comment: Option<&str>) {
        if let Some(comment) = comment {
            for line in comment.lines() {
                let line = line.trim_end();
                if line.is_empty() {
                    self.line("///");
                } else {
                    self.line(format!("/// {}", line.trim_start()));
                }
            }
        }
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// Rust string literal for arbitrary text
pub(crate) fn string_literal(text: &str) -> String {
    format!("{:?}", text)
}
