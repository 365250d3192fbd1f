//! Schema Codegen
//!
//! Compiles declarative data schemas into generated source artifacts.
//!
//! ## Features
//!
//! - **Two dialects**: flat field lists (YAML) and nested attributed trees (XML)
//! - **Flat artifacts**: record type, storage descriptor, table DDL, proto2 message and glue
//! - **Tree artifacts**: nested record types with parse/write/reset marshal procedures
//! - **Lenient diagnostics**: bad elements are reported and skipped, or the unit is rejected under the strict policy
//! - **Drift checks**: compare rendered artifacts against files on disk
//!
//! ## Pipeline
//!
//! ```text
//! schema text ─ reader ─▶ SchemaNode / FlatUnit
//!             ─ model  ─▶ TreeSchema / FlatStruct   (+ Diagnostics)
//!             ─ codegen ─▶ Artifact per kind        (header + body)
//!             ─ compiler ─▶ files / drift report
//! ```
//!
//! [`dynamic`] evaluates the generated conversions and marshal procedures on
//! dynamic values.

pub mod checksum;
pub mod codegen;
pub mod compiler;
pub mod config;
pub mod diagnostics;
pub mod dynamic;
pub mod error;
pub mod model;
pub mod node;
pub mod reader;
pub mod types;

pub use checksum::Checksum;
pub use codegen::{emit, ArtifactKind, MapContainer, RenderProfile};
pub use compiler::{check_artifacts, compile, render, write_artifacts, Artifact, Compiled, Drift, Leniency, SchemaUnit, UnitSource};
pub use config::CodegenConfig;
pub use diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, Severity};
pub use error::{CodegenError, DecodeError, Result, SchemaError};
pub use model::{FlatStruct, Model, TreeSchema};
pub use node::{FlatEntry, FlatUnit, FlatValue, SchemaNode};
pub use reader::Dialect;
pub use types::{PrimitiveType, TypeKind, TypeResolver};
