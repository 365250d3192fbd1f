//! Compile Pipeline
//!
//! Schema text → [`SchemaUnit`] → [`Compiled`] model → rendered [`Artifact`]s
//! → files on disk (or a drift report against them).
//!
//! Key constraints:
//! - Units are compiled one at a time; only the read-only resolver is shared.
//! - Artifacts are rendered fully in memory, then each is written in one call.
//!   A failed write affects that artifact only.
//! - Under [`Leniency::Strict`] any error-severity diagnostic rejects the unit.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use similar::TextDiff;

use crate::checksum::Checksum;
use crate::codegen::{self, ArtifactKind, RenderProfile};
use crate::config::OutputConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{CodegenError, Result};
use crate::model::{FlatStruct, Model, TreeSchema};
use crate::node::{FlatUnit, SchemaNode};
use crate::reader::{self, Dialect};
use crate::types::TypeResolver;

// =============================================================================
// Policy
// =============================================================================

/// How schema errors affect a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Leniency {
    /// Report and skip the offending element; the rest of the unit is emitted
    #[default]
    Lenient,
    /// Reject the unit on any error
    Strict,
}

// =============================================================================
// Schema Units
// =============================================================================

/// Parsed input of one unit
#[derive(Debug, Clone, PartialEq)]
pub enum UnitSource {
    Flat(FlatUnit),
    Tree(SchemaNode),
}

/// One schema unit ready to compile
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaUnit {
    pub name: String,
    pub source: UnitSource,
    /// Checksum of the schema text the unit came from
    pub checksum: Checksum,
}

impl SchemaUnit {
    /// Parse every unit of a schema text
    pub fn from_text(text: &str, dialect: Dialect) -> Result<Vec<SchemaUnit>> {
        let checksum = Checksum::of_text(text);
        let units = match dialect {
            Dialect::Tree => {
                let root = reader::read_tree(text)?;
                vec![SchemaUnit {
                    name: root.tag.clone(),
                    source: UnitSource::Tree(root),
                    checksum,
                }]
            }
            Dialect::Flat => reader::read_flat(text)?
                .into_iter()
                .map(|unit| SchemaUnit {
                    name: unit.name.clone(),
                    source: UnitSource::Flat(unit),
                    checksum: checksum.clone(),
                })
                .collect(),
        };
        Ok(units)
    }

    /// Read and parse a schema file; the dialect comes from its extension
    pub fn load(path: &Path) -> Result<Vec<SchemaUnit>> {
        let dialect = Dialect::from_path(path).ok_or_else(|| {
            CodegenError::InvalidDocument(format!("{}: unknown schema file extension", path.display()))
        })?;
        let text = fs::read_to_string(path)?;
        Self::from_text(&text, dialect)
    }
}

// =============================================================================
// Compile
// =============================================================================

/// A resolved unit with the diagnostics found while building it
#[derive(Debug, Clone)]
pub struct Compiled {
    pub model: Model,
    pub diagnostics: Diagnostics,
}

/// Build and validate the model of one unit.
///
/// Fails when a key or index references an undeclared field, or under the
/// strict policy when any error was reported.
pub fn compile(unit: &SchemaUnit, resolver: &TypeResolver, policy: Leniency) -> Result<Compiled> {
    let mut diagnostics = Diagnostics::new();

    let model = match &unit.source {
        UnitSource::Flat(flat) => {
            let model = FlatStruct::parse(flat, resolver, &mut diagnostics);
            if let Err(source) = model.validate() {
                diagnostics.report(&unit.name, source.clone());
                return Err(CodegenError::Schema {
                    unit: unit.name.clone(),
                    source,
                    diagnostics,
                });
            }
            Model::Flat(model)
        }
        UnitSource::Tree(root) => Model::Tree(TreeSchema::parse(root, resolver, &mut diagnostics)),
    };

    if policy == Leniency::Strict && diagnostics.has_errors() {
        return Err(CodegenError::Rejected {
            unit: unit.name.clone(),
            diagnostics,
        });
    }

    tracing::info!(
        unit = %unit.name,
        checksum = unit.checksum.short(),
        dialect = model.dialect().as_str(),
        errors = diagnostics.error_count(),
        warnings = diagnostics.warning_count(),
        "compiled schema unit"
    );
    Ok(Compiled { model, diagnostics })
}

// =============================================================================
// Render
// =============================================================================

/// One rendered artifact, header included
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub file_name: String,
    pub contents: String,
}

/// Render every artifact that applies to a compiled unit
pub fn render(
    unit: &SchemaUnit,
    compiled: &Compiled,
    resolver: &TypeResolver,
    profile: &RenderProfile,
) -> Result<Vec<Artifact>> {
    let mut artifacts = Vec::new();

    for kind in ArtifactKind::for_model(&compiled.model) {
        let body = codegen::emit(&compiled.model, resolver, kind, profile)?;
        let mut contents = codegen::header(kind, &unit.name, &unit.checksum);
        contents.push('\n');
        contents.push_str(&body);
        artifacts.push(Artifact {
            kind,
            file_name: kind.file_name(&unit.name),
            contents,
        });
    }

    Ok(artifacts)
}

// =============================================================================
// Write / Check
// =============================================================================

/// Result of writing one artifact
#[derive(Debug)]
pub struct WriteOutcome {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub result: Result<()>,
}

/// Write artifacts to their configured directories.
///
/// Every artifact is attempted; failures are returned per artifact.
pub fn write_artifacts(artifacts: &[Artifact], output: &OutputConfig) -> Vec<WriteOutcome> {
    artifacts
        .iter()
        .map(|artifact| {
            let dir = output.dir_for(artifact.kind);
            let path = dir.join(&artifact.file_name);
            let result = fs::create_dir_all(dir)
                .and_then(|()| fs::write(&path, &artifact.contents))
                .map_err(|source| CodegenError::Artifact {
                    path: path.clone(),
                    source,
                });

            match &result {
                Ok(()) => tracing::info!(kind = %artifact.kind, path = %path.display(), "wrote artifact"),
                Err(err) => tracing::error!(kind = %artifact.kind, "{}", err),
            }

            WriteOutcome {
                kind: artifact.kind,
                path,
                result,
            }
        })
        .collect()
}

/// Difference between a rendered artifact and the file on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Drift {
    /// No file at the artifact's path
    Missing { path: PathBuf },
    /// File differs; carries a unified diff from disk to rendered
    Changed { path: PathBuf, diff: String },
}

impl Drift {
    pub fn path(&self) -> &Path {
        match self {
            Drift::Missing { path } | Drift::Changed { path, .. } => path,
        }
    }
}

/// Compare rendered artifacts with the files on disk without writing anything
pub fn check_artifacts(artifacts: &[Artifact], output: &OutputConfig) -> Result<Vec<Drift>> {
    let mut drifts = Vec::new();

    for artifact in artifacts {
        let path = output.dir_for(artifact.kind).join(&artifact.file_name);
        let existing = match fs::read_to_string(&path) {
            Ok(existing) => existing,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                drifts.push(Drift::Missing { path });
                continue;
            }
            Err(source) => return Err(CodegenError::Artifact { path, source }),
        };

        if existing != artifact.contents {
            let on_disk = path.display().to_string();
            let diff = TextDiff::from_lines(&existing, &artifact.contents)
                .unified_diff()
                .context_radius(3)
                .header(&on_disk, "rendered")
                .to_string();
            tracing::warn!(path = %on_disk, "artifact is out of date");
            drifts.push(Drift::Changed { path, diff });
        }
    }

    Ok(drifts)
}
