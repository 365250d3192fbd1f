//! Configuration management for schema-codegen
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (schema-codegen.toml)
//! - Environment variables (SCHEMA_CODEGEN__*)
//!
//! ## Example config file (schema-codegen.toml):
//! ```toml
//! policy = "strict"
//!
//! [input]
//! dir = "schemas"
//!
//! [output]
//! record = "src/generated"
//! storage = "src/generated"
//! ddl = "sql"
//! proto = "proto"
//! marshal = "src/generated"
//!
//! [render]
//! storage_runtime = "crate::db"
//! map_container = "hash_map"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::codegen::{ArtifactKind, RenderProfile};
use crate::compiler::Leniency;

/// Main configuration of a codegen run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodegenConfig {
    /// What to do with units that report schema errors
    #[serde(default)]
    pub policy: Leniency,

    /// Input settings
    #[serde(default)]
    pub input: InputConfig,

    /// Output directories per artifact
    #[serde(default)]
    pub output: OutputConfig,

    /// Rendering of emitted code
    #[serde(default)]
    pub render: RenderProfile,
}

/// Input configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Directory scanned for schema files when none are listed
    #[serde(default = "default_input_dir")]
    pub dir: PathBuf,
}

/// Output directories
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Record types and proto glue
    #[serde(default = "default_source_dir")]
    pub record: PathBuf,

    /// Storage descriptors
    #[serde(default = "default_source_dir")]
    pub storage: PathBuf,

    /// Table DDL
    #[serde(default = "default_ddl_dir")]
    pub ddl: PathBuf,

    /// `.proto` definitions
    #[serde(default = "default_proto_dir")]
    pub proto: PathBuf,

    /// Tree marshal procedures
    #[serde(default = "default_source_dir")]
    pub marshal: PathBuf,
}

impl OutputConfig {
    /// Directory an artifact kind is written to
    pub fn dir_for(&self, kind: ArtifactKind) -> &Path {
        match kind {
            ArtifactKind::Record | ArtifactKind::ProtoGlue => &self.record,
            ArtifactKind::StorageDescriptor => &self.storage,
            ArtifactKind::TableDdl => &self.ddl,
            ArtifactKind::ProtoSchema => &self.proto,
            ArtifactKind::TreeMarshal => &self.marshal,
        }
    }
}

// Default value functions
fn default_input_dir() -> PathBuf {
    PathBuf::from("schemas")
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("generated/src")
}

fn default_ddl_dir() -> PathBuf {
    PathBuf::from("generated/sql")
}

fn default_proto_dir() -> PathBuf {
    PathBuf::from("generated/proto")
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            dir: default_input_dir(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            record: default_source_dir(),
            storage: default_source_dir(),
            ddl: default_ddl_dir(),
            proto: default_proto_dir(),
            marshal: default_source_dir(),
        }
    }
}

impl CodegenConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the default locations
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = [
            "schema-codegen.toml",
            ".schema-codegen.toml",
            "config/schema-codegen.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "schema-codegen", "schema-codegen") {
            let xdg_config = config_dir.config_dir().join("schema-codegen.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        // Load from environment variables (SCHEMA_CODEGEN__*)
        builder = builder.add_source(
            Environment::with_prefix("SCHEMA_CODEGEN")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::MapContainer;

    #[test]
    fn test_default_config() {
        let config = CodegenConfig::default();
        assert_eq!(config.policy, Leniency::Lenient);
        assert_eq!(config.input.dir, PathBuf::from("schemas"));
        assert_eq!(config.output.dir_for(ArtifactKind::TableDdl), Path::new("generated/sql"));
        assert_eq!(config.output.dir_for(ArtifactKind::ProtoGlue), Path::new("generated/src"));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codegen.toml");

        let mut config = CodegenConfig::default();
        config.policy = Leniency::Strict;
        config.output.ddl = PathBuf::from("db/schema");
        config.render.map_container = MapContainer::HashMap;
        config.save(&path).unwrap();

        let loaded = CodegenConfig::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.policy, Leniency::Strict);
        assert_eq!(loaded.output.ddl, PathBuf::from("db/schema"));
        assert_eq!(loaded.render.map_container, MapContainer::HashMap);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: CodegenConfig = toml::from_str(
            r#"
            [output]
            proto = "wire"
            "#,
        )
        .unwrap();
        assert_eq!(config.output.proto, PathBuf::from("wire"));
        assert_eq!(config.output.record, PathBuf::from("generated/src"));
        assert_eq!(config.render, RenderProfile::default());
    }
}
