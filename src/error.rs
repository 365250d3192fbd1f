//! Error types for schema compilation

use std::path::PathBuf;

use thiserror::Error;

/// Result type for codegen operations
pub type Result<T> = std::result::Result<T, CodegenError>;

/// Errors found in a schema unit.
///
/// Most of these are recoverable: the offending element is skipped and recorded
/// in [`Diagnostics`](crate::diagnostics::Diagnostics). `UndeclaredField` is
/// terminal for its unit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("unknown type '{type_name}' for '{element}'{}", did_you_mean(.suggestion))]
    UnresolvedType {
        element: String,
        type_name: String,
        suggestion: Option<String>,
    },

    #[error("map container '{node}' does not declare a key_ attribute")]
    MissingMapKeyDeclaration { node: String },

    #[error("map container '{node}' has no attribute '{key}' to use as its key")]
    MissingMapKey { node: String, key: String },

    #[error("node '{node}' has invalid container kind '{value}'")]
    InvalidContainer { node: String, value: String },

    #[error("{list} references undeclared field '{field}'")]
    UndeclaredField { list: String, field: String },

    #[error("duplicate member '{member}' in '{owner}'")]
    DuplicateMember { owner: String, member: String },

    #[error("malformed entry '{entry}': {reason}")]
    MalformedEntry { entry: String, reason: String },

    #[error("unknown directive '{directive}'")]
    UnknownDirective { directive: String },

    #[error("{list} lists field '{field}' more than once")]
    DuplicateKeyField { list: String, field: String },
}

fn did_you_mean(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(name) => format!(" (did you mean '{}'?)", name),
        None => String::new(),
    }
}

/// Errors decoding a storage row into a record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("row has {actual} values, expected {expected}")]
    FieldCount { expected: usize, actual: usize },

    #[error("invalid value '{value}' for field '{field}'")]
    InvalidValue { field: String, value: String },
}

/// Crate-level errors
#[derive(Error, Debug)]
pub enum CodegenError {
    /// A terminal schema error; `diagnostics` holds it along with everything
    /// reported before it
    #[error("schema unit '{unit}' aborted: {source}")]
    Schema {
        unit: String,
        #[source]
        source: SchemaError,
        diagnostics: crate::diagnostics::Diagnostics,
    },

    #[error("schema unit '{unit}' rejected with {} error(s)", .diagnostics.error_count())]
    Rejected {
        unit: String,
        diagnostics: crate::diagnostics::Diagnostics,
    },

    #[error("artifact '{kind}' does not apply to {dialect} schemas")]
    Unsupported { kind: String, dialect: String },

    #[error("cannot write artifact {path}: {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("XML error: {0}")]
    Xml(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid schema document: {0}")]
    InvalidDocument(String),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CodegenError {
    pub(crate) fn xml(err: impl std::fmt::Display) -> Self {
        Self::Xml(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_type_message() {
        let err = SchemaError::UnresolvedType {
            element: "Player.level".to_string(),
            type_name: "unt8".to_string(),
            suggestion: Some("uint8".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "unknown type 'unt8' for 'Player.level' (did you mean 'uint8'?)"
        );

        let err = SchemaError::UnresolvedType {
            element: "Player.level".to_string(),
            type_name: "zzz".to_string(),
            suggestion: None,
        };
        assert_eq!(err.to_string(), "unknown type 'zzz' for 'Player.level'");
    }

    #[test]
    fn test_decode_error_message() {
        let err = DecodeError::FieldCount { expected: 3, actual: 2 };
        assert_eq!(err.to_string(), "row has 2 values, expected 3");
    }
}
