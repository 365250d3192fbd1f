//! Diagnostics
//!
//! Recoverable schema problems found while building a model. The offending
//! element is skipped and a [`Diagnostic`] recorded; the leniency policy later
//! decides whether the unit survives what was recorded.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SchemaError;

/// Stable code per [`SchemaError`] kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    UnresolvedType,
    MissingMapKeyDeclaration,
    MissingMapKey,
    InvalidContainer,
    UndeclaredField,
    DuplicateMember,
    MalformedEntry,
    UnknownDirective,
    DuplicateKeyField,
}

impl DiagnosticCode {
    pub fn as_str(self) -> &'static str {
        self.meta().0
    }

    pub fn severity(self) -> Severity {
        self.meta().1
    }

    fn meta(self) -> (&'static str, Severity) {
        use Severity::{Error, Warning};
        match self {
            Self::UnresolvedType => ("E001", Error),
            Self::MissingMapKeyDeclaration => ("E002", Error),
            Self::MissingMapKey => ("E003", Error),
            Self::InvalidContainer => ("E004", Error),
            Self::UndeclaredField => ("E005", Error),
            Self::DuplicateMember => ("E006", Error),
            Self::MalformedEntry => ("E007", Error),
            Self::UnknownDirective => ("W001", Warning),
            Self::DuplicateKeyField => ("W002", Warning),
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&SchemaError> for DiagnosticCode {
    fn from(err: &SchemaError) -> Self {
        match err {
            SchemaError::UnresolvedType { .. } => Self::UnresolvedType,
            SchemaError::MissingMapKeyDeclaration { .. } => Self::MissingMapKeyDeclaration,
            SchemaError::MissingMapKey { .. } => Self::MissingMapKey,
            SchemaError::InvalidContainer { .. } => Self::InvalidContainer,
            SchemaError::UndeclaredField { .. } => Self::UndeclaredField,
            SchemaError::DuplicateMember { .. } => Self::DuplicateMember,
            SchemaError::MalformedEntry { .. } => Self::MalformedEntry,
            SchemaError::UnknownDirective { .. } => Self::UnknownDirective,
            SchemaError::DuplicateKeyField { .. } => Self::DuplicateKeyField,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// One recorded problem, located by unit and (for tree schemas) node path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub unit: String,
    pub code: DiagnosticCode,
    /// Qualified node path such as `Guild::Member`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} in {}", self.code, self.severity(), self.unit)?;
        if let Some(path) = &self.path {
            write!(f, " at {}", path)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Diagnostics of one schema unit, in report order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, unit: &str, err: SchemaError) {
        self.record(unit, None, err);
    }

    /// Report an error found under a tree node
    pub fn report_at(&mut self, unit: &str, path: &str, err: SchemaError) {
        self.record(unit, Some(path.to_string()), err);
    }

    fn record(&mut self, unit: &str, path: Option<String>, err: SchemaError) {
        let diagnostic = Diagnostic {
            unit: unit.to_string(),
            code: DiagnosticCode::from(&err),
            path,
            message: err.to_string(),
        };
        tracing::warn!(code = %diagnostic.code, unit, "{}", diagnostic.message);
        self.items.push(diagnostic);
    }

    pub fn items(&self) -> &[Diagnostic] {
        &self.items
    }

    pub fn with_code(&self, code: DiagnosticCode) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(move |d| d.code == code)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.items.iter().filter(|d| d.severity() == severity).count()
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// One line per diagnostic, then a tally
impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            writeln!(f, "{}", item)?;
        }
        if !self.is_empty() {
            writeln!(f, "{} error(s), {} warning(s)", self.error_count(), self.warning_count())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing_key() -> SchemaError {
        SchemaError::MissingMapKey {
            node: "Member".to_string(),
            key: "id".to_string(),
        }
    }

    #[test]
    fn test_codes_and_severity() {
        assert_eq!(DiagnosticCode::UnresolvedType.as_str(), "E001");
        assert_eq!(DiagnosticCode::MalformedEntry.as_str(), "E007");
        assert_eq!(DiagnosticCode::UnknownDirective.severity(), Severity::Warning);
        assert_eq!(DiagnosticCode::DuplicateKeyField.as_str(), "W002");
        assert_eq!(DiagnosticCode::DuplicateKeyField.severity(), Severity::Warning);
        assert_eq!(DiagnosticCode::InvalidContainer.severity(), Severity::Error);
    }

    #[test]
    fn test_counts() {
        let mut diags = Diagnostics::new();
        diags.report(
            "Player",
            SchemaError::UnresolvedType {
                element: "Player.level".to_string(),
                type_name: "u8".to_string(),
                suggestion: None,
            },
        );
        diags.report(
            "Player",
            SchemaError::UnknownDirective {
                directive: "$unique".to_string(),
            },
        );

        assert_eq!(diags.error_count(), 1);
        assert_eq!(diags.warning_count(), 1);
        assert!(diags.has_errors());
        assert_eq!(diags.with_code(DiagnosticCode::UnresolvedType).count(), 1);
        assert_eq!(diags.items().len(), 2);
    }

    #[test]
    fn test_display_with_path() {
        let mut diags = Diagnostics::new();
        diags.report_at("Guild", "Guild::Member", missing_key());

        let item = &diags.items()[0];
        assert_eq!(item.path.as_deref(), Some("Guild::Member"));
        assert_eq!(
            item.to_string(),
            "E003 error in Guild at Guild::Member: map container 'Member' has no attribute 'id' to use as its key"
        );
        assert!(diags.to_string().ends_with("1 error(s), 0 warning(s)\n"));
    }

    #[test]
    fn test_serializes_as_list() {
        let mut diags = Diagnostics::new();
        diags.report("Guild", missing_key());

        let json = serde_json::to_value(&diags).unwrap();
        assert_eq!(json[0]["code"], "MissingMapKey");
        assert!(json[0].get("path").is_none());
        assert_eq!(Diagnostics::new().to_string(), "");
    }
}
