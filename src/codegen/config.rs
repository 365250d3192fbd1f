//! Render Profile
//!
//! Everything about emitted code that is a rendering choice rather than a
//! schema fact: runtime crate paths, module layout, container types, derives,
//! proto package and table options.
//!
//! Key principle: models are profile-free. Only emission reads the profile.
//!
//! Module path settings may contain `{unit}`, replaced by the snake_case schema
//! unit name (`Player` → `player`).

use serde::{Deserialize, Serialize};

use super::names::snake_case;

/// Placeholder replaced by the unit's module name in path templates
pub const UNIT_PLACEHOLDER: &str = "{unit}";

/// Associative container used for map children of tree nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MapContainer {
    /// Ordered by key; write order is key order
    #[default]
    BTreeMap,
    HashMap,
}

impl MapContainer {
    pub fn type_name(&self) -> &'static str {
        match self {
            MapContainer::BTreeMap => "BTreeMap",
            MapContainer::HashMap => "HashMap",
        }
    }
}

/// Rust rendering configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderProfile {
    /// Crate providing `Query`, `Row`, `Column`, `DecodeError`,
    /// `StorageDescriptor` and `FixedText`
    pub storage_runtime: String,

    /// Crate providing the document `Element` used by marshal code
    pub document_runtime: String,

    /// Where generated record types live, as seen from sibling artifacts
    pub record_module: String,

    /// Where prost-generated messages live, as seen from glue code
    pub proto_module: String,

    /// `package` of emitted `.proto` files
    pub proto_package: String,

    pub map_container: MapContainer,

    /// Derives on every generated record struct
    pub derives: Vec<String>,

    /// Appended after the closing parenthesis of `CREATE TABLE`
    pub table_options: String,
}

impl Default for RenderProfile {
    fn default() -> Self {
        Self {
            storage_runtime: "storage_runtime".to_string(),
            document_runtime: "document_runtime".to_string(),
            record_module: "super::{unit}".to_string(),
            proto_module: "crate::proto::{unit}".to_string(),
            proto_package: "schema".to_string(),
            map_container: MapContainer::default(),
            derives: vec!["Debug".to_string(), "Clone".to_string(), "PartialEq".to_string()],
            table_options: "ENGINE=InnoDB DEFAULT CHARSET=utf8mb4".to_string(),
        }
    }
}

impl RenderProfile {
    /// Record module path for a unit
    pub fn record_module_for(&self, unit: &str) -> String {
        expand(&self.record_module, unit)
    }

    /// Proto message module path for a unit
    pub fn proto_module_for(&self, unit: &str) -> String {
        expand(&self.proto_module, unit)
    }

    /// `#[derive(...)]` line, or nothing when no derives are configured
    pub fn derive_attribute(&self) -> Option<String> {
        if self.derives.is_empty() {
            None
        } else {
            Some(format!("#[derive({})]", self.derives.join(", ")))
        }
    }
}

fn expand(template: &str, unit: &str) -> String {
    template.replace(UNIT_PLACEHOLDER, &snake_case(unit))
}
