// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Versioned schema definitions.
//!
//! Schema definitions are owned by an external registry; geocodec only
//! deserializes them (JSON or TOML) and treats them as immutable input.
//!
//! ```json
//! {
//!   "id": "objects/pointset",
//!   "version": "1.2.0",
//!   "geometry": "point-set",
//!   "require_crs": true,
//!   "coercion": "widening",
//!   "attributes": [
//!     { "name": "grade", "location": "vertices", "data_type": "float64", "required": true }
//!   ]
//! }
//! ```

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{ConvertError, Result};
use crate::model::{AttributeLocation, DataType, GeometryKind};

/// Semantic version of a schema definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SchemaVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl SchemaVersion {
    /// Create a version.
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl std::str::FromStr for SchemaVersion {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.trim().trim_start_matches('v').split('.');
        let mut next = |name: &str| -> Result<u32> {
            match parts.next() {
                None => Ok(0),
                Some(p) => p.parse::<u32>().map_err(|_| {
                    ConvertError::config(format!("invalid {name} version component in '{s}'"))
                }),
            }
        };
        let major = next("major")?;
        let minor = next("minor")?;
        let patch = next("patch")?;
        if parts.next().is_some() {
            return Err(ConvertError::config(format!("invalid schema version '{s}'")));
        }
        Ok(SchemaVersion::new(major, minor, patch))
    }
}

impl TryFrom<String> for SchemaVersion {
    type Error = ConvertError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SchemaVersion> for String {
    fn from(value: SchemaVersion) -> Self {
        value.to_string()
    }
}

/// Severity of a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks the conversion
    #[default]
    Error,
    /// Recorded but does not block
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// Type coercions a schema permits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoercionPolicy {
    /// Types must match exactly
    #[default]
    None,
    /// Lossless widening (int32 → int64, int32/float32 → float64)
    Widening,
}

/// Contract for one attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeRule {
    /// Attribute name
    pub name: String,
    /// Location the attribute must be attached to
    pub location: AttributeLocation,
    /// Expected element type
    pub data_type: DataType,
    /// Whether the attribute must be present
    #[serde(default)]
    pub required: bool,
    /// Severity of violations of this rule
    #[serde(default)]
    pub severity: Severity,
    /// Expected unit; a differing unit is a warning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Inclusive range finite values must fall into
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<[f64; 2]>,
    /// Whether NaN values are permitted
    #[serde(default = "default_true")]
    pub allow_nan: bool,
}

impl AttributeRule {
    /// Create a required rule with error severity.
    pub fn required(name: impl Into<String>, location: AttributeLocation, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            location,
            data_type,
            required: true,
            severity: Severity::Error,
            unit: None,
            range: None,
            allow_nan: true,
        }
    }

    /// Create an optional rule with error severity.
    pub fn optional(name: impl Into<String>, location: AttributeLocation, data_type: DataType) -> Self {
        Self {
            required: false,
            ..Self::required(name, location, data_type)
        }
    }

    /// Set the severity.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Set the expected unit.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Set the value range.
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.range = Some([min, max]);
        self
    }

    /// Forbid NaN values.
    pub fn without_nan(mut self) -> Self {
        self.allow_nan = false;
        self
    }
}

fn default_true() -> bool {
    true
}

/// Structural contract a canonical model must satisfy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDefinition {
    /// Schema identifier
    pub id: String,
    /// Schema version
    pub version: SchemaVersion,
    /// Required geometry kind
    pub geometry: GeometryKind,
    /// Whether a CRS must be specified
    #[serde(default)]
    pub require_crs: bool,
    /// Minimum number of primary geometry elements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_elements: Option<usize>,
    /// Attribute contracts
    #[serde(default)]
    pub attributes: Vec<AttributeRule>,
    /// Whether attributes without a rule are allowed
    #[serde(default = "default_true")]
    pub allow_additional_attributes: bool,
    /// Properties that must be present
    #[serde(default)]
    pub required_properties: Vec<String>,
    /// Permitted type coercions
    #[serde(default)]
    pub coercion: CoercionPolicy,
}

impl SchemaDefinition {
    /// Create a schema with no attribute rules.
    pub fn new(id: impl Into<String>, version: SchemaVersion, geometry: GeometryKind) -> Self {
        Self {
            id: id.into(),
            version,
            geometry,
            require_crs: false,
            min_elements: None,
            attributes: Vec::new(),
            allow_additional_attributes: true,
            required_properties: Vec::new(),
            coercion: CoercionPolicy::None,
        }
    }

    /// Add an attribute rule.
    pub fn with_rule(mut self, rule: AttributeRule) -> Self {
        self.attributes.push(rule);
        self
    }

    /// Set the coercion policy.
    pub fn with_coercion(mut self, coercion: CoercionPolicy) -> Self {
        self.coercion = coercion;
        self
    }

    /// Require a CRS.
    pub fn requiring_crs(mut self) -> Self {
        self.require_crs = true;
        self
    }

    /// Parse from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| ConvertError::config(format!("invalid schema JSON: {e}")))
    }

    /// Parse from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| ConvertError::config(format!("invalid schema TOML: {e}")))
    }

    /// Load from a `.json` or `.toml` file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConvertError::io(format!("reading schema {}", path.display()), &e))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&text),
            _ => Self::from_json_str(&text),
        }
    }

    /// Identifier and version as `id@version`.
    pub fn qualified_name(&self) -> String {
        format!("{}@{}", self.id, self.version)
    }
}
