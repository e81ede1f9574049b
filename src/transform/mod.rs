// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Canonical model transformation system.
//!
//! Transforms take a sealed [`CanonicalModel`] apart, change it, and build
//! a new one. They run between validation passes in a conversion job, and
//! every applied transform is recorded in the model's provenance lineage.
//!
//! # Example
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use geocodec::model::LengthUnit;
//! use geocodec::transform::TransformBuilder;
//!
//! let pipeline = TransformBuilder::new()
//!     .with_attribute_rename("AU_PPM", "au")
//!     .with_attribute_rename_wildcard("assay_*", "*")
//!     .with_length_unit(LengthUnit::Metre)
//!     .build()?;
//!
//! // let model = pipeline.apply(model)?;
//! # Ok(())
//! # }
//! ```

pub mod attribute_rename;
pub mod pipeline;
pub mod unit_conversion;

use std::fmt;

use crate::core::ConvertError;
use crate::model::{CanonicalModel, LengthUnit};

pub use attribute_rename::AttributeRenameTransform;
pub use pipeline::MultiTransform;
pub use unit_conversion::UnitConversionTransform;

/// Error types for transformations.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformError {
    /// Invalid transformation rule
    InvalidRule {
        /// Description of the rule
        rule: String,
        /// Reason why it's invalid
        reason: String,
    },

    /// Source attribute not found in the model
    NotFound {
        /// Name that wasn't found
        name: String,
        /// What kind of item was looked up
        kind: &'static str,
    },

    /// The transformed model violates a model invariant
    Rebuild {
        /// Transform that produced the model
        transform: String,
        /// Builder error description
        reason: String,
    },
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformError::InvalidRule { rule, reason } => {
                write!(f, "Invalid rule '{rule}': {reason}")
            }
            TransformError::NotFound { name, kind } => {
                write!(f, "Cannot rename {kind} '{name}': not found in model")
            }
            TransformError::Rebuild { transform, reason } => {
                write!(f, "Transform '{transform}' produced an invalid model: {reason}")
            }
        }
    }
}

impl std::error::Error for TransformError {}

impl From<TransformError> for ConvertError {
    fn from(err: TransformError) -> Self {
        ConvertError::transform(err.to_string())
    }
}

/// Core transformation trait for canonical models.
///
/// # Example
///
/// ```no_run
/// # use geocodec::model::CanonicalModel;
/// # use geocodec::transform::{ModelTransform, TransformError};
/// #[derive(Clone)]
/// struct Identity;
///
/// impl ModelTransform for Identity {
///     fn name(&self) -> String {
///         "identity".to_string()
///     }
///
///     fn apply(&self, model: CanonicalModel) -> Result<CanonicalModel, TransformError> {
///         Ok(model)
///     }
///
///     fn box_clone(&self) -> Box<dyn ModelTransform> {
///         Box::new(self.clone())
///     }
/// }
/// ```
pub trait ModelTransform: Send + Sync + 'static {
    /// Name recorded in the provenance lineage.
    fn name(&self) -> String;

    /// Check that the transform applies to `model` before running it.
    fn validate(&self, _model: &CanonicalModel) -> std::result::Result<(), TransformError> {
        Ok(())
    }

    /// Produce the transformed model.
    fn apply(&self, model: CanonicalModel) -> std::result::Result<CanonicalModel, TransformError>;

    /// Clone this transform into a boxed trait object.
    ///
    /// This enables cloning of `MultiTransform`, which batch conversion
    /// hands to every job.
    fn box_clone(&self) -> Box<dyn ModelTransform>;
}

/// Builder helper for creating common transformations.
#[derive(Debug, Clone, Default)]
pub struct TransformBuilder {
    attribute_mappings: Vec<(String, String)>,
    /// Wildcard mappings: (pattern, target) where pattern is like "assay_*"
    attribute_wildcards: Vec<(String, String)>,
    length_unit: Option<LengthUnit>,
}

impl TransformBuilder {
    /// Create a new builder with no mappings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an exact attribute rename mapping.
    pub fn with_attribute_rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.attribute_mappings.push((from.into(), to.into()));
        self
    }

    /// Add a wildcard attribute rename mapping.
    ///
    /// The wildcard `*` matches any run of characters. For example:
    /// - `"assay_*"` → `"*"` renames `assay_cu` to `cu`
    pub fn with_attribute_rename_wildcard(
        mut self,
        pattern: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        self.attribute_wildcards.push((pattern.into(), target.into()));
        self
    }

    /// Convert coordinates and depths to `unit`.
    pub fn with_length_unit(mut self, unit: LengthUnit) -> Self {
        self.length_unit = Some(unit);
        self
    }

    /// Check if no transform is configured.
    pub fn is_empty(&self) -> bool {
        self.attribute_mappings.is_empty()
            && self.attribute_wildcards.is_empty()
            && self.length_unit.is_none()
    }

    /// Build a MultiTransform from this builder.
    ///
    /// Renames run before the unit conversion.
    pub fn build(self) -> std::result::Result<MultiTransform, TransformError> {
        let mut pipeline = MultiTransform::new();

        if !self.attribute_mappings.is_empty() || !self.attribute_wildcards.is_empty() {
            let mut rename = AttributeRenameTransform::new();
            for (from, to) in self.attribute_mappings {
                rename.add_mapping(from, to);
            }
            for (pattern, target) in self.attribute_wildcards {
                rename.add_wildcard_mapping(pattern, target)?;
            }
            pipeline.add_transform(Box::new(rename));
        }

        if let Some(unit) = self.length_unit {
            pipeline.add_transform(Box::new(UnitConversionTransform::new(unit)));
        }

        Ok(pipeline)
    }
}
