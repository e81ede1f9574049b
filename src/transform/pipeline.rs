// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Transformation pipeline for applying multiple transforms in sequence.

use std::fmt;

use tracing::debug;

use super::{ModelTransform, TransformError};
use crate::model::{CanonicalModel, ModelBuilder, ModelParts};

/// Multi-transform that applies multiple transforms in sequence.
///
/// Transforms are applied in the order they were added. Each transform
/// receives the output of the previous transform, and its name is appended
/// to the provenance lineage once it has run.
///
/// # Example
///
/// ```no_run
/// use geocodec::model::LengthUnit;
/// use geocodec::transform::{AttributeRenameTransform, MultiTransform, UnitConversionTransform};
///
/// let mut rename = AttributeRenameTransform::new();
/// rename.add_mapping("AU_PPM", "au");
///
/// let mut pipeline = MultiTransform::new();
/// pipeline.add_transform(Box::new(rename));
/// pipeline.add_transform(Box::new(UnitConversionTransform::new(LengthUnit::Metre)));
///
/// // pipeline.validate(&model)?;
/// // let model = pipeline.apply(model)?;
/// ```
pub struct MultiTransform {
    transforms: Vec<Box<dyn ModelTransform>>,
}

impl Clone for MultiTransform {
    fn clone(&self) -> Self {
        Self {
            transforms: self.transforms.iter().map(|t| t.box_clone()).collect(),
        }
    }
}

impl fmt::Debug for MultiTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiTransform")
            .field("transforms", &self.names())
            .finish()
    }
}

impl Default for MultiTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiTransform {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self {
            transforms: Vec::new(),
        }
    }

    /// Add a transform to the pipeline.
    pub fn add_transform(&mut self, transform: Box<dyn ModelTransform>) {
        self.transforms.push(transform);
    }

    /// Get the number of transforms in the pipeline.
    pub fn transform_count(&self) -> usize {
        self.transforms.len()
    }

    /// Check if the pipeline is empty.
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Names of the configured transforms, in order.
    pub fn names(&self) -> Vec<String> {
        self.transforms.iter().map(|t| t.name()).collect()
    }

    /// Validate every transform against the model.
    pub fn validate(&self, model: &CanonicalModel) -> std::result::Result<(), TransformError> {
        for transform in &self.transforms {
            transform.validate(model)?;
        }
        Ok(())
    }

    /// Apply all transforms in order.
    pub fn apply(&self, model: CanonicalModel) -> std::result::Result<CanonicalModel, TransformError> {
        let mut current = model;
        for transform in &self.transforms {
            let name = transform.name();
            debug!(transform = %name, "Applying transform");
            current = transform.apply(current)?;
            let mut parts = current.into_parts();
            parts.provenance.lineage.push(name.clone());
            current = rebuild(parts, &name)?;
        }
        Ok(current)
    }
}

/// Seal transformed parts, re-running the builder checks.
pub(crate) fn rebuild(
    parts: ModelParts,
    transform: &str,
) -> std::result::Result<CanonicalModel, TransformError> {
    ModelBuilder::from_parts(parts)
        .and_then(ModelBuilder::build)
        .map_err(|e| TransformError::Rebuild {
            transform: transform.to_string(),
            reason: e.to_string(),
        })
}
