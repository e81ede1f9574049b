// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Incremental construction of canonical models.
//!
//! Every append is checked against the current geometry, so an invalid
//! model can never be sealed.
//!
//! # Example
//!
//! ```rust
//! use geocodec::model::{Attribute, AttributeLocation, AttributeValues, Geometry, ModelBuilder};
//!
//! let model = ModelBuilder::new("collars")
//!     .with_geometry(Geometry::PointSet {
//!         vertices: vec![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]],
//!     })?
//!     .with_attribute(
//!         AttributeLocation::Vertices,
//!         Attribute::new("grade", AttributeValues::Float64(vec![0.5, 1.5])),
//!     )?
//!     .build()?;
//! assert_eq!(model.element_count(AttributeLocation::Vertices), Some(2));
//! # Ok::<(), geocodec::ConvertError>(())
//! ```

use std::collections::BTreeMap;

use crate::core::{ConvertError, Result};

use super::attribute::{Attribute, AttributeCollection, AttributeLocation};
use super::crs::Crs;
use super::geometry::Geometry;
use super::object::{CanonicalModel, ModelParts};
use super::provenance::Provenance;

/// Builder that enforces geometry/attribute invariants at each step.
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    name: String,
    description: Option<String>,
    geometry: Option<Geometry>,
    collections: Vec<AttributeCollection>,
    crs: Crs,
    provenance: Option<Provenance>,
    properties: BTreeMap<String, String>,
}

impl ModelBuilder {
    /// Create a new builder for a model called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            geometry: None,
            collections: Vec::new(),
            crs: Crs::Unspecified,
            provenance: None,
            properties: BTreeMap::new(),
        }
    }

    /// Rebuild from parts, re-running every check.
    pub fn from_parts(parts: ModelParts) -> Result<Self> {
        let ModelParts {
            name,
            description,
            geometry,
            attributes,
            crs,
            provenance,
            properties,
        } = parts;

        let mut builder = ModelBuilder::new(name).with_geometry(geometry)?;
        builder.description = description;
        builder.crs = crs;
        builder.provenance = Some(provenance);
        builder.properties = properties;
        for (location, attribute) in attributes {
            builder.add_attribute(location, attribute)?;
        }
        Ok(builder)
    }

    /// Set the geometry.
    ///
    /// Topology is checked, and attributes already added must still match
    /// the new geometry's cardinalities.
    pub fn set_geometry(&mut self, geometry: Geometry) -> Result<()> {
        geometry.check()?;
        for collection in &self.collections {
            let location = collection.location();
            let expected = geometry.cardinality(location).ok_or_else(|| {
                ConvertError::schema_mismatch(
                    format!("attributes.{location}"),
                    format!("{} geometry has no {location}", geometry.kind()),
                )
            })?;
            if let Some(attr) = collection.iter().find(|a| a.len() != expected) {
                return Err(ConvertError::schema_mismatch(
                    format!("attributes.{location}.{}", attr.name),
                    format!(
                        "attribute length {} does not match {expected} {location}",
                        attr.len()
                    ),
                ));
            }
        }
        self.geometry = Some(geometry);
        Ok(())
    }

    /// Set the geometry (by-value form of [`set_geometry`](Self::set_geometry)).
    pub fn with_geometry(mut self, geometry: Geometry) -> Result<Self> {
        self.set_geometry(geometry)?;
        Ok(self)
    }

    /// Append an attribute at `location`.
    ///
    /// Fails with `SchemaMismatch` when no geometry is set, the geometry has
    /// no such location, the length differs from the location's
    /// cardinality, or the name is already taken there.
    pub fn add_attribute(&mut self, location: AttributeLocation, attribute: Attribute) -> Result<()> {
        let geometry = self.geometry.as_ref().ok_or_else(|| {
            ConvertError::schema_mismatch(
                format!("attributes.{location}.{}", attribute.name),
                "geometry must be set before attributes",
            )
        })?;
        let cardinality = geometry.cardinality(location).ok_or_else(|| {
            ConvertError::schema_mismatch(
                format!("attributes.{location}.{}", attribute.name),
                format!("{} geometry has no {location}", geometry.kind()),
            )
        })?;

        let index = match self
            .collections
            .iter()
            .position(|c| c.location() == location)
        {
            Some(index) => index,
            None => {
                self.collections.push(AttributeCollection::new(location));
                self.collections.sort_by_key(|c| c.location());
                self.collections
                    .iter()
                    .position(|c| c.location() == location)
                    .unwrap_or_default()
            }
        };
        let result = self.collections[index].push(attribute, cardinality);
        if self.collections[index].is_empty() {
            self.collections.remove(index);
        }
        result
    }

    /// Append an attribute (by-value form of [`add_attribute`](Self::add_attribute)).
    pub fn with_attribute(mut self, location: AttributeLocation, attribute: Attribute) -> Result<Self> {
        self.add_attribute(location, attribute)?;
        Ok(self)
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the coordinate reference system.
    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = crs;
        self
    }

    /// Set the provenance.
    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = Some(provenance);
        self
    }

    /// Set a free-form property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Set a free-form property in place.
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Current geometry, if set.
    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    /// Seal the model.
    pub fn build(self) -> Result<CanonicalModel> {
        let geometry = self
            .geometry
            .ok_or_else(|| ConvertError::schema_mismatch("geometry", "model has no geometry"))?;
        Ok(CanonicalModel::sealed(
            self.name,
            self.description,
            geometry,
            self.collections,
            self.crs,
            self.provenance.unwrap_or_default(),
            self.properties,
        ))
    }
}
