// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! The sealed canonical model.

use std::collections::BTreeMap;

use super::attribute::{Attribute, AttributeCollection, AttributeLocation};
use super::crs::Crs;
use super::geometry::{BoundingBox, Geometry};
use super::provenance::Provenance;

/// Format-independent geoscience object.
///
/// Instances are only created through [`ModelBuilder`](super::ModelBuilder)
/// and cannot be modified afterwards. Transforms take a model apart with
/// [`into_parts`](Self::into_parts) and build a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalModel {
    name: String,
    description: Option<String>,
    geometry: Geometry,
    collections: Vec<AttributeCollection>,
    crs: Crs,
    provenance: Provenance,
    properties: BTreeMap<String, String>,
}

/// Owned pieces of a canonical model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParts {
    pub name: String,
    pub description: Option<String>,
    pub geometry: Geometry,
    /// Attributes with their locations, in collection order
    pub attributes: Vec<(AttributeLocation, Attribute)>,
    pub crs: Crs,
    pub provenance: Provenance,
    pub properties: BTreeMap<String, String>,
}

impl CanonicalModel {
    pub(crate) fn sealed(
        name: String,
        description: Option<String>,
        geometry: Geometry,
        collections: Vec<AttributeCollection>,
        crs: Crs,
        provenance: Provenance,
        properties: BTreeMap<String, String>,
    ) -> Self {
        Self {
            name,
            description,
            geometry,
            collections,
            crs,
            provenance,
            properties,
        }
    }

    /// Model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Model description.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Geometry descriptor.
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// All attribute collections, ordered by location.
    pub fn collections(&self) -> &[AttributeCollection] {
        &self.collections
    }

    /// Attribute collection at `location`, if any attributes are attached there.
    pub fn attributes(&self, location: AttributeLocation) -> Option<&AttributeCollection> {
        self.collections.iter().find(|c| c.location() == location)
    }

    /// Look up one attribute.
    pub fn attribute(&self, location: AttributeLocation, name: &str) -> Option<&Attribute> {
        self.attributes(location).and_then(|c| c.get(name))
    }

    /// Iterate every attribute with its location.
    pub fn iter_attributes(&self) -> impl Iterator<Item = (AttributeLocation, &Attribute)> {
        self.collections
            .iter()
            .flat_map(|c| c.iter().map(move |a| (c.location(), a)))
    }

    /// Total number of attributes.
    pub fn attribute_count(&self) -> usize {
        self.collections.iter().map(|c| c.len()).sum()
    }

    /// Coordinate reference system.
    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    /// Provenance metadata.
    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    /// Free-form properties.
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Look up a property.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Number of elements at a location.
    pub fn element_count(&self, location: AttributeLocation) -> Option<usize> {
        self.geometry.cardinality(location)
    }

    /// Bounding box of the geometry.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::of(&self.geometry)
    }

    /// Take the model apart.
    pub fn into_parts(self) -> ModelParts {
        let attributes = self
            .collections
            .into_iter()
            .flat_map(|c| {
                let location = c.location();
                c.into_attributes().into_iter().map(move |a| (location, a))
            })
            .collect();
        ModelParts {
            name: self.name,
            description: self.description,
            geometry: self.geometry,
            attributes,
            crs: self.crs,
            provenance: self.provenance,
            properties: self.properties,
        }
    }
}
