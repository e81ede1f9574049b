// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Typed attribute arrays attached to geometry elements.
//!
//! Attribute values are stored as one contiguous typed array per attribute.
//! The array length always equals the cardinality of the geometry location
//! the attribute is attached to; that invariant is enforced by
//! [`ModelBuilder`](super::ModelBuilder).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{ConvertError, Result};

/// Code used for missing categorical values.
pub const CATEGORY_NULL: i32 = -1;

/// Geometry element an attribute is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeLocation {
    /// Points or grid corner nodes
    Vertices,
    /// Line segments
    Segments,
    /// Triangles
    Faces,
    /// Grid cells
    Cells,
    /// Well log samples
    Samples,
}

impl AttributeLocation {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeLocation::Vertices => "vertices",
            AttributeLocation::Segments => "segments",
            AttributeLocation::Faces => "faces",
            AttributeLocation::Cells => "cells",
            AttributeLocation::Samples => "samples",
        }
    }
}

impl fmt::Display for AttributeLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AttributeLocation {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "vertices" | "points" | "nodes" => Ok(AttributeLocation::Vertices),
            "segments" => Ok(AttributeLocation::Segments),
            "faces" | "triangles" => Ok(AttributeLocation::Faces),
            "cells" => Ok(AttributeLocation::Cells),
            "samples" => Ok(AttributeLocation::Samples),
            other => Err(ConvertError::config(format!(
                "unknown attribute location '{other}'"
            ))),
        }
    }
}

/// Element type of an attribute array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Boolean flag
    Bool,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 32-bit float, NaN marks a missing value
    Float32,
    /// 64-bit float, NaN marks a missing value
    Float64,
    /// Integer code into a label lookup table
    Categorical,
    /// UTF-8 text
    String,
}

impl DataType {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
            DataType::Categorical => "categorical",
            DataType::String => "string",
        }
    }

    /// Whether values of this type can be converted to `target` without
    /// losing precision.
    pub fn widens_to(&self, target: DataType) -> bool {
        matches!(
            (self, target),
            (DataType::Int32, DataType::Int64)
                | (DataType::Int32, DataType::Float64)
                | (DataType::Float32, DataType::Float64)
        )
    }

    /// Check if this is a numeric type.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Int32 | DataType::Int64 | DataType::Float32 | DataType::Float64
        )
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DataType {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "bool" | "boolean" => Ok(DataType::Bool),
            "int32" | "i32" => Ok(DataType::Int32),
            "int64" | "i64" | "int" | "integer" => Ok(DataType::Int64),
            "float32" | "f32" => Ok(DataType::Float32),
            "float64" | "f64" | "float" | "double" => Ok(DataType::Float64),
            "categorical" | "category" => Ok(DataType::Categorical),
            "string" | "str" | "text" => Ok(DataType::String),
            other => Err(ConvertError::config(format!("unknown data type '{other}'"))),
        }
    }
}

/// Typed attribute values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum AttributeValues {
    /// Boolean flags
    Bool(Vec<bool>),
    /// 32-bit signed integers
    Int32(Vec<i32>),
    /// 64-bit signed integers
    Int64(Vec<i64>),
    /// 32-bit floats
    Float32(Vec<f32>),
    /// 64-bit floats
    Float64(Vec<f64>),
    /// Integer codes with a code → label lookup table
    Categorical {
        /// One code per element, [`CATEGORY_NULL`] when missing
        codes: Vec<i32>,
        /// Label of each code
        lookup: BTreeMap<i32, String>,
    },
    /// UTF-8 strings
    String(Vec<String>),
}

impl AttributeValues {
    /// Number of values.
    pub fn len(&self) -> usize {
        match self {
            AttributeValues::Bool(v) => v.len(),
            AttributeValues::Int32(v) => v.len(),
            AttributeValues::Int64(v) => v.len(),
            AttributeValues::Float32(v) => v.len(),
            AttributeValues::Float64(v) => v.len(),
            AttributeValues::Categorical { codes, .. } => codes.len(),
            AttributeValues::String(v) => v.len(),
        }
    }

    /// Check if there are no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element type.
    pub fn data_type(&self) -> DataType {
        match self {
            AttributeValues::Bool(_) => DataType::Bool,
            AttributeValues::Int32(_) => DataType::Int32,
            AttributeValues::Int64(_) => DataType::Int64,
            AttributeValues::Float32(_) => DataType::Float32,
            AttributeValues::Float64(_) => DataType::Float64,
            AttributeValues::Categorical { .. } => DataType::Categorical,
            AttributeValues::String(_) => DataType::String,
        }
    }

    /// Build a categorical array from labels, assigning codes by first
    /// appearance. Empty labels map to [`CATEGORY_NULL`].
    pub fn categorical_from_labels<S: AsRef<str>>(labels: &[S]) -> Self {
        let mut by_label: BTreeMap<String, i32> = BTreeMap::new();
        let mut lookup = BTreeMap::new();
        let mut codes = Vec::with_capacity(labels.len());
        for label in labels {
            let label = label.as_ref();
            if label.is_empty() {
                codes.push(CATEGORY_NULL);
                continue;
            }
            let next = by_label.len() as i32;
            let code = *by_label.entry(label.to_string()).or_insert_with(|| {
                lookup.insert(next, label.to_string());
                next
            });
            codes.push(code);
        }
        AttributeValues::Categorical { codes, lookup }
    }

    /// Numeric values as f64, `None` for non-numeric types.
    pub fn to_f64(&self) -> Option<Vec<f64>> {
        match self {
            AttributeValues::Int32(v) => Some(v.iter().map(|&x| x as f64).collect()),
            AttributeValues::Int64(v) => Some(v.iter().map(|&x| x as f64).collect()),
            AttributeValues::Float32(v) => Some(v.iter().map(|&x| x as f64).collect()),
            AttributeValues::Float64(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// Value at `index` rendered as text; categorical codes resolve to labels.
    pub fn display_value(&self, index: usize) -> Option<String> {
        Some(match self {
            AttributeValues::Bool(v) => v.get(index)?.to_string(),
            AttributeValues::Int32(v) => v.get(index)?.to_string(),
            AttributeValues::Int64(v) => v.get(index)?.to_string(),
            AttributeValues::Float32(v) => v.get(index)?.to_string(),
            AttributeValues::Float64(v) => v.get(index)?.to_string(),
            AttributeValues::Categorical { codes, lookup } => {
                let code = codes.get(index)?;
                lookup.get(code).cloned().unwrap_or_default()
            }
            AttributeValues::String(v) => v.get(index)?.clone(),
        })
    }

    /// Convert to a wider type without loss of precision.
    ///
    /// Returns `None` when `target` is not a widening of the current type.
    pub fn widen_to(&self, target: DataType) -> Option<AttributeValues> {
        if !self.data_type().widens_to(target) {
            return None;
        }
        match (self, target) {
            (AttributeValues::Int32(v), DataType::Int64) => {
                Some(AttributeValues::Int64(v.iter().map(|&x| x as i64).collect()))
            }
            (AttributeValues::Int32(v), DataType::Float64) => {
                Some(AttributeValues::Float64(v.iter().map(|&x| x as f64).collect()))
            }
            (AttributeValues::Float32(v), DataType::Float64) => {
                Some(AttributeValues::Float64(v.iter().map(|&x| x as f64).collect()))
            }
            _ => None,
        }
    }

    /// Count of NaN values in floating point arrays.
    pub fn nan_count(&self) -> usize {
        match self {
            AttributeValues::Float32(v) => v.iter().filter(|x| x.is_nan()).count(),
            AttributeValues::Float64(v) => v.iter().filter(|x| x.is_nan()).count(),
            _ => 0,
        }
    }

    /// Minimum and maximum of finite numeric values.
    pub fn finite_range(&self) -> Option<(f64, f64)> {
        let values = self.to_f64()?;
        values
            .into_iter()
            .filter(|x| x.is_finite())
            .fold(None, |acc, x| match acc {
                None => Some((x, x)),
                Some((lo, hi)) => Some((lo.min(x), hi.max(x))),
            })
    }

    fn check(&self, path: &str) -> Result<()> {
        if let AttributeValues::Categorical { codes, lookup } = self {
            if let Some((i, code)) = codes
                .iter()
                .enumerate()
                .find(|(_, c)| **c != CATEGORY_NULL && !lookup.contains_key(c))
            {
                return Err(ConvertError::schema_mismatch(
                    format!("{path}[{i}]"),
                    format!("categorical code {code} has no lookup entry"),
                ));
            }
        }
        Ok(())
    }
}

/// A named attribute array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name, unique within its collection
    pub name: String,
    /// Unit of measure (e.g. "g/t", "ohm.m")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Free-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Values, one per element
    pub values: AttributeValues,
}

impl Attribute {
    /// Create a new attribute.
    pub fn new(name: impl Into<String>, values: AttributeValues) -> Self {
        Self {
            name: name.into(),
            unit: None,
            description: None,
            values,
        }
    }

    /// Set the unit.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if there are no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Element type.
    pub fn data_type(&self) -> DataType {
        self.values.data_type()
    }
}

/// Attributes attached to one geometry location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeCollection {
    location: AttributeLocation,
    attributes: Vec<Attribute>,
}

impl AttributeCollection {
    pub(crate) fn new(location: AttributeLocation) -> Self {
        Self {
            location,
            attributes: Vec::new(),
        }
    }

    /// Location these attributes are attached to.
    pub fn location(&self) -> AttributeLocation {
        self.location
    }

    /// Look up an attribute by name.
    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Check if an attribute exists.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate attributes in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.attributes.iter()
    }

    /// Attribute names in insertion order.
    pub fn names(&self) -> Vec<&str> {
        self.attributes.iter().map(|a| a.name.as_str()).collect()
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Check if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Append an attribute, enforcing name uniqueness and length.
    pub(crate) fn push(&mut self, attribute: Attribute, cardinality: usize) -> Result<()> {
        let path = format!("attributes.{}.{}", self.location, attribute.name);
        if attribute.name.trim().is_empty() {
            return Err(ConvertError::schema_mismatch(path, "attribute name is empty"));
        }
        if self.contains(&attribute.name) {
            return Err(ConvertError::schema_mismatch(
                path,
                "attribute name already used at this location",
            ));
        }
        if attribute.len() != cardinality {
            return Err(ConvertError::schema_mismatch(
                path,
                format!(
                    "attribute length {} does not match {} {}",
                    attribute.len(),
                    cardinality,
                    self.location
                ),
            ));
        }
        attribute.values.check(&path)?;
        self.attributes.push(attribute);
        Ok(())
    }

    pub(crate) fn into_attributes(self) -> Vec<Attribute> {
        self.attributes
    }
}

impl<'a> IntoIterator for &'a AttributeCollection {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.attributes.iter()
    }
}
