// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Canonical object model.
//!
//! Every format adapter reads into and writes from [`CanonicalModel`]:
//! - [`Geometry`] - point sets, line sets, surfaces, grids, and well logs
//! - [`AttributeCollection`] - typed arrays attached to geometry elements
//! - [`Crs`] - spatial reference carried through conversions unchanged
//! - [`Provenance`] - source format, timestamp, units, and lineage
//!
//! Models are built with [`ModelBuilder`] and are immutable once sealed.

pub mod attribute;
pub mod builder;
pub mod crs;
pub mod geometry;
pub mod object;
pub mod provenance;

pub use attribute::{
    Attribute, AttributeCollection, AttributeLocation, AttributeValues, DataType, CATEGORY_NULL,
};
pub use builder::ModelBuilder;
pub use crs::Crs;
pub use geometry::{BoundingBox, Geometry, GeometryKind, Point3, RegularGrid, WellTrajectory};
pub use object::{CanonicalModel, ModelParts};
pub use provenance::{LengthUnit, Provenance, UnitConversion};
