// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # Geocodec
//!
//! Geoscience data conversion library for point sets, meshes, grids, and
//! well logs.
//!
//! Every format is read into one canonical, strongly typed model, checked
//! against an externally defined schema, and written back out:
//! - **Canonical model** in [`model`](crate::model)
//! - **Format adapters** and detection in [`io`](crate::io)
//! - **Schema validation** in [`schema`](crate::schema)
//! - **Transforms** for attribute renaming and unit conversion in [`transform`](crate::transform)
//! - **Orchestration** and the object-store gateway in [`convert`](crate::convert)
//!
//! ## Architecture
//!
//! - `model/` - Canonical model, geometry, attributes, CRS, provenance
//! - `io/formats/` - csv-points, OBJ, LAS, ESRI ASCII, native binary container
//! - `io/registry.rs` - Immutable adapter registry and detection
//! - `schema/` - Schema definitions, catalog, and validator
//! - `transform/` - Model transformations run between validation passes
//! - `convert/` - Job state machine, orchestrator, config, gateway
//!
//! ## Example: Converting a file
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use geocodec::convert::{ConversionRequest, Orchestrator};
//!
//! let report = Orchestrator::default().convert(&ConversionRequest::new("well.las", "well.gcb"));
//! let report = report.into_result()?;
//! println!("{:?}", report.output_path());
//! # Ok(())
//! # }
//! ```
//!
//! ## Example: Validating against a schema
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use geocodec::io::{global_registry, CancellationToken, SourceHandle};
//! use geocodec::schema::{SchemaDefinition, SchemaValidator};
//!
//! let schema = SchemaDefinition::from_path("schemas/collars.toml")?;
//! let source = SourceHandle::open("collars.csv")?;
//! let model = global_registry()
//!     .lookup("csv-points")?
//!     .read(&source, &CancellationToken::new())?;
//! for violation in SchemaValidator::new().validate(&model, &schema).violations() {
//!     println!("{violation}");
//! }
//! # Ok(())
//! # }
//! ```

// Core types
pub mod core;

// Re-export core types for convenience
pub use core::{Compression, ConvertError, Location, Result};

// Canonical model
pub mod model;

pub use model::{
    Attribute, AttributeLocation, AttributeValues, CanonicalModel, Crs, DataType, Geometry,
    ModelBuilder,
};

// Schema definitions and validation
pub mod schema;

pub use schema::{SchemaDefinition, SchemaValidator, Validation};

// I/O (adapters, detection, registry)
pub mod io;

pub use io::{global_registry, ConverterRegistry, FormatAdapter, RegistryBuilder};

// Model transformations
pub mod transform;

pub use transform::{MultiTransform, TransformBuilder, TransformError};

// Conversion orchestration
pub mod convert;

pub use convert::{ConversionReport, ConversionRequest, ConvertOptions, JobState, Orchestrator};
