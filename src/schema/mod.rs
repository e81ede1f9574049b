// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Schema definitions and validation.
//!
//! This module provides:
//! - [`SchemaDefinition`] - versioned structural contracts (JSON or TOML)
//! - [`SchemaValidator`] - pure, deterministic model validation
//! - [`SchemaCatalog`] - in-memory lookup by id and version

pub mod catalog;
pub mod definition;
pub mod validator;

pub use catalog::{SchemaCatalog, SchemaProvider};
pub use definition::{AttributeRule, CoercionPolicy, SchemaDefinition, SchemaVersion, Severity};
pub use validator::{Coercion, SchemaValidator, ValidatedModel, Validation, Violation};
