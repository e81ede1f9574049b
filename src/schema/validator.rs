// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Validation of canonical models against schema definitions.
//!
//! The validator never mutates its input. When the schema permits widening
//! coercions, a new model is built with the widened attributes and returned
//! inside [`ValidatedModel`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{ConvertError, Result};
use crate::model::{Attribute, AttributeLocation, CanonicalModel, DataType, ModelBuilder};

use super::definition::{AttributeRule, CoercionPolicy, SchemaDefinition, Severity};

/// One mismatch between a model and a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Dot path into the model, e.g. `attributes.vertices.grade`
    pub path: String,
    /// Human-readable reason
    pub reason: String,
    pub severity: Severity,
}

impl Violation {
    fn new(path: impl Into<String>, reason: impl Into<String>, severity: Severity) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
            severity,
        }
    }

    /// Check if this violation blocks conversion.
    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Convert into the error reported on a failed job.
    pub fn to_error(&self) -> ConvertError {
        ConvertError::schema_mismatch(self.path.clone(), self.reason.clone())
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.path, self.reason)
    }
}

/// A widening conversion applied during validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coercion {
    pub path: String,
    pub from: DataType,
    pub to: DataType,
}

/// A model that satisfied a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedModel {
    /// The model, with coercions applied
    pub model: CanonicalModel,
    /// Non-blocking violations
    pub warnings: Vec<Violation>,
    /// Coercions applied, in schema rule order
    pub coercions: Vec<Coercion>,
}

/// Outcome of validating one model.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "validation results should be checked for violations"]
pub enum Validation {
    Valid(ValidatedModel),
    /// Every violation found, blocking and non-blocking
    Invalid(Vec<Violation>),
}

impl Validation {
    /// Check if the model is valid.
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid(_))
    }

    /// All recorded violations.
    pub fn violations(&self) -> &[Violation] {
        match self {
            Validation::Valid(v) => &v.warnings,
            Validation::Invalid(v) => v,
        }
    }

    /// Turn into a result; the error is the first blocking violation.
    pub fn into_result(self) -> Result<ValidatedModel> {
        match self {
            Validation::Valid(v) => Ok(v),
            Validation::Invalid(violations) => Err(violations
                .iter()
                .find(|v| v.is_blocking())
                .or_else(|| violations.first())
                .map(Violation::to_error)
                .unwrap_or_else(|| ConvertError::schema_mismatch("", "model is invalid"))),
        }
    }
}

/// Checks models against schema definitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator {
    treat_warnings_as_errors: bool,
    coercion_override: Option<CoercionPolicy>,
}

impl SchemaValidator {
    /// Create a validator with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Escalate warning-level violations to errors.
    pub fn treat_warnings_as_errors(mut self, enabled: bool) -> Self {
        self.treat_warnings_as_errors = enabled;
        self
    }

    /// Use `policy` instead of the schema's own coercion policy.
    pub fn with_coercion_override(mut self, policy: Option<CoercionPolicy>) -> Self {
        self.coercion_override = policy;
        self
    }

    /// Validate `model` against `schema`.
    ///
    /// Violations are reported in a fixed order: geometry, CRS, properties,
    /// attribute rules in schema order, then undeclared attributes in model
    /// order.
    pub fn validate(&self, model: &CanonicalModel, schema: &SchemaDefinition) -> Validation {
        let policy = self.coercion_override.unwrap_or(schema.coercion);
        let mut violations = Vec::new();
        let mut coercions = Vec::new();
        let mut replacements: Vec<(AttributeLocation, Attribute)> = Vec::new();

        let kind = model.geometry().kind();
        if kind != schema.geometry {
            violations.push(Violation::new(
                "geometry",
                format!("expected {} geometry, found {kind}", schema.geometry),
                Severity::Error,
            ));
        }
        if let Some(min) = schema.min_elements {
            let count = model.geometry().element_count();
            if count < min {
                violations.push(Violation::new(
                    "geometry",
                    format!("expected at least {min} elements, found {count}"),
                    Severity::Error,
                ));
            }
        }
        if schema.require_crs && !model.crs().is_specified() {
            violations.push(Violation::new(
                "crs",
                "a coordinate reference system is required",
                Severity::Error,
            ));
        }
        for key in &schema.required_properties {
            if model.property(key).is_none() {
                violations.push(Violation::new(
                    format!("properties.{key}"),
                    "required property is missing",
                    Severity::Error,
                ));
            }
        }

        for rule in &schema.attributes {
            let path = format!("attributes.{}.{}", rule.location, rule.name);
            let Some(attribute) = model.attribute(rule.location, &rule.name) else {
                if rule.required {
                    violations.push(Violation::new(
                        &path,
                        missing_reason(model, rule),
                        rule.severity,
                    ));
                }
                continue;
            };

            let found = attribute.data_type();
            let widened;
            let mut checked = attribute;
            if found != rule.data_type {
                match (policy, attribute.values.widen_to(rule.data_type)) {
                    (CoercionPolicy::Widening, Some(values)) => {
                        coercions.push(Coercion {
                            path: path.clone(),
                            from: found,
                            to: rule.data_type,
                        });
                        widened = Attribute {
                            values,
                            ..attribute.clone()
                        };
                        replacements.push((rule.location, widened.clone()));
                        checked = &widened;
                    }
                    _ => {
                        violations.push(Violation::new(
                            &path,
                            format!("expected {}, found {found}", rule.data_type),
                            rule.severity,
                        ));
                        continue;
                    }
                }
            }
            check_values(&path, checked, rule, &mut violations);
        }

        if !schema.allow_additional_attributes {
            for (location, attribute) in model.iter_attributes() {
                let declared = schema
                    .attributes
                    .iter()
                    .any(|r| r.location == location && r.name == attribute.name);
                if !declared {
                    violations.push(Violation::new(
                        format!("attributes.{location}.{}", attribute.name),
                        "attribute is not declared by the schema",
                        Severity::Error,
                    ));
                }
            }
        }

        if self.treat_warnings_as_errors {
            for v in &mut violations {
                v.severity = Severity::Error;
            }
        }

        if violations.iter().any(Violation::is_blocking) {
            return Validation::Invalid(violations);
        }

        let model = if replacements.is_empty() {
            model.clone()
        } else {
            match apply_replacements(model, replacements) {
                Ok(model) => model,
                Err(e) => {
                    violations.push(Violation::new(
                        "attributes",
                        format!("coercion failed: {e}"),
                        Severity::Error,
                    ));
                    return Validation::Invalid(violations);
                }
            }
        };

        Validation::Valid(ValidatedModel {
            model,
            warnings: violations,
            coercions,
        })
    }
}

fn missing_reason(model: &CanonicalModel, rule: &AttributeRule) -> String {
    let elsewhere = model
        .iter_attributes()
        .find(|(_, a)| a.name == rule.name)
        .map(|(loc, _)| loc);
    match elsewhere {
        Some(loc) => format!(
            "required attribute is attached to {loc}, expected {}",
            rule.location
        ),
        None if model.geometry().cardinality(rule.location).is_none() => format!(
            "required attribute is missing; {} geometry has no {}",
            model.geometry().kind(),
            rule.location
        ),
        None => "required attribute is missing".to_string(),
    }
}

fn check_values(path: &str, attribute: &Attribute, rule: &AttributeRule, out: &mut Vec<Violation>) {
    if let Some(expected) = &rule.unit {
        if attribute.unit.as_deref() != Some(expected.as_str()) {
            out.push(Violation::new(
                path,
                format!(
                    "expected unit '{expected}', found '{}'",
                    attribute.unit.as_deref().unwrap_or("")
                ),
                Severity::Warning,
            ));
        }
    }

    if !rule.allow_nan {
        let nans = attribute.values.nan_count();
        if nans > 0 {
            out.push(Violation::new(
                path,
                format!("{nans} NaN values are not permitted"),
                rule.severity,
            ));
        }
    }

    if let (Some([min, max]), Some(values)) = (rule.range, attribute.values.to_f64()) {
        let outside = values
            .iter()
            .filter(|v| v.is_finite() && (**v < min || **v > max))
            .count();
        if outside > 0 {
            out.push(Violation::new(
                path,
                format!("{outside} values outside range [{min}, {max}]"),
                rule.severity,
            ));
        }
    }
}

fn apply_replacements(
    model: &CanonicalModel,
    replacements: Vec<(AttributeLocation, Attribute)>,
) -> Result<CanonicalModel> {
    let mut parts = model.clone().into_parts();
    for (location, replacement) in replacements {
        if let Some(slot) = parts
            .attributes
            .iter_mut()
            .find(|(loc, a)| *loc == location && a.name == replacement.name)
        {
            slot.1 = replacement;
        }
    }
    ModelBuilder::from_parts(parts)?.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttributeValues, Crs, Geometry, GeometryKind};
    use crate::schema::SchemaVersion;

    fn model(values: AttributeValues) -> CanonicalModel {
        let n = values.len();
        ModelBuilder::new("pts")
            .with_geometry(Geometry::PointSet {
                vertices: (0..n).map(|i| [i as f64, 0.0, 0.0]).collect(),
            })
            .unwrap()
            .with_attribute(
                AttributeLocation::Vertices,
                Attribute::new("grade", values).with_unit("g/t"),
            )
            .unwrap()
            .build()
            .unwrap()
    }

    fn schema(rule: AttributeRule) -> SchemaDefinition {
        SchemaDefinition::new("pts", SchemaVersion::new(1, 0, 0), GeometryKind::PointSet)
            .with_rule(rule)
    }

    #[test]
    fn test_valid_model() {
        let m = model(AttributeValues::Float64(vec![1.0, 2.0]));
        let s = schema(AttributeRule::required(
            "grade",
            AttributeLocation::Vertices,
            DataType::Float64,
        ));
        let result = SchemaValidator::new().validate(&m, &s);
        match result {
            Validation::Valid(v) => {
                assert_eq!(v.model, m);
                assert!(v.warnings.is_empty());
                assert!(v.coercions.is_empty());
            }
            Validation::Invalid(v) => panic!("unexpected violations: {v:?}"),
        }
    }

    #[test]
    fn test_missing_required_attribute() {
        let m = model(AttributeValues::Float64(vec![1.0]));
        let s = schema(AttributeRule::required(
            "density",
            AttributeLocation::Vertices,
            DataType::Float64,
        ));
        let violations = SchemaValidator::new().validate(&m, &s).violations().to_vec();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "attributes.vertices.density");
        assert!(violations[0].is_blocking());
    }

    #[test]
    fn test_widening_only_with_policy() {
        let m = model(AttributeValues::Int32(vec![1, 2]));
        let rule = AttributeRule::required("grade", AttributeLocation::Vertices, DataType::Float64);

        let strict = SchemaValidator::new().validate(&m, &schema(rule.clone()));
        assert!(!strict.is_valid());

        let lenient = SchemaValidator::new()
            .validate(&m, &schema(rule).with_coercion(CoercionPolicy::Widening));
        let v = lenient.into_result().unwrap();
        assert_eq!(v.coercions.len(), 1);
        assert_eq!(v.coercions[0].from, DataType::Int32);
        assert_eq!(
            v.model
                .attribute(AttributeLocation::Vertices, "grade")
                .unwrap()
                .values,
            AttributeValues::Float64(vec![1.0, 2.0])
        );
        // input untouched
        assert_eq!(
            m.attribute(AttributeLocation::Vertices, "grade").unwrap().data_type(),
            DataType::Int32
        );
    }

    #[test]
    fn test_narrowing_never_performed() {
        let m = model(AttributeValues::Float64(vec![1.0]));
        let s = schema(AttributeRule::required(
            "grade",
            AttributeLocation::Vertices,
            DataType::Float32,
        ))
        .with_coercion(CoercionPolicy::Widening);
        assert!(!SchemaValidator::new().validate(&m, &s).is_valid());
    }

    #[test]
    fn test_warning_does_not_block() {
        let m = model(AttributeValues::Float64(vec![1.0]));
        let s = schema(
            AttributeRule::required("grade", AttributeLocation::Vertices, DataType::Float64)
                .with_unit("ppm"),
        );
        let result = SchemaValidator::new().validate(&m, &s);
        assert!(result.is_valid());
        assert_eq!(result.violations()[0].severity, Severity::Warning);

        let strict = SchemaValidator::new()
            .treat_warnings_as_errors(true)
            .validate(&m, &s);
        assert!(!strict.is_valid());
    }

    #[test]
    fn test_range_and_nan() {
        let m = model(AttributeValues::Float64(vec![0.5, 7.0, f64::NAN]));
        let s = schema(
            AttributeRule::required("grade", AttributeLocation::Vertices, DataType::Float64)
                .with_unit("g/t")
                .with_range(0.0, 5.0)
                .without_nan(),
        );
        let violations = SchemaValidator::new().validate(&m, &s).violations().to_vec();
        assert_eq!(violations.len(), 2);
        assert!(violations[0].reason.contains("NaN"));
        assert!(violations[1].reason.contains("1 values outside"));
    }

    #[test]
    fn test_geometry_crs_and_additional() {
        let m = model(AttributeValues::Float64(vec![1.0]));
        let mut s = SchemaDefinition::new("grid", SchemaVersion::new(1, 0, 0), GeometryKind::Grid)
            .requiring_crs();
        s.allow_additional_attributes = false;
        let violations = SchemaValidator::new().validate(&m, &s).violations().to_vec();
        let paths: Vec<_> = violations.iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths, vec!["geometry", "crs", "attributes.vertices.grade"]);

        let with_crs = ModelBuilder::from_parts(m.into_parts())
            .unwrap()
            .with_crs(Crs::Epsg(32633))
            .build()
            .unwrap();
        let violations = SchemaValidator::new().validate(&with_crs, &s).violations().to_vec();
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn test_deterministic() {
        let m = model(AttributeValues::Int64(vec![1, 2]));
        let s = schema(AttributeRule::required(
            "grade",
            AttributeLocation::Vertices,
            DataType::Float64,
        ))
        .with_rule(AttributeRule::required(
            "au",
            AttributeLocation::Vertices,
            DataType::Float64,
        ));
        let a = SchemaValidator::new().validate(&m, &s);
        let b = SchemaValidator::new().validate(&m, &s);
        assert_eq!(a, b);
        assert_eq!(a.violations().len(), 2);
    }
}
