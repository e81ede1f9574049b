// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Schema validation integration tests.

mod common;

use common::{grade_schema, point_model, temp_dir, well_model, write_fixture, GRADE_SCHEMA_TOML};
use geocodec::model::{
    Attribute, AttributeLocation, AttributeValues, Geometry, GeometryKind, ModelBuilder,
};
use geocodec::schema::{
    AttributeRule, CoercionPolicy, SchemaCatalog, SchemaDefinition, SchemaProvider,
    SchemaValidator, SchemaVersion, Severity, Validation,
};
use geocodec::{ConvertError, DataType};

fn int_points(n: usize) -> geocodec::CanonicalModel {
    ModelBuilder::new("ints")
        .with_geometry(Geometry::PointSet {
            vertices: (0..n).map(|i| [i as f64, 0.0, 0.0]).collect(),
        })
        .unwrap()
        .with_attribute(
            AttributeLocation::Vertices,
            Attribute::new("grade", AttributeValues::Int32((0..n as i32).collect())),
        )
        .unwrap()
        .build()
        .unwrap()
}

#[test]
fn test_schema_file_matches_builder() {
    let dir = temp_dir("schema_file");
    let path = write_fixture(dir.path(), "collars.toml", GRADE_SCHEMA_TOML);
    let loaded = SchemaDefinition::from_path(&path).unwrap();
    assert_eq!(loaded, grade_schema());
}

#[test]
fn test_valid_model_passes_unchanged() {
    let model = point_model(100);
    let validation = SchemaValidator::new().validate(&model, &grade_schema());
    let validated = validation.into_result().unwrap();
    assert_eq!(validated.model, model);
    assert!(validated.warnings.is_empty());
    assert!(validated.coercions.is_empty());
}

#[test]
fn test_validation_is_pure_and_deterministic() {
    let model = well_model();
    let before = model.clone();
    let schema = grade_schema()
        .requiring_crs()
        .with_rule(AttributeRule::required("GR", AttributeLocation::Samples, DataType::Float64));
    let validator = SchemaValidator::new();

    let first = validator.validate(&model, &schema);
    for _ in 0..5 {
        assert_eq!(validator.validate(&model, &schema), first);
    }
    // the input model is left untouched
    assert_eq!(format!("{model:?}"), format!("{before:?}"));

    let paths: Vec<&str> = first.violations().iter().map(|v| v.path.as_str()).collect();
    assert_eq!(paths, vec!["geometry", "crs", "attributes.vertices.grade"]);
}

#[test]
fn test_missing_attribute_is_schema_mismatch() {
    let model = ModelBuilder::new("bare")
        .with_geometry(Geometry::PointSet {
            vertices: vec![[0.0; 3]; 4],
        })
        .unwrap()
        .build()
        .unwrap();
    let err = SchemaValidator::new()
        .validate(&model, &grade_schema())
        .into_result()
        .unwrap_err();
    match err {
        ConvertError::SchemaMismatch { path, .. } => {
            assert_eq!(path, "attributes.vertices.grade");
        }
        other => panic!("expected schema mismatch, got {other:?}"),
    }
}

#[test]
fn test_widening_is_opt_in() {
    let model = int_points(5);

    let strict = SchemaValidator::new().validate(&model, &grade_schema());
    assert!(!strict.is_valid());

    let widened = SchemaValidator::new()
        .validate(&model, &grade_schema().with_coercion(CoercionPolicy::Widening))
        .into_result()
        .unwrap();
    assert_eq!(widened.coercions.len(), 1);
    assert_eq!(widened.coercions[0].from, DataType::Int32);
    assert_eq!(widened.coercions[0].to, DataType::Float64);
    let grade = widened
        .model
        .attribute(AttributeLocation::Vertices, "grade")
        .unwrap();
    assert_eq!(
        grade.values,
        AttributeValues::Float64(vec![0.0, 1.0, 2.0, 3.0, 4.0])
    );

    // an override applies regardless of the schema's own policy
    let overridden = SchemaValidator::new()
        .with_coercion_override(Some(CoercionPolicy::Widening))
        .validate(&model, &grade_schema());
    assert!(overridden.is_valid());
}

#[test]
fn test_warnings_do_not_block_unless_promoted() {
    let schema = SchemaDefinition::new("ranged", SchemaVersion::new(1, 0, 0), GeometryKind::PointSet)
        .with_rule(
            AttributeRule::required("grade", AttributeLocation::Vertices, DataType::Float64)
                .with_range(0.0, 1.0)
                .with_severity(Severity::Warning),
        );
    let model = point_model(10);

    let lenient = SchemaValidator::new().validate(&model, &schema);
    assert!(lenient.is_valid());
    assert_eq!(lenient.violations().len(), 1);
    assert_eq!(lenient.violations()[0].severity, Severity::Warning);

    let strict = SchemaValidator::new()
        .treat_warnings_as_errors(true)
        .validate(&model, &schema);
    assert!(matches!(strict, Validation::Invalid(_)));
}

#[test]
fn test_catalog_selects_latest_version() {
    let dir = temp_dir("catalog");
    write_fixture(dir.path(), "v1.toml", GRADE_SCHEMA_TOML);
    write_fixture(
        dir.path(),
        "v2.toml",
        &GRADE_SCHEMA_TOML.replace("1.0.0", "2.1.0"),
    );
    write_fixture(dir.path(), "notes.md", "ignored");

    let catalog = SchemaCatalog::from_dir(dir.path()).unwrap();
    assert_eq!(catalog.len().unwrap(), 2);
    assert_eq!(
        catalog.names().unwrap(),
        vec!["collars@1.0.0".to_string(), "collars@2.1.0".to_string()]
    );
    let latest = catalog.schema("collars", None).unwrap();
    assert_eq!(latest.version, SchemaVersion::new(2, 1, 0));
    let pinned = catalog
        .schema("collars", Some(SchemaVersion::new(1, 0, 0)))
        .unwrap();
    assert_eq!(pinned.version, SchemaVersion::new(1, 0, 0));
    assert!(catalog.schema("unknown", None).is_err());
}
