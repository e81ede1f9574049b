// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Common utilities for integration tests.

#![allow(dead_code)]

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use geocodec::model::{
    Attribute, AttributeLocation, AttributeValues, CanonicalModel, Crs, Geometry, GeometryKind,
    LengthUnit, ModelBuilder, Provenance, RegularGrid, WellTrajectory,
};
use geocodec::schema::{AttributeRule, SchemaDefinition, SchemaVersion};
use geocodec::DataType;

// ============================================================================
// Temporary Directories
// ============================================================================

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Cleanup guard for test temporary directories
pub struct CleanupGuard(PathBuf);

impl CleanupGuard {
    pub fn path(&self) -> &Path {
        &self.0
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.0.join(name)
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

/// Create a fresh temporary directory removed when the guard drops.
pub fn temp_dir(label: &str) -> CleanupGuard {
    let dir = std::env::temp_dir().join(format!(
        "geocodec_{label}_{}_{}",
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::SeqCst)
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    CleanupGuard(dir)
}

/// Number of entries in `dir`.
pub fn entry_count(dir: &Path) -> usize {
    fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

// ============================================================================
// Model Fixtures
// ============================================================================

/// Deterministic grade value for point `i`.
pub fn grade(i: usize) -> f64 {
    0.125 + (i as f64) * 0.37 - ((i % 7) as f64) * 0.011
}

/// Point set of `n` collars with a `grade` float64 attribute and a
/// `lithology` categorical attribute.
pub fn point_model(n: usize) -> CanonicalModel {
    let vertices = (0..n)
        .map(|i| {
            [
                500_000.0 + (i as f64) * 12.5,
                4_100_000.0 + (i % 10) as f64 * 7.25,
                -((i % 5) as f64) * 1.5,
            ]
        })
        .collect();
    let grades = (0..n).map(grade).collect();
    let labels: Vec<&str> = (0..n)
        .map(|i| match i % 3 {
            0 => "granite",
            1 => "basalt",
            _ => "schist",
        })
        .collect();

    ModelBuilder::new("collars")
        .with_geometry(Geometry::PointSet { vertices })
        .unwrap()
        .with_attribute(
            AttributeLocation::Vertices,
            Attribute::new("grade", AttributeValues::Float64(grades)).with_unit("g/t"),
        )
        .unwrap()
        .with_attribute(
            AttributeLocation::Vertices,
            Attribute::new(
                "lithology",
                AttributeValues::categorical_from_labels(&labels),
            ),
        )
        .unwrap()
        .with_crs(Crs::Epsg(32633))
        .with_provenance(Provenance::new("test").with_length_unit(LengthUnit::Metre))
        .build()
        .unwrap()
}

/// Two-triangle surface without attributes.
pub fn surface_model() -> CanonicalModel {
    ModelBuilder::new("floor")
        .with_geometry(Geometry::Surface {
            vertices: vec![
                [0.0, 0.0, 10.0],
                [1.0, 0.0, 10.5],
                [1.0, 1.0, 11.0],
                [0.0, 1.0, 10.25],
            ],
            triangles: vec![[0, 1, 2], [0, 2, 3]],
        })
        .unwrap()
        .build()
        .unwrap()
}

/// Single-layer 4 x 3 grid with one `elevation` cell attribute.
pub fn grid_model() -> CanonicalModel {
    let grid = RegularGrid {
        origin: [1000.0, 2000.0, 0.0],
        spacing: [25.0, 25.0, 1.0],
        size: [4, 3, 1],
    };
    let values = (0..12)
        .map(|i| if i == 5 { f64::NAN } else { 100.0 + i as f64 * 0.5 })
        .collect();
    ModelBuilder::new("dem")
        .with_geometry(Geometry::Grid(grid))
        .unwrap()
        .with_attribute(
            AttributeLocation::Cells,
            Attribute::new("elevation", AttributeValues::Float64(values)),
        )
        .unwrap()
        .build()
        .unwrap()
}

/// Well log with a uniform depth step and two curves.
pub fn well_model() -> CanonicalModel {
    let depths: Vec<f64> = (0..20).map(|i| 100.0 + i as f64 * 0.5).collect();
    let gamma = (0..20).map(|i| 40.0 + (i as f64) * 1.25).collect();
    let density = (0..20)
        .map(|i| if i == 3 { f64::NAN } else { 2.45 + (i as f64) * 0.01 })
        .collect();
    ModelBuilder::new("WELL-7")
        .with_geometry(Geometry::WellLog(WellTrajectory {
            collar: [0.0, 0.0, 0.0],
            depths,
        }))
        .unwrap()
        .with_attribute(
            AttributeLocation::Samples,
            Attribute::new("GR", AttributeValues::Float64(gamma)).with_unit("GAPI"),
        )
        .unwrap()
        .with_attribute(
            AttributeLocation::Samples,
            Attribute::new("RHOB", AttributeValues::Float64(density)).with_unit("G/C3"),
        )
        .unwrap()
        .with_property("well.FLD", "NORTH")
        .build()
        .unwrap()
}

// ============================================================================
// Text Fixtures
// ============================================================================

/// CSV table of `n` points with x, y, z and a grade column.
pub fn points_csv(n: usize) -> String {
    let mut text = String::from("x,y,z,grade\n");
    for i in 0..n {
        writeln!(
            text,
            "{},{},{},{}",
            (i as f64) * 2.0,
            (i as f64) * 3.0,
            -(i as f64),
            grade(i)
        )
        .unwrap();
    }
    text
}

/// Write `content` to `dir/name` and return the path.
pub fn write_fixture(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

// ============================================================================
// Schema Fixtures
// ============================================================================

/// Point-set schema requiring a float64 `grade` vertex attribute.
pub fn grade_schema() -> SchemaDefinition {
    SchemaDefinition::new("collars", SchemaVersion::new(1, 0, 0), GeometryKind::PointSet).with_rule(
        AttributeRule::required("grade", AttributeLocation::Vertices, DataType::Float64),
    )
}

/// TOML text of [`grade_schema`].
pub const GRADE_SCHEMA_TOML: &str = r#"
id = "collars"
version = "1.0.0"
geometry = "point-set"

[[attributes]]
name = "grade"
location = "vertices"
data_type = "float64"
required = true
"#;

// ============================================================================
// Assertions
// ============================================================================

/// Assert two float slices agree within `tolerance`, treating NaN as equal.
pub fn assert_close(actual: &[f64], expected: &[f64], tolerance: f64) {
    assert_eq!(actual.len(), expected.len(), "length differs");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        if e.is_nan() {
            assert!(a.is_nan(), "value {i}: expected NaN, got {a}");
        } else {
            assert!((a - e).abs() <= tolerance, "value {i}: {a} != {e}");
        }
    }
}

/// Float values of an attribute, panicking if missing or non-numeric.
pub fn float_values(model: &CanonicalModel, location: AttributeLocation, name: &str) -> Vec<f64> {
    model
        .attribute(location, name)
        .unwrap_or_else(|| panic!("missing attribute {name}"))
        .values
        .to_f64()
        .unwrap_or_else(|| panic!("attribute {name} is not numeric"))
}
