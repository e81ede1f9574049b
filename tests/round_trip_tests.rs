// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Round-trip integration tests.
//!
//! Every built-in adapter writes a model and reads it back; whatever the
//! adapter does not declare as lossy must survive unchanged.

mod common;

use std::path::Path;

use common::{assert_close, float_values, grid_model, point_model, surface_model, temp_dir, well_model};
use geocodec::io::formats::{
    BinaryAdapter, CsvPointsAdapter, EsriAsciiAdapter, LasAdapter, ObjAdapter,
};
use geocodec::io::{CancellationToken, FormatAdapter, SourceHandle};
use geocodec::model::{AttributeLocation, CanonicalModel, Crs, Geometry};
use geocodec::Compression;

fn round_trip(adapter: &dyn FormatAdapter, model: &CanonicalModel, file_name: &str) -> CanonicalModel {
    let dir = temp_dir("roundtrip");
    let path = dir.join(file_name);
    let summary = adapter
        .write(model, &path, &CancellationToken::new())
        .unwrap_or_else(|e| panic!("{} write failed: {e}", adapter.format_id()));
    assert_eq!(summary.path, path);
    assert_eq!(summary.bytes_written, std::fs::metadata(&path).unwrap().len());
    read_back(adapter, &path)
}

fn read_back(adapter: &dyn FormatAdapter, path: &Path) -> CanonicalModel {
    let source = SourceHandle::open(path).unwrap();
    assert!(
        adapter.detect(&source).value() >= 0.5,
        "{} does not recognise its own output",
        adapter.format_id()
    );
    adapter
        .read(&source, &CancellationToken::new())
        .unwrap_or_else(|e| panic!("{} read failed: {e}", adapter.format_id()))
}

// ============================================================================
// Native Binary
// ============================================================================

#[test]
fn test_binary_round_trip_is_exact() {
    let model = point_model(100);
    for compression in [Compression::None, Compression::Zstd, Compression::Lz4] {
        let back = round_trip(&BinaryAdapter::new(compression), &model, "collars.gcb");
        assert_eq!(back, model, "compression {compression:?}");
    }
}

#[test]
fn test_binary_round_trip_keeps_nan() {
    let model = well_model();
    let back = round_trip(&BinaryAdapter::default(), &model, "well.gcb");
    assert_eq!(back.name(), model.name());
    assert_eq!(back.properties(), model.properties());
    assert_close(
        &float_values(&back, AttributeLocation::Samples, "RHOB"),
        &float_values(&model, AttributeLocation::Samples, "RHOB"),
        0.0,
    );
}

// ============================================================================
// Text Formats
// ============================================================================

#[test]
fn test_csv_round_trip() {
    let model = point_model(100);
    let back = round_trip(&CsvPointsAdapter, &model, "collars.csv");

    assert_eq!(back.name(), "collars");
    assert_eq!(back.crs(), &Crs::Epsg(32633));
    assert_eq!(back.geometry(), model.geometry());
    assert_eq!(back.provenance().length_unit, model.provenance().length_unit);
    assert_eq!(back.provenance().source_format, "csv-points");

    assert_close(
        &float_values(&back, AttributeLocation::Vertices, "grade"),
        &float_values(&model, AttributeLocation::Vertices, "grade"),
        1e-9,
    );
    let grade = back.attribute(AttributeLocation::Vertices, "grade").unwrap();
    assert_eq!(grade.unit.as_deref(), Some("g/t"));
    // codes were assigned by first appearance, so they survive
    assert_eq!(
        back.attribute(AttributeLocation::Vertices, "lithology"),
        model.attribute(AttributeLocation::Vertices, "lithology")
    );
}

#[test]
fn test_obj_round_trip() {
    let model = surface_model();
    let back = round_trip(&ObjAdapter, &model, "floor.obj");
    assert_eq!(back.name(), "floor");
    assert_eq!(back.geometry(), model.geometry());
    assert_eq!(back.attribute_count(), 0);
}

#[test]
fn test_las_round_trip() {
    let model = well_model();
    let back = round_trip(&LasAdapter, &model, "well.las");

    assert_eq!(back.name(), "WELL-7");
    assert_eq!(back.property("well.FLD"), Some("NORTH"));
    let (Geometry::WellLog(expected), Geometry::WellLog(actual)) =
        (model.geometry(), back.geometry())
    else {
        panic!("expected well logs");
    };
    assert_close(&actual.depths, &expected.depths, 1e-9);
    assert_eq!(actual.collar, expected.collar);

    for curve in ["GR", "RHOB"] {
        assert_close(
            &float_values(&back, AttributeLocation::Samples, curve),
            &float_values(&model, AttributeLocation::Samples, curve),
            1e-9,
        );
        assert_eq!(
            back.attribute(AttributeLocation::Samples, curve).unwrap().unit,
            model.attribute(AttributeLocation::Samples, curve).unwrap().unit
        );
    }
}

#[test]
fn test_esri_ascii_round_trip() {
    let model = grid_model();
    let back = round_trip(&EsriAsciiAdapter, &model, "dem.asc");

    assert_eq!(back.geometry(), model.geometry());
    assert_close(
        &float_values(&back, AttributeLocation::Cells, "value"),
        &float_values(&model, AttributeLocation::Cells, "elevation"),
        1e-9,
    );
}

// ============================================================================
// Cross-Format
// ============================================================================

#[test]
fn test_csv_through_binary_back_to_csv() {
    let dir = temp_dir("cross");
    let model = point_model(25);

    let csv = dir.join("a.csv");
    CsvPointsAdapter
        .write(&model, &csv, &CancellationToken::new())
        .unwrap();
    let first = read_back(&CsvPointsAdapter, &csv);

    let gcb = dir.join("a.gcb");
    BinaryAdapter::default()
        .write(&first, &gcb, &CancellationToken::new())
        .unwrap();
    let second = read_back(&BinaryAdapter::default(), &gcb);
    assert_eq!(second, first);

    let csv2 = dir.join("b.csv");
    CsvPointsAdapter
        .write(&second, &csv2, &CancellationToken::new())
        .unwrap();
    assert_eq!(
        std::fs::read_to_string(&csv).unwrap(),
        std::fs::read_to_string(&csv2).unwrap()
    );
}
