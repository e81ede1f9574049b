// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Orchestrator integration tests.
//!
//! Tests cover:
//! - Local conversions with detection, schema validation, and transforms
//! - Job state history and failure reporting
//! - Atomic writes under injected mid-write failures and cancellation
//! - Publishing to and fetching from an object-store gateway

mod common;

use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use common::{
    assert_close, entry_count, float_values, grade, grade_schema, point_model, points_csv,
    temp_dir, write_fixture,
};
use geocodec::convert::{
    ConversionRequest, ConversionSource, ConversionTarget, InMemoryGateway, ObjectStoreGateway,
    Orchestrator,
};
use geocodec::io::formats::BinaryAdapter;
use geocodec::io::{
    write_atomic, CancellationToken, Confidence, FormatAdapter, RegistryBuilder, SourceHandle,
    WriteSummary,
};
use geocodec::model::{
    Attribute, AttributeLocation, AttributeValues, CanonicalModel, Geometry, LengthUnit,
    ModelBuilder,
};
use geocodec::{ConvertError, ConvertOptions, JobState, Result, TransformBuilder};

// ============================================================================
// Test Adapters
// ============================================================================

/// Claims `.short` files and produces an attribute one value short.
struct ShortAttributeAdapter;

impl FormatAdapter for ShortAttributeAdapter {
    fn format_id(&self) -> &'static str {
        "short-attribute"
    }

    fn description(&self) -> &'static str {
        "100 points with a 99-value attribute"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["short"]
    }

    fn detect(&self, source: &SourceHandle) -> Confidence {
        match source.extension().as_deref() {
            Some("short") => Confidence::CERTAIN,
            _ => Confidence::NONE,
        }
    }

    fn read(&self, _source: &SourceHandle, _cancel: &CancellationToken) -> Result<CanonicalModel> {
        let vertices = (0..100).map(|i| [i as f64, 0.0, 0.0]).collect();
        let grades = (0..99).map(grade).collect();
        ModelBuilder::new("short")
            .with_geometry(Geometry::PointSet { vertices })?
            .with_attribute(
                AttributeLocation::Vertices,
                Attribute::new("grade", AttributeValues::Float64(grades)),
            )?
            .build()
    }

    fn write(
        &self,
        _model: &CanonicalModel,
        _target: &Path,
        _cancel: &CancellationToken,
    ) -> Result<WriteSummary> {
        Err(ConvertError::unsupported("short-attribute", "writing"))
    }
}

/// Writes half a file, then fails like a full disk.
struct FailingWriteAdapter;

impl FormatAdapter for FailingWriteAdapter {
    fn format_id(&self) -> &'static str {
        "failing"
    }

    fn description(&self) -> &'static str {
        "Fails half-way through every write"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["fail"]
    }

    fn detect(&self, _source: &SourceHandle) -> Confidence {
        Confidence::NONE
    }

    fn read(&self, _source: &SourceHandle, _cancel: &CancellationToken) -> Result<CanonicalModel> {
        Err(ConvertError::unsupported("failing", "reading"))
    }

    fn write(
        &self,
        _model: &CanonicalModel,
        target: &Path,
        _cancel: &CancellationToken,
    ) -> Result<WriteSummary> {
        write_atomic(target, |f| {
            f.write_all(b"partial contents")
                .map_err(|e| ConvertError::io("writing", &e))?;
            let err = std::io::Error::new(std::io::ErrorKind::Other, "no space left on device");
            Err(ConvertError::io(format!("writing {}", target.display()), &err))
        })?;
        unreachable!("write_atomic only succeeds when the body does")
    }
}

/// Claims `.dup` files with a fixed confidence.
struct Claimer(&'static str);

impl FormatAdapter for Claimer {
    fn format_id(&self) -> &'static str {
        self.0
    }

    fn description(&self) -> &'static str {
        "Claims .dup files"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["dup"]
    }

    fn detect(&self, source: &SourceHandle) -> Confidence {
        match source.extension().as_deref() {
            Some("dup") => Confidence::new(0.8),
            _ => Confidence::NONE,
        }
    }

    fn read(&self, _source: &SourceHandle, _cancel: &CancellationToken) -> Result<CanonicalModel> {
        Ok(point_model(3))
    }

    fn write(
        &self,
        _model: &CanonicalModel,
        _target: &Path,
        _cancel: &CancellationToken,
    ) -> Result<WriteSummary> {
        Err(ConvertError::unsupported(self.0, "writing"))
    }
}

fn orchestrator_with(adapters: Vec<Arc<dyn FormatAdapter>>) -> Orchestrator {
    let mut builder = RegistryBuilder::with_builtin();
    for adapter in adapters {
        builder = builder.register(adapter).unwrap();
    }
    Orchestrator::new(Arc::new(builder.build()))
}

fn read_gcb(path: &Path) -> CanonicalModel {
    let source = SourceHandle::open(path).unwrap();
    BinaryAdapter::default()
        .read(&source, &CancellationToken::new())
        .unwrap()
}

// ============================================================================
// Successful Conversions
// ============================================================================

#[test]
fn test_points_with_schema_complete() {
    let dir = temp_dir("orch_complete");
    let input = write_fixture(dir.path(), "points.csv", &points_csv(100));
    let output = dir.join("points.gcb");

    let request = ConversionRequest::new(&input, &output).with_schema(Arc::new(grade_schema()));
    let report = Orchestrator::default().convert(&request);

    assert_eq!(report.state, JobState::Completed, "error: {:?}", report.error);
    assert!(report.error.is_none());
    assert_eq!(
        report.states(),
        vec![
            JobState::Pending,
            JobState::Detecting,
            JobState::Reading,
            JobState::Validating,
            JobState::Writing,
            JobState::Completed,
        ]
    );
    assert_eq!(report.source_format.as_deref(), Some("csv-points"));
    assert_eq!(report.target_format.as_deref(), Some("geocodec-binary"));
    assert_eq!(report.output_path(), Some(&output));
    assert_eq!(report.output.as_ref().unwrap().elements, 100);

    let back = read_gcb(&output);
    assert_eq!(back.geometry().element_count(), 100);
    let expected: Vec<f64> = (0..100).map(grade).collect();
    assert_close(
        &float_values(&back, AttributeLocation::Vertices, "grade"),
        &expected,
        1e-9,
    );
}

#[test]
fn test_explicit_source_format_skips_detection() {
    let dir = temp_dir("orch_named");
    let input = write_fixture(dir.path(), "points.txt", &points_csv(10));
    let output = dir.join("points.csv");

    let request = ConversionRequest::new(&input, &output).with_source_format("csv-points");
    let report = Orchestrator::default().convert(&request);

    assert!(report.is_completed(), "error: {:?}", report.error);
    assert!(!report.states().contains(&JobState::Detecting));
    assert!(output.exists());
}

#[test]
fn test_transforms_run_between_validations() {
    let dir = temp_dir("orch_transform");
    let csv = points_csv(10).replacen("grade", "au", 1);
    let input = write_fixture(dir.path(), "points.csv", &csv);
    let output = dir.join("points.gcb");

    let pipeline = TransformBuilder::new()
        .with_attribute_rename("au", "grade")
        .with_length_unit(LengthUnit::Foot)
        .build()
        .unwrap();
    let request = ConversionRequest::new(&input, &output)
        .with_options(ConvertOptions::new().with_transforms(pipeline));
    let report = Orchestrator::default().convert(&request);

    assert!(report.is_completed(), "error: {:?}", report.error);
    assert_eq!(
        report.states(),
        vec![
            JobState::Pending,
            JobState::Detecting,
            JobState::Reading,
            JobState::Validating,
            JobState::Transforming,
            JobState::Validating,
            JobState::Writing,
            JobState::Completed,
        ]
    );

    let back = read_gcb(&output);
    assert_eq!(back.provenance().length_unit, LengthUnit::Foot);
    assert_eq!(back.provenance().lineage.len(), 2);
    let Geometry::PointSet { vertices } = back.geometry() else {
        panic!("expected points");
    };
    assert!((vertices[1][0] - 2.0 / 0.3048).abs() < 1e-9);
    assert!(back.attribute(AttributeLocation::Vertices, "grade").is_some());
    assert!(back.attribute(AttributeLocation::Vertices, "au").is_none());
}

#[test]
fn test_schema_failure_without_transforms() {
    let dir = temp_dir("orch_schema_fail");
    let csv = points_csv(10).replacen("grade", "au", 1);
    let input = write_fixture(dir.path(), "points.csv", &csv);
    let output = dir.join("points.gcb");

    let request = ConversionRequest::new(&input, &output).with_schema(Arc::new(grade_schema()));
    let report = Orchestrator::default().convert(&request);

    assert_eq!(report.state, JobState::Failed);
    assert!(matches!(report.error, Some(ConvertError::SchemaMismatch { .. })));
    assert!(!report.violations.is_empty());
    assert!(!output.exists());
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_short_attribute_fails_without_target() {
    let dir = temp_dir("orch_short");
    let input = write_fixture(dir.path(), "points.short", "");
    let output = dir.join("points.gcb");

    let orchestrator = orchestrator_with(vec![Arc::new(ShortAttributeAdapter)]);
    let request = ConversionRequest::new(&input, &output).with_schema(Arc::new(grade_schema()));
    let report = orchestrator.convert(&request);

    assert_eq!(report.state, JobState::Failed);
    assert!(
        matches!(report.error, Some(ConvertError::SchemaMismatch { .. })),
        "got {:?}",
        report.error
    );
    assert!(!output.exists());
    assert_eq!(entry_count(dir.path()), 1);
}

#[test]
fn test_mid_write_failure_leaves_no_target() {
    let dir = temp_dir("orch_atomic");
    let input = write_fixture(dir.path(), "points.csv", &points_csv(10));
    let output = dir.join("points.fail");

    let orchestrator = orchestrator_with(vec![Arc::new(FailingWriteAdapter)]);
    let report = orchestrator.convert(&ConversionRequest::new(&input, &output));

    assert_eq!(report.state, JobState::Failed);
    assert_eq!(report.states().last(), Some(&JobState::Failed));
    assert!(report.states().contains(&JobState::Writing));
    assert!(
        matches!(report.error, Some(ConvertError::Io { .. })),
        "got {:?}",
        report.error
    );
    assert!(!output.exists());
    // no temporary file is left next to the input either
    assert_eq!(entry_count(dir.path()), 1);
}

#[test]
fn test_cancelled_job_leaves_no_target() {
    let dir = temp_dir("orch_cancel");
    let input = write_fixture(dir.path(), "points.csv", &points_csv(50));
    let output = dir.join("points.gcb");

    let cancel = CancellationToken::new();
    cancel.cancel();
    let request = ConversionRequest::new(&input, &output)
        .with_options(ConvertOptions::new().with_cancellation(cancel));
    let report = Orchestrator::default().convert(&request);

    assert_eq!(report.state, JobState::Failed);
    assert!(matches!(report.error, Some(ConvertError::Cancelled { .. })));
    assert!(!output.exists());
}

#[test]
fn test_existing_target_requires_overwrite() {
    let dir = temp_dir("orch_exists");
    let input = write_fixture(dir.path(), "points.csv", &points_csv(5));
    let output = write_fixture(dir.path(), "points.gcb", "keep me");

    let report = Orchestrator::default().convert(&ConversionRequest::new(&input, &output));
    assert_eq!(report.state, JobState::Failed);
    match &report.error {
        Some(ConvertError::Io { kind, .. }) => {
            assert_eq!(*kind, std::io::ErrorKind::AlreadyExists);
        }
        other => panic!("expected I/O error, got {other:?}"),
    }
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "keep me");

    let request = ConversionRequest::new(&input, &output)
        .with_options(ConvertOptions::new().with_overwrite(true));
    let report = Orchestrator::default().convert(&request);
    assert!(report.is_completed(), "error: {:?}", report.error);
    assert_eq!(read_gcb(&output).geometry().element_count(), 5);
}

#[test]
fn test_ambiguous_detection_fails() {
    let dir = temp_dir("orch_ambiguous");
    let input = write_fixture(dir.path(), "points.dup", "anything");
    let output = dir.join("points.gcb");

    let orchestrator =
        orchestrator_with(vec![Arc::new(Claimer("first")), Arc::new(Claimer("second"))]);
    let report = orchestrator.convert(&ConversionRequest::new(&input, &output));

    assert_eq!(report.state, JobState::Failed);
    match &report.error {
        Some(ConvertError::AmbiguousFormat { candidates, .. }) => {
            assert_eq!(candidates, &vec!["first".to_string(), "second".to_string()]);
        }
        other => panic!("expected ambiguity, got {other:?}"),
    }

    // naming the format resolves it
    let request = ConversionRequest::new(&input, &output).with_source_format("second");
    let report = orchestrator.convert(&request);
    assert!(report.is_completed(), "error: {:?}", report.error);
}

#[test]
fn test_unknown_format_is_not_found() {
    let dir = temp_dir("orch_unknown");
    let input = write_fixture(dir.path(), "blob.bin", "\u{1}\u{2}");
    let output = dir.join("blob.gcb");

    let report = Orchestrator::default().convert(&ConversionRequest::new(&input, &output));
    assert_eq!(report.state, JobState::Failed);
    assert!(matches!(report.error, Some(ConvertError::NotFound { .. })));
}

#[test]
fn test_unsupported_target_leaves_no_file() {
    let dir = temp_dir("orch_unsupported");
    let input = write_fixture(dir.path(), "points.csv", &points_csv(5));
    let output = dir.join("points.las");

    let report = Orchestrator::default().convert(&ConversionRequest::new(&input, &output));
    assert_eq!(report.state, JobState::Failed);
    assert!(matches!(
        report.error,
        Some(ConvertError::UnsupportedFeature { .. })
    ));
    assert!(!output.exists());
}

// ============================================================================
// Gateway
// ============================================================================

#[test]
fn test_publish_and_fetch_through_gateway() {
    let dir = temp_dir("orch_publish");
    let input = write_fixture(dir.path(), "points.csv", &points_csv(20));
    let output = dir.join("points.gcb");

    let gateway = Arc::new(InMemoryGateway::new());
    let orchestrator = Orchestrator::default().with_gateway(gateway.clone());

    let request = ConversionRequest::with_target(
        ConversionSource::File(input),
        ConversionTarget::local(&output).and_remote("survey"),
    );
    let report = orchestrator.convert(&request);
    assert!(report.is_completed(), "error: {:?}", report.error);
    assert_eq!(report.states()[report.states().len() - 2], JobState::Publishing);
    let id = report.remote_id.clone().unwrap();
    assert!(id.as_str().starts_with("survey/"));
    assert_eq!(gateway.len(), 1);
    assert_eq!(gateway.fetch(&id).unwrap(), read_gcb(&output));

    // remote source, local target
    let copy = dir.join("copy.csv");
    let request =
        ConversionRequest::with_target(ConversionSource::Remote(id), ConversionTarget::local(&copy));
    let report = orchestrator.convert(&request);
    assert!(report.is_completed(), "error: {:?}", report.error);
    assert_eq!(
        report.states(),
        vec![
            JobState::Pending,
            JobState::Reading,
            JobState::Validating,
            JobState::Writing,
            JobState::Completed,
        ]
    );
    assert!(copy.exists());
}

#[test]
fn test_remote_only_target() {
    let dir = temp_dir("orch_remote_only");
    let input = write_fixture(dir.path(), "points.csv", &points_csv(5));

    let gateway = Arc::new(InMemoryGateway::new());
    let orchestrator = Orchestrator::default().with_gateway(gateway.clone());
    let request = ConversionRequest::with_target(
        ConversionSource::File(input),
        ConversionTarget::remote("drop"),
    );
    let report = orchestrator.convert(&request);

    assert!(report.is_completed(), "error: {:?}", report.error);
    assert!(report.output.is_none());
    assert!(!report.states().contains(&JobState::Writing));
    assert_eq!(gateway.len(), 1);
}

#[test]
fn test_gateway_timeout() {
    let dir = temp_dir("orch_timeout");
    let input = write_fixture(dir.path(), "points.csv", &points_csv(5));

    let gateway = Arc::new(InMemoryGateway::new().with_latency(Duration::from_millis(500)));
    let orchestrator = Orchestrator::default().with_gateway(gateway);
    let request = ConversionRequest::with_target(
        ConversionSource::File(input),
        ConversionTarget::remote("slow"),
    )
    .with_options(ConvertOptions::new().with_gateway_timeout(Duration::from_millis(20)));
    let report = orchestrator.convert(&request);

    assert_eq!(report.state, JobState::Failed);
    match &report.error {
        Some(ConvertError::GatewayTimeout { operation, timeout }) => {
            assert_eq!(operation, "upload");
            assert_eq!(*timeout, Duration::from_millis(20));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[test]
fn test_remote_target_requires_gateway() {
    let dir = temp_dir("orch_no_gateway");
    let input = write_fixture(dir.path(), "points.csv", &points_csv(5));
    let request = ConversionRequest::with_target(
        ConversionSource::File(input),
        ConversionTarget::remote("nowhere"),
    );
    let report = Orchestrator::default().convert(&request);
    assert_eq!(report.state, JobState::Failed);
    assert!(matches!(report.error, Some(ConvertError::Config { .. })));
}

// ============================================================================
// Batch
// ============================================================================

#[test]
fn test_batch_reports_in_request_order() {
    let dir = temp_dir("orch_batch");
    let mut requests = Vec::new();
    for i in 0..6 {
        let input = write_fixture(dir.path(), &format!("p{i}.csv"), &points_csv(i + 1));
        requests.push(ConversionRequest::new(input, dir.join(&format!("p{i}.gcb"))));
    }
    // one bad job does not affect the others
    requests.push(ConversionRequest::new(
        dir.join("missing.csv"),
        dir.join("missing.gcb"),
    ));

    let seen = std::sync::atomic::AtomicUsize::new(0);
    let reports = Orchestrator::default()
        .convert_batch_with(&requests, 3, |_| {
            seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        })
        .unwrap();

    assert_eq!(reports.len(), 7);
    assert_eq!(seen.into_inner(), 7);
    for (i, report) in reports.iter().take(6).enumerate() {
        assert!(report.is_completed(), "job {i}: {:?}", report.error);
        assert_eq!(report.output.as_ref().unwrap().elements, i + 1);
    }
    assert_eq!(reports[6].state, JobState::Failed);
    assert!(matches!(reports[6].error, Some(ConvertError::Io { .. })));
}

#[test]
fn test_point_model_fixture_passes_schema() {
    let validation = geocodec::SchemaValidator::new().validate(&point_model(10), &grade_schema());
    assert!(validation.is_valid());
}
