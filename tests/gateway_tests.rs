// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Object-store gateway integration tests.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{point_model, points_csv, temp_dir, well_model, write_fixture};
use geocodec::convert::{
    call_with_timeout, ConversionRequest, ConversionSource, ConversionTarget,
    LocalDirectoryGateway, ObjectStoreGateway, Orchestrator, RemoteObjectId,
};
use geocodec::{Compression, ConvertError};

#[test]
fn test_local_directory_round_trip() {
    let dir = temp_dir("gateway_local");
    let gateway = LocalDirectoryGateway::new(dir.path());

    let model = point_model(30);
    let id = gateway.upload(&model, "surveys/2026/collars").unwrap();
    assert_eq!(id.as_str(), "surveys/2026/collars");
    assert!(dir.join("surveys/2026/collars.gcb").exists());
    assert_eq!(gateway.fetch(&id).unwrap(), model);
}

#[test]
fn test_local_directory_compressions() {
    let dir = temp_dir("gateway_compression");
    let model = well_model();
    for compression in [Compression::None, Compression::Lz4, Compression::Zstd] {
        let gateway = LocalDirectoryGateway::new(dir.path()).with_compression(compression);
        let key = format!("well-{}", compression.as_str());
        let id = gateway.upload(&model, &key).unwrap();
        let back = gateway.fetch(&id).unwrap();
        assert_eq!(back.name(), model.name());
        assert_eq!(back.properties(), model.properties());
    }
}

#[test]
fn test_local_directory_rejects_escaping_keys() {
    let dir = temp_dir("gateway_keys");
    let gateway = LocalDirectoryGateway::new(dir.path());
    let model = point_model(1);
    for key in ["", "../outside", "/abs", "a/../../b"] {
        assert!(
            matches!(gateway.upload(&model, key), Err(ConvertError::Gateway { .. })),
            "key {key:?} accepted"
        );
    }
    assert!(matches!(
        gateway.fetch(&RemoteObjectId::new("missing")),
        Err(ConvertError::Gateway { .. })
    ));
}

#[test]
fn test_orchestrator_publishes_to_directory() {
    let dir = temp_dir("gateway_publish");
    let store = dir.join("store");
    std::fs::create_dir_all(&store).unwrap();
    let input = write_fixture(dir.path(), "points.csv", &points_csv(12));

    let gateway = Arc::new(LocalDirectoryGateway::new(&store));
    let orchestrator = Orchestrator::default().with_gateway(gateway.clone());
    let request = ConversionRequest::with_target(
        ConversionSource::File(input),
        ConversionTarget::remote("points"),
    );
    let report = orchestrator.convert(&request);

    assert!(report.is_completed(), "error: {:?}", report.error);
    let id = report.remote_id.unwrap();
    assert_eq!(gateway.fetch(&id).unwrap().geometry().element_count(), 12);
}

#[test]
fn test_timeout_discards_late_result() {
    let result: geocodec::Result<u32> = call_with_timeout("upload", Duration::from_millis(10), || {
        std::thread::sleep(Duration::from_millis(300));
        Ok(1)
    });
    match result {
        Err(ConvertError::GatewayTimeout { operation, .. }) => assert_eq!(operation, "upload"),
        other => panic!("expected timeout, got {other:?}"),
    }

    let result = call_with_timeout("fetch", Duration::from_secs(5), || {
        Err::<(), _>(ConvertError::gateway("fetch", "denied"))
    });
    assert!(matches!(result, Err(ConvertError::Gateway { .. })));
}
