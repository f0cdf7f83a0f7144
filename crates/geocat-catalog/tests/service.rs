//! Catalog service tests: capability fetches, reload dispatch, persistence.

use geocat_catalog::catalog::EntryKey;
use geocat_catalog::model::{LayerStatus, ServiceKind};
use geocat_core::HostLayerFactory;
use geocat_test_utils::{init_test_logging, wfs_capabilities, wms_capabilities, TestHarness};
use tokio_util::sync::CancellationToken;

const WFS_URL: &str = "http://wfs.example/ows?";
const WFS_CAPS_URL: &str =
    "http://wfs.example/ows?REQUEST=GetCapabilities&SERVICE=WFS&VERSION=1.0.0";
const WMS_URL: &str = "http://wms.example/wms?";
const WMS_CAPS_URL: &str = "http://wms.example/wms?REQUEST=GetCapabilities&SERVICE=WMS";

#[tokio::test]
async fn add_service_fetches_parses_and_inserts() {
    init_test_logging();
    let harness = TestHarness::new();
    harness.network.respond(WFS_CAPS_URL, wfs_capabilities());
    let mut service = harness.service();

    service
        .add_service("lds", WFS_URL, ServiceKind::Wfs, None)
        .await
        .expect("add");

    let catalog = service.catalog();
    let lds = catalog.service("lds").expect("service");
    assert_eq!(lds.kind, ServiceKind::Wfs);
    let names: Vec<&str> = lds.layers.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["roads", "rivers"]);
    assert_eq!(lds.layers[0].crs, vec!["EPSG:4326"]);
    assert_eq!(harness.network.requests(), vec![WFS_CAPS_URL.to_string()]);
}

#[tokio::test]
async fn wms_service_carries_formats_and_styles() {
    let harness = TestHarness::new();
    harness.network.respond(WMS_CAPS_URL, wms_capabilities());
    let mut service = harness.service();

    service
        .add_service("basemaps", WMS_URL, ServiceKind::Wms, None)
        .await
        .expect("add");

    let topo = service
        .catalog()
        .entry(&EntryKey::new("basemaps", "topography"))
        .expect("entry");
    assert_eq!(topo.formats, vec!["image/jpeg", "image/png"]);
    assert_eq!(topo.styles, vec!["default"]);
}

#[tokio::test]
async fn failed_refresh_keeps_the_previous_layer_list() {
    let harness = TestHarness::new();
    harness.network.respond(WFS_CAPS_URL, wfs_capabilities());
    let mut service = harness.service();
    service
        .add_service("lds", WFS_URL, ServiceKind::Wfs, None)
        .await
        .expect("add");

    harness.network.respond_status(WFS_CAPS_URL, 503);
    service
        .refresh_service("lds", None)
        .await
        .expect_err("refresh must fail");

    let lds = service.catalog().service("lds").expect("service");
    assert_eq!(lds.layers.len(), 2);
}

#[tokio::test]
async fn unparseable_capabilities_leave_the_catalog_unchanged() {
    let harness = TestHarness::new();
    harness.network.respond(WFS_CAPS_URL, "<WFS_Capabilities><oops");
    let mut service = harness.service();

    service
        .add_service("lds", WFS_URL, ServiceKind::Wfs, None)
        .await
        .expect_err("parse must fail");

    assert!(service.catalog().services().is_empty());
}

#[tokio::test]
async fn cancelled_fetch_reports_cancellation_and_changes_nothing() {
    let harness = TestHarness::new();
    harness.network.hang(WFS_CAPS_URL);
    let mut service = harness.service();

    let token = CancellationToken::new();
    token.cancel();
    let err = service
        .add_service_with_token("lds", WFS_URL, ServiceKind::Wfs, token, None)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("cancelled"), "{err}");
    assert!(service.catalog().services().is_empty());
}

#[tokio::test]
async fn progress_is_reported_during_the_fetch() {
    let harness = TestHarness::new();
    harness.network.respond(WFS_CAPS_URL, wfs_capabilities());
    let mut service = harness.service();

    let (tx, rx) = std::sync::mpsc::channel();
    service
        .add_service(
            "lds",
            WFS_URL,
            ServiceKind::Wfs,
            Some(Box::new(move |progress| {
                let _ = tx.send(progress);
            })),
        )
        .await
        .expect("add");

    let progress = rx.recv().expect("progress notification");
    assert!(progress.received > 0);
}

#[tokio::test]
async fn reload_without_status_refetches_the_owning_service() {
    let harness = TestHarness::new();
    harness.network.respond(WFS_CAPS_URL, wfs_capabilities());
    let mut service = harness.service();
    service
        .add_service("lds", WFS_URL, ServiceKind::Wfs, None)
        .await
        .expect("add");

    service
        .reload_entry(&EntryKey::new("lds", "roads"), None, None)
        .await
        .expect("reload");

    assert_eq!(harness.network.requests().len(), 2);
}

#[tokio::test]
async fn reload_of_an_online_entry_is_a_no_op() {
    let harness = TestHarness::new();
    harness.network.respond(WFS_CAPS_URL, wfs_capabilities());
    let mut service = harness.service();
    service
        .add_service("lds", WFS_URL, ServiceKind::Wfs, None)
        .await
        .expect("add");

    let key = EntryKey::new("lds", "roads");
    service.add_to_map(&key).expect("map");
    service.set_offline(&key, None).expect("offline");
    service.set_online(&key).expect("online");

    service.reload_entry(&key, None, None).await.expect("reload");
    // Only the original capability fetch happened; no write either.
    assert_eq!(harness.network.requests().len(), 1);
    assert_eq!(harness.writer.ops().len(), 1);
}

#[tokio::test]
async fn reload_of_an_offline_entry_rewrites_the_cache() {
    let harness = TestHarness::new();
    harness.network.respond(WFS_CAPS_URL, wfs_capabilities());
    let mut service = harness.service();
    service
        .add_service("lds", WFS_URL, ServiceKind::Wfs, None)
        .await
        .expect("add");

    let key = EntryKey::new("lds", "roads");
    service.add_to_map(&key).expect("map");
    service.set_offline(&key, None).expect("offline");
    let first = service
        .catalog()
        .entry(&key)
        .expect("entry")
        .offline_path
        .clone()
        .expect("artifact");

    service.reload_entry(&key, None, None).await.expect("reload");

    let entry = service.catalog().entry(&key).expect("entry");
    assert_eq!(entry.status, Some(LayerStatus::Offline));
    let second = entry.offline_path.clone().expect("artifact");
    assert_ne!(second, first);
    assert_eq!(harness.writer.ops().len(), 2);
}

#[tokio::test]
async fn favourites_and_endpoints_survive_a_restart() {
    let harness = TestHarness::new();
    harness.network.respond(WFS_CAPS_URL, wfs_capabilities());
    let key = EntryKey::new("lds", "roads");

    {
        let mut service = harness.service();
        service
            .add_service("lds", WFS_URL, ServiceKind::Wfs, None)
            .await
            .expect("add");
        service.set_favourite(&key, true).expect("favourite");
        service
            .endpoints_mut()
            .upsert("LINZ", ServiceKind::Wfs, WFS_URL);
        service.save().expect("save");
    }

    let mut restarted = harness.service();
    restarted.load();

    let entry = restarted.catalog().entry(&key).expect("entry");
    assert!(entry.favourite);
    assert_eq!(
        restarted.endpoints().get("LINZ").expect("endpoint").url,
        WFS_URL
    );
}

#[tokio::test]
async fn online_entries_are_relinked_to_session_layers_after_a_restart() {
    let harness = TestHarness::new();
    harness.network.respond(WFS_CAPS_URL, wfs_capabilities());
    let key = EntryKey::new("lds", "roads");

    let mapped = {
        let mut service = harness.service();
        service
            .add_service("lds", WFS_URL, ServiceKind::Wfs, None)
            .await
            .expect("add");
        service.add_to_map(&key).expect("map");
        service.set_online(&key).expect("noop online state");
        service.save().expect("save");
        service
            .catalog()
            .entry(&key)
            .expect("entry")
            .host_layer
            .clone()
            .expect("mapped")
    };

    // The host session kept its layers across the catalog restart.
    let mut restarted = harness.service();
    restarted.load();

    let entry = restarted.catalog().entry(&key).expect("entry");
    assert_eq!(entry.host_layer.as_ref(), Some(&mapped));
}

#[tokio::test]
async fn offline_entries_are_relinked_by_their_cache_path() {
    let harness = TestHarness::new();
    harness.network.respond(WFS_CAPS_URL, wfs_capabilities());
    let key = EntryKey::new("lds", "roads");

    let mapped = {
        let mut service = harness.service();
        service
            .add_service("lds", WFS_URL, ServiceKind::Wfs, None)
            .await
            .expect("add");
        service.add_to_map(&key).expect("map");
        service.set_offline(&key, None).expect("offline");
        service.save().expect("save");
        service
            .catalog()
            .entry(&key)
            .expect("entry")
            .host_layer
            .clone()
            .expect("mapped")
    };

    let mut restarted = harness.service();
    restarted.load();

    let entry = restarted.catalog().entry(&key).expect("entry");
    assert_eq!(entry.status, Some(LayerStatus::Offline));
    assert_eq!(entry.host_layer.as_ref(), Some(&mapped));
}

#[tokio::test]
async fn deleted_cache_file_leaves_the_restored_entry_unmapped() {
    let harness = TestHarness::new();
    harness.network.respond(WFS_CAPS_URL, wfs_capabilities());
    let key = EntryKey::new("lds", "roads");

    let artifact = {
        let mut service = harness.service();
        service
            .add_service("lds", WFS_URL, ServiceKind::Wfs, None)
            .await
            .expect("add");
        service.add_to_map(&key).expect("map");
        service.set_offline(&key, None).expect("offline");
        service.save().expect("save");
        service
            .catalog()
            .entry(&key)
            .expect("entry")
            .offline_path
            .clone()
            .expect("artifact")
    };

    // Simulate the user clearing the cache while the app was closed. The
    // session layer is gone too.
    let session = harness.host.active_layers();
    harness
        .host
        .remove_layers(&session.iter().map(|l| l.id.clone()).collect::<Vec<_>>());
    std::fs::remove_file(&artifact).expect("delete cache file");

    let mut restarted = harness.service();
    restarted.load();

    let entry = restarted.catalog().entry(&key).expect("entry");
    assert_eq!(entry.status, Some(LayerStatus::Offline));
    assert!(!entry.is_mapped());
}

#[tokio::test]
async fn delete_service_removes_it_from_the_catalog() {
    let harness = TestHarness::new();
    harness.network.respond(WFS_CAPS_URL, wfs_capabilities());
    let mut service = harness.service();
    service
        .add_service("lds", WFS_URL, ServiceKind::Wfs, None)
        .await
        .expect("add");

    service.delete_service("lds").expect("delete");
    assert!(service.catalog().services().is_empty());
}
