use std::fs;
use std::path::Path;
use std::sync::Arc;

use httptest::matchers::{all_of, contains, request, url_decoded};
use httptest::responders::json_encoded;
use httptest::{Expectation, Server};
use serde_json::json;
use tempfile::tempdir;

use shop_radar::{
    AppConfig, AppError, BatchOutcome, Coordinate, CoordinateCache, Session, SOURCE_GEOCODER,
};

const CENTER: Coordinate = Coordinate {
    lat: 35.446423,
    lng: 139.390779,
};

fn write_dataset(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("shops.json");
    fs::write(
        &path,
        r#"[
            {"id": "s1", "name": "Bakery", "voucherCategory": "paper",
             "fullAddress": "2430018 厚木市中町4-5-6"},
            {"id": "s2", "name": "Cafe", "voucherCategory": "paper",
             "fullAddress": "2430018 厚木市旭町7-8"},
            {"id": "s3", "name": "Books", "voucherCategory": "digital",
             "fullAddress": "2430018 厚木市中町1-2-3"}
        ]"#,
    )
    .unwrap();
    path
}

fn write_bulk(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("shops-geocoded.json");
    fs::write(
        &path,
        r#"[{"id": "s2", "lat": 35.448, "lng": 139.390779}]"#,
    )
    .unwrap();
    path
}

#[tokio::test]
async fn resolves_geocodes_and_ranks_end_to_end() {
    let server = Server::run();
    server.expect(
        Expectation::matching(all_of!(
            request::method("GET"),
            request::path("/address-search"),
            request::query(url_decoded(contains(("q", "厚木市中町1-2-3"))))
        ))
        .respond_with(json_encoded(json!([
            {"geometry": {"coordinates": [139.390779, 35.45]}}
        ]))),
    );

    let dir = tempdir().unwrap();
    let dataset_path = write_dataset(dir.path());
    let bulk_path = write_bulk(dir.path());

    let config = AppConfig {
        geocoder_endpoint: server.url("/address-search").to_string(),
        geocode_delay_ms: 0,
        cache_file_name: "coords.db".to_string(),
        ..AppConfig::default()
    };

    // A previous run already resolved s1.
    {
        let cache = CoordinateCache::open(dir.path(), &config.cache_file_name).unwrap();
        cache.set("s1", Coordinate::new(35.447, 139.390779), SOURCE_GEOCODER);
    }

    let session = Arc::new(
        Session::bootstrap(&config, dir.path(), &dataset_path, Some(&bulk_path)).unwrap(),
    );

    let stats = session.resolution_stats();
    assert_eq!(stats.from_cache, 1);
    assert_eq!(stats.from_bulk, 1);
    assert_eq!(stats.unresolved, 1);

    // No center yet: no hits, one shop still without coordinates.
    let before_center = session.search();
    assert!(before_center.hits.is_empty());
    assert_eq!(before_center.missing_coordinates, 1);

    session.set_center(CENTER);
    session.set_radius_meters(500.0);
    let before_geocode = session.search();
    let ids: Vec<&str> = before_geocode
        .hits
        .iter()
        .map(|hit| hit.shop.id.as_str())
        .collect();
    assert_eq!(ids, vec!["s1", "s2"]);
    assert_eq!(before_geocode.missing_coordinates, 1);

    let outcome = session.start_geocoding(None).await;
    let BatchOutcome::Completed(batch) = outcome else {
        panic!("expected a completed batch");
    };
    assert_eq!(batch.total, 1);
    assert_eq!(batch.lookups, 1);
    assert_eq!(batch.resolved, 1);
    assert!(!session.is_geocoding());

    let after_geocode = session.search();
    let ids: Vec<&str> = after_geocode
        .hits
        .iter()
        .map(|hit| hit.shop.id.as_str())
        .collect();
    assert_eq!(ids, vec!["s1", "s2", "s3"]);
    assert_eq!(after_geocode.missing_coordinates, 0);
    assert!(after_geocode
        .hits
        .windows(2)
        .all(|pair| pair[0].distance_meters <= pair[1].distance_meters));

    // The live result was persisted, so a fresh session skips the network.
    session.set_voucher_filter(Some("digital".to_string()));
    let digital_only = session.search();
    assert_eq!(digital_only.hits.len(), 1);
    assert_eq!(digital_only.hits[0].shop.id, "s3");

    let rebooted =
        Session::bootstrap(&config, dir.path(), &dataset_path, Some(&bulk_path)).unwrap();
    assert_eq!(rebooted.resolution_stats().unresolved, 0);
}

#[tokio::test]
async fn incremental_geocoding_delivers_partial_results() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method("GET")).respond_with(json_encoded(json!([
            {"geometry": {"coordinates": [139.390779, 35.447]}}
        ]))),
    );

    let dir = tempdir().unwrap();
    let dataset_path = dir.path().join("shops.json");
    fs::write(
        &dataset_path,
        r#"[{"id": "s1", "name": "Bakery", "voucherCategory": "paper",
             "fullAddress": "2430018 厚木市中町4-5-6"}]"#,
    )
    .unwrap();

    let config = AppConfig {
        geocoder_endpoint: server.url("/address-search").to_string(),
        geocode_delay_ms: 0,
        debounce_window_ms: 10,
        cache_file_name: "coords.db".to_string(),
        ..AppConfig::default()
    };

    let session =
        Arc::new(Session::bootstrap(&config, dir.path(), &dataset_path, None).unwrap());
    session.set_center(CENTER);

    let (tx, rx) = tokio::sync::oneshot::channel();
    let tx = parking_lot::Mutex::new(Some(tx));
    let deliver = Arc::new(move |outcome: shop_radar::SearchOutcome| {
        if let Some(tx) = tx.lock().take() {
            let _ = tx.send(outcome.hits.len());
        }
    });

    let outcome = session.start_geocoding_incremental(deliver).await;
    assert!(matches!(outcome, BatchOutcome::Completed(stats) if stats.resolved == 1));

    let delivered = rx.await.unwrap();
    assert_eq!(delivered, 1);
}

#[test]
fn malformed_dataset_is_a_fatal_startup_error() {
    let dir = tempdir().unwrap();
    let dataset_path = dir.path().join("shops.json");
    fs::write(&dataset_path, r#"{"not": "an array"}"#).unwrap();

    let err = Session::bootstrap(&AppConfig::default(), dir.path(), &dataset_path, None)
        .err()
        .unwrap();
    assert!(matches!(err, AppError::Dataset(_)));
}
