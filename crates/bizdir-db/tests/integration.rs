//! Offline tests for bizdir-db pool configuration and row types.
//! These tests do not require a live database connection.

use bizdir_core::{AppConfig, Environment};
use bizdir_db::{BusinessRow, LocationRow, PoolConfig, RatingJson};
use bizdir_search::Include;
use sqlx::types::Json;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        directory_path: PathBuf::from("./config/directory.yaml"),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        store_timeout_ms: 5000,
        max_page_size: 100,
        ratings_approved_only: true,
        directory_cache_ttl_secs: 300,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

/// Compile-time smoke test: confirm that [`LocationRow`] has all expected
/// fields with the correct types. No database required.
#[test]
fn location_row_has_expected_fields() {
    let row = LocationRow {
        id: 1_i64,
        name: "Kigali".to_string(),
        latitude: None,
        longitude: None,
        population: Some(1_132_686_i64),
        region_id: Some(1_i64),
    };

    assert_eq!(row.id, 1);
    assert_eq!(row.name, "Kigali");
    assert!(row.latitude.is_none());
}

#[test]
fn business_row_with_null_joins_embeds_nothing() {
    use chrono::Utc;
    use uuid::Uuid;

    let row = BusinessRow {
        id: 3,
        public_id: Uuid::new_v4(),
        name: "Orphan Listing".to_string(),
        description: None,
        category_id: None,
        location_id: None,
        region_id: None,
        address: None,
        phone: None,
        email: None,
        website: None,
        verified: false,
        premium: false,
        sponsored: true,
        accepts_online_orders: false,
        kid_friendly: false,
        has_coupons: false,
        view_count: 12,
        click_count: 3,
        status: "premium".to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
        category_slug: None,
        category_name: None,
        location_name: None,
        location_latitude: None,
        location_longitude: None,
        location_population: None,
        location_region_id: None,
        region_code: None,
        region_name: None,
        ratings: Json(Vec::<RatingJson>::new()),
    };

    let record = row.into_record(Include::all()).expect("valid row");
    assert!(record.category.is_none());
    assert!(record.location.is_none());
    assert!(record.region.is_none());
    assert!(record.is_promoted());
    assert_eq!(record.status.as_str(), "premium");
}
