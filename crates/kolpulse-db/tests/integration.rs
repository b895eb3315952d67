//! Offline unit tests for kolpulse-db pool configuration and row types.
//! These tests do not require a live database connection.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use chrono::Utc;
use kolpulse_core::{AppConfig, Environment, PropagationWeights, SubjectProfile};
use kolpulse_db::{PoolConfig, SubjectProfileRow};

#[test]
fn pool_config_default_matches_documented_values() {
    let config = PoolConfig::default();
    assert_eq!(config.max_connections, 10);
    assert_eq!(config.min_connections, 1);
    assert_eq!(config.acquire_timeout_secs, 10);
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3100),
        log_level: "info".to_string(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        classifier_url: "http://localhost:8081/classify".to_string(),
        classifier_timeout_ms: 5_000,
        classifier_max_chars: 512,
        classifier_concurrency: 4,
        fetch_page_size: 50,
        trend_interval_secs: 60,
        trend_window_secs: 3_600,
        alert_threshold: 8.5,
        propagation_weights: PropagationWeights::default(),
        supervisor_backoff_base_ms: 500,
        supervisor_backoff_max_ms: 30_000,
        shutdown_grace_secs: 10,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn profile_row_converts_to_domain_profile() {
    let row = SubjectProfileRow {
        subject: "alice".to_string(),
        mean_confidence: 0.783,
        mean_propagation: 41.85,
        item_count: 3,
        updated_at: Utc::now(),
    };

    let profile: SubjectProfile = row.into();
    assert_eq!(profile.subject, "alice");
    assert_eq!(profile.item_count, 3);
    assert!((profile.mean_propagation - 41.85).abs() < 1e-12);
}

#[test]
fn negative_item_count_converts_to_zero() {
    let row = SubjectProfileRow {
        subject: "bob".to_string(),
        mean_confidence: 0.5,
        mean_propagation: 1.0,
        item_count: -1,
        updated_at: Utc::now(),
    };

    let profile: SubjectProfile = row.into();
    assert_eq!(profile.item_count, 0);
}
