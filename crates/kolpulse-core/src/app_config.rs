use std::net::SocketAddr;

use crate::PropagationWeights;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub classifier_url: String,
    pub classifier_timeout_ms: u64,
    pub classifier_max_chars: usize,
    pub classifier_concurrency: usize,
    pub fetch_page_size: usize,
    pub trend_interval_secs: u64,
    pub trend_window_secs: u64,
    pub alert_threshold: f64,
    pub propagation_weights: PropagationWeights,
    pub supervisor_backoff_base_ms: u64,
    pub supervisor_backoff_max_ms: u64,
    pub shutdown_grace_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("classifier_url", &self.classifier_url)
            .field("classifier_timeout_ms", &self.classifier_timeout_ms)
            .field("classifier_max_chars", &self.classifier_max_chars)
            .field("classifier_concurrency", &self.classifier_concurrency)
            .field("fetch_page_size", &self.fetch_page_size)
            .field("trend_interval_secs", &self.trend_interval_secs)
            .field("trend_window_secs", &self.trend_window_secs)
            .field("alert_threshold", &self.alert_threshold)
            .field("propagation_weights", &self.propagation_weights)
            .field(
                "supervisor_backoff_base_ms",
                &self.supervisor_backoff_base_ms,
            )
            .field("supervisor_backoff_max_ms", &self.supervisor_backoff_max_ms)
            .field("shutdown_grace_secs", &self.shutdown_grace_secs)
            .finish()
    }
}
