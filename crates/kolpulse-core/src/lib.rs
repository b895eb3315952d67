//! Shared domain types and configuration for kolpulse.

pub mod alerts;
pub mod app_config;
pub mod config;
pub mod emotion;
pub mod items;
pub mod profiles;

use thiserror::Error;

pub use alerts::{AlertEvent, Severity, TrendBucket};
pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use emotion::{EmotionLabel, PropagationWeights};
pub use items::{EngagementMetrics, Item, ScoringResult};
pub use profiles::SubjectProfile;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid emotion label: {0}")]
    InvalidEmotionLabel(String),

    #[error("invalid propagation weight for '{label}': {reason}")]
    InvalidWeight { label: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
