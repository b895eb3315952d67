use std::time::Duration;

use kolpulse_core::{AppConfig, EmotionLabel, PropagationWeights};

/// Tunables for the scoring pipeline.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Upper bound on one classifier call.
    pub classifier_timeout: Duration,
    /// Text is cut to this many characters before classification.
    pub classifier_max_chars: usize,
    /// Items classified concurrently within one batch.
    pub classifier_concurrency: usize,
    /// Unscored items fetched per notification.
    pub fetch_page_size: usize,
    pub trend_interval: Duration,
    pub trend_window: Duration,
    /// Mean propagation strictly above this raises an alert.
    pub alert_threshold: f64,
    pub weights: PropagationWeights,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            classifier_timeout: Duration::from_secs(5),
            classifier_max_chars: 512,
            classifier_concurrency: 4,
            fetch_page_size: 50,
            trend_interval: Duration::from_secs(60),
            trend_window: Duration::from_secs(3600),
            alert_threshold: 8.5,
            weights: PropagationWeights::default(),
        }
    }
}

impl AnalyzerConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            classifier_timeout: Duration::from_millis(config.classifier_timeout_ms),
            classifier_max_chars: config.classifier_max_chars,
            classifier_concurrency: config.classifier_concurrency,
            fetch_page_size: config.fetch_page_size,
            trend_interval: Duration::from_secs(config.trend_interval_secs),
            trend_window: Duration::from_secs(config.trend_window_secs),
            alert_threshold: config.alert_threshold,
            weights: config.propagation_weights,
        }
    }
}

/// Per-item summary returned by the item processor.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemScore {
    pub item_id: String,
    pub subject: String,
    pub emotion: EmotionLabel,
    pub confidence: f64,
    pub propagation_score: f64,
}
