//! Emotion analysis engine for KOL Pulse.
//!
//! Consumes new-item notifications, classifies item text into one of six
//! emotions, scores how far each item is likely to propagate, keeps a
//! per-subject profile of the latest batch, and raises alerts when an
//! emotion spikes across the recent window.

pub mod bus;
pub mod classifier;
pub mod consumer;
pub mod error;
pub mod http_classifier;
pub mod memory;
pub mod processor;
pub mod propagation;
pub mod store;
pub mod supervisor;
pub mod trends;
pub mod types;

pub use bus::{
    publish_json, EventBus, NewItemsEvent, ProfileMessage, Subscription, ALERTS_CHANNEL,
    NEW_ITEMS_CHANNEL, PROFILE_UPDATES_CHANNEL,
};
pub use classifier::{
    map_label, Classification, Classifier, ClassifierAdapter, RawClassification,
    FALLBACK_CONFIDENCE,
};
pub use consumer::{ConsumerOutcome, NotificationConsumer};
pub use error::AnalyzerError;
pub use http_classifier::HttpClassifier;
pub use processor::ItemProcessor;
pub use propagation::{engagement_rate, propagation_score};
pub use store::ItemStore;
pub use supervisor::{ShutdownReport, Supervisor, SupervisorConfig, Unit};
pub use trends::{detect_spikes, TrendDetector};
pub use types::{AnalyzerConfig, ItemScore};
