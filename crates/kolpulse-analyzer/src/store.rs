use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kolpulse_core::{Item, ScoringResult, SubjectProfile, TrendBucket};

use crate::error::AnalyzerError;

/// Persistent item and profile store as seen by the analyzer.
///
/// Only the notification consumer calls [`ItemStore::save_profile`].
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Unscored items for `subject`, oldest first, at most `limit`.
    async fn unscored_items(&self, subject: &str, limit: usize)
        -> Result<Vec<Item>, AnalyzerError>;

    /// Attach scoring to an existing item.
    ///
    /// Fails with [`AnalyzerError::NotFound`] if the item does not exist.
    async fn save_scoring(&self, item_id: &str, scoring: &ScoringResult)
        -> Result<(), AnalyzerError>;

    /// Replace the stored profile for `profile.subject`.
    async fn save_profile(&self, profile: &SubjectProfile) -> Result<(), AnalyzerError>;

    /// Per-emotion aggregates over items scored at or after `since`.
    async fn trend_buckets(&self, since: DateTime<Utc>) -> Result<Vec<TrendBucket>, AnalyzerError>;
}
