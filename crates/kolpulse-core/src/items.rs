use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::EmotionLabel;

/// Raw engagement counters captured alongside an item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    pub likes: u64,
    pub retweets: u64,
    pub replies: u64,
    /// Stored for reporting only; not part of the engagement rate.
    pub views: u64,
}

/// One post to be scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub item_id: String,
    /// Author account the item belongs to.
    pub subject: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub metrics: EngagementMetrics,
    /// Follower count of the author at collection time. May be 0.
    pub audience_size: u64,
    pub scoring: Option<ScoringResult>,
}

impl Item {
    /// Audience size used as the engagement-rate denominator, never below 1.
    #[must_use]
    pub fn effective_audience(&self) -> u64 {
        self.audience_size.max(1)
    }

    #[must_use]
    pub fn is_scored(&self) -> bool {
        self.scoring.is_some()
    }
}

/// Result of scoring one item, persisted onto the item record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringResult {
    pub emotion: EmotionLabel,
    /// In `[0.0, 1.0]`.
    pub confidence: f64,
    /// Non-negative and unbounded above.
    pub propagation_score: f64,
    pub engagement_rate: f64,
    /// Label as reported by the classifier, before mapping. `None` when the
    /// neutral fallback was used.
    pub raw_label: Option<String>,
    pub scored_at: DateTime<Utc>,
}
