use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latest-batch emotion snapshot for one subject.
///
/// Overwritten on every processed batch; it is not a lifetime average.
/// Field names on the wire follow the `emotion_updates` channel contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectProfile {
    #[serde(rename = "username")]
    pub subject: String,
    #[serde(rename = "emotionScore")]
    pub mean_confidence: f64,
    #[serde(rename = "propagationScore")]
    pub mean_propagation: f64,
    #[serde(rename = "itemCount")]
    pub item_count: u32,
    #[serde(rename = "lastAnalyzed")]
    pub updated_at: DateTime<Utc>,
}

impl SubjectProfile {
    /// Build a profile from `(confidence, propagation_score)` pairs of one batch.
    ///
    /// Returns `None` for an empty batch: an empty batch must never overwrite
    /// an existing profile.
    #[must_use]
    pub fn from_batch<I>(subject: &str, scores: I, updated_at: DateTime<Utc>) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut count = 0_u32;
        let mut confidence_sum = 0.0_f64;
        let mut propagation_sum = 0.0_f64;

        for (confidence, propagation) in scores {
            count += 1;
            confidence_sum += confidence;
            propagation_sum += propagation;
        }

        if count == 0 {
            return None;
        }

        let denom = f64::from(count);
        Some(Self {
            subject: subject.to_string(),
            mean_confidence: confidence_sum / denom,
            mean_propagation: propagation_sum / denom,
            item_count: count,
            updated_at,
        })
    }
}
