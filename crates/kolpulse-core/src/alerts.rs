use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::EmotionLabel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::High => write!(f, "high"),
        }
    }
}

/// Per-label aggregate of items scored inside the trend window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendBucket {
    pub emotion: EmotionLabel,
    pub count: u64,
    pub mean_confidence: f64,
    pub mean_propagation: f64,
}

/// Spike alert published on the `alerts` channel.
///
/// Serialises as `{"type":"emotion_spike", "emotion", "severity",
/// "propagation_score", "tweet_count", "timestamp"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "emotion_spike")]
pub struct AlertEvent {
    pub emotion: EmotionLabel,
    pub severity: Severity,
    pub propagation_score: f64,
    #[serde(rename = "tweet_count")]
    pub item_count: u64,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_serializes_with_type_tag() {
        let alert = AlertEvent {
            emotion: EmotionLabel::Anger,
            severity: Severity::High,
            propagation_score: 9.2,
            item_count: 10,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["type"], "emotion_spike");
        assert_eq!(json["emotion"], "anger");
        assert_eq!(json["severity"], "high");
        assert_eq!(json["propagation_score"], 9.2);
        assert_eq!(json["tweet_count"], 10);
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn alert_deserializes_from_wire_form() {
        let raw = r#"{"type":"emotion_spike","emotion":"fear","severity":"high",
            "propagation_score":12.5,"tweet_count":3,"timestamp":"2026-01-01T00:00:00Z"}"#;
        let alert: AlertEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(alert.emotion, EmotionLabel::Fear);
        assert_eq!(alert.item_count, 3);
    }
}
