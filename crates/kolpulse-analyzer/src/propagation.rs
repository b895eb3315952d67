//! Propagation scorer: how strongly an item's emotion is likely to spread.

use kolpulse_core::{EmotionLabel, Item, PropagationWeights};

/// Fixed multiplier applied to `weight × confidence²`.
pub const PROPAGATION_SCALE: f64 = 10.0;

const RETWEET_FACTOR: f64 = 2.0;
const REPLY_FACTOR: f64 = 1.5;

/// Weighted engagement normalised by audience size.
///
/// `(likes + 2×retweets + 1.5×replies) / max(audience_size, 1)`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn engagement_rate(item: &Item) -> f64 {
    let metrics = &item.metrics;
    let weighted = metrics.likes as f64
        + metrics.retweets as f64 * RETWEET_FACTOR
        + metrics.replies as f64 * REPLY_FACTOR;
    weighted / item.effective_audience() as f64
}

/// `weight(label) × confidence² × 10`.
///
/// Squaring the confidence keeps weak classifications near zero while
/// confident ones dominate.
#[must_use]
pub fn base_propagation(weights: &PropagationWeights, label: EmotionLabel, confidence: f64) -> f64 {
    let confidence = confidence.clamp(0.0, 1.0);
    weights.weight(label) * confidence * confidence * PROPAGATION_SCALE
}

/// Final propagation score: `base × (1 + engagement_rate)`.
///
/// Not clamped above; a viral outlier can score arbitrarily high.
#[must_use]
pub fn propagation_score(
    weights: &PropagationWeights,
    label: EmotionLabel,
    confidence: f64,
    engagement_rate: f64,
) -> f64 {
    base_propagation(weights, label, confidence) * (1.0 + engagement_rate.max(0.0))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use kolpulse_core::EngagementMetrics;

    use super::*;

    fn item(likes: u64, retweets: u64, replies: u64, audience_size: u64) -> Item {
        Item {
            item_id: "t-1".to_string(),
            subject: "alice".to_string(),
            content: "hello".to_string(),
            created_at: Utc::now(),
            metrics: EngagementMetrics {
                likes,
                retweets,
                replies,
                views: 0,
            },
            audience_size,
            scoring: None,
        }
    }

    #[test]
    fn engagement_rate_weights_retweets_and_replies() {
        let rate = engagement_rate(&item(100, 50, 10, 1_000));
        assert!((rate - 0.215).abs() < 1e-12, "got {rate}");
    }

    #[test]
    fn engagement_rate_ignores_views() {
        let mut it = item(10, 0, 0, 10);
        let without = engagement_rate(&it);
        it.metrics.views = 1_000_000;
        assert!((engagement_rate(&it) - without).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_audience_is_treated_as_one() {
        let rate = engagement_rate(&item(3, 1, 2, 0));
        assert!((rate - 8.0).abs() < 1e-12, "got {rate}");
        assert!(rate.is_finite());
    }

    #[test]
    fn base_propagation_matches_formula() {
        let w = PropagationWeights::default();
        let joy = base_propagation(&w, EmotionLabel::Joy, 0.9);
        assert!((joy - 6.48).abs() < 1e-9, "got {joy}");
        let neutral = base_propagation(&w, EmotionLabel::Neutral, 0.5);
        assert!((neutral - 1.25).abs() < 1e-9, "got {neutral}");
    }

    #[test]
    fn engagement_boosts_multiplicatively() {
        let w = PropagationWeights::default();
        let score = propagation_score(&w, EmotionLabel::Anger, 0.95, 9.75);
        assert!((score - 116.4225).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn monotonic_in_confidence() {
        let w = PropagationWeights::default();
        for label in EmotionLabel::ALL {
            let mut previous = f64::NEG_INFINITY;
            for step in 0..=100 {
                let c = f64::from(step) / 100.0;
                let score = propagation_score(&w, label, c, 0.3);
                assert!(score >= previous, "{label}: {score} < {previous} at c={c}");
                previous = score;
            }
        }
    }

    #[test]
    fn monotonic_in_engagement_rate() {
        let w = PropagationWeights::default();
        for label in EmotionLabel::ALL {
            let mut previous = f64::NEG_INFINITY;
            for step in 0..=200 {
                let e = f64::from(step) * 0.25;
                let score = propagation_score(&w, label, 0.7, e);
                assert!(score >= previous, "{label}: {score} < {previous} at e={e}");
                previous = score;
            }
        }
    }

    #[test]
    fn low_confidence_is_suppressed_non_linearly() {
        let w = PropagationWeights::default();
        let weak = base_propagation(&w, EmotionLabel::Anger, 0.2);
        let strong = base_propagation(&w, EmotionLabel::Anger, 0.4);
        // Doubling confidence quadruples the base score.
        assert!((strong / weak - 4.0).abs() < 1e-9);
    }

    #[test]
    fn huge_engagement_is_not_clamped() {
        let w = PropagationWeights::default();
        let score = propagation_score(&w, EmotionLabel::Neutral, 1.0, 1.0e9);
        assert!(score > 1.0e9);
    }
}
