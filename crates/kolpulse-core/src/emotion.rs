use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// The closed set of emotions an item can be scored with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionLabel {
    Joy,
    Sadness,
    Anger,
    Fear,
    Surprise,
    Neutral,
}

impl EmotionLabel {
    pub const ALL: [EmotionLabel; 6] = [
        EmotionLabel::Joy,
        EmotionLabel::Sadness,
        EmotionLabel::Anger,
        EmotionLabel::Fear,
        EmotionLabel::Surprise,
        EmotionLabel::Neutral,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EmotionLabel::Joy => "joy",
            EmotionLabel::Sadness => "sadness",
            EmotionLabel::Anger => "anger",
            EmotionLabel::Fear => "fear",
            EmotionLabel::Surprise => "surprise",
            EmotionLabel::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmotionLabel {
    type Err = CoreError;

    /// Parses the canonical lowercase name. Classifier-native labels are
    /// mapped elsewhere; this only accepts names this crate produced.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EmotionLabel::ALL
            .into_iter()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| CoreError::InvalidEmotionLabel(s.to_string()))
    }
}

/// Per-label multipliers applied by the propagation scorer.
///
/// Values must stay fixed for a deployment, otherwise propagation scores
/// recorded before and after a change are not comparable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropagationWeights {
    pub joy: f64,
    pub sadness: f64,
    pub anger: f64,
    pub fear: f64,
    pub surprise: f64,
    pub neutral: f64,
}

impl Default for PropagationWeights {
    fn default() -> Self {
        Self {
            joy: 0.8,
            sadness: 0.9,
            anger: 1.2,
            fear: 1.1,
            surprise: 1.0,
            neutral: 0.5,
        }
    }
}

impl PropagationWeights {
    #[must_use]
    pub fn weight(&self, label: EmotionLabel) -> f64 {
        match label {
            EmotionLabel::Joy => self.joy,
            EmotionLabel::Sadness => self.sadness,
            EmotionLabel::Anger => self.anger,
            EmotionLabel::Fear => self.fear,
            EmotionLabel::Surprise => self.surprise,
            EmotionLabel::Neutral => self.neutral,
        }
    }

    fn slot_mut(&mut self, label: EmotionLabel) -> &mut f64 {
        match label {
            EmotionLabel::Joy => &mut self.joy,
            EmotionLabel::Sadness => &mut self.sadness,
            EmotionLabel::Anger => &mut self.anger,
            EmotionLabel::Fear => &mut self.fear,
            EmotionLabel::Surprise => &mut self.surprise,
            EmotionLabel::Neutral => &mut self.neutral,
        }
    }

    /// Apply `label=weight` overrides (comma separated) on top of the defaults.
    ///
    /// Blank input yields the defaults unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError`] for an unknown label, a malformed pair, or a
    /// weight that is negative or not finite.
    pub fn with_overrides(raw: &str) -> Result<Self, CoreError> {
        let mut weights = Self::default();

        for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (name, value) = pair.split_once('=').ok_or_else(|| CoreError::InvalidWeight {
                label: pair.to_string(),
                reason: "expected label=weight".to_string(),
            })?;
            let name = name.trim();
            let label: EmotionLabel = name.to_lowercase().parse()?;
            let weight: f64 = value
                .trim()
                .parse()
                .map_err(|e: std::num::ParseFloatError| CoreError::InvalidWeight {
                    label: name.to_string(),
                    reason: e.to_string(),
                })?;
            if !weight.is_finite() || weight < 0.0 {
                return Err(CoreError::InvalidWeight {
                    label: name.to_string(),
                    reason: format!("{weight} is not a non-negative finite number"),
                });
            }
            *weights.slot_mut(label) = weight;
        }

        Ok(weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_round_trips_through_str() {
        for label in EmotionLabel::ALL {
            assert_eq!(label.as_str().parse::<EmotionLabel>().unwrap(), label);
        }
    }

    #[test]
    fn label_parse_rejects_unknown() {
        let err = "disgust".parse::<EmotionLabel>().unwrap_err();
        assert!(matches!(err, CoreError::InvalidEmotionLabel(ref v) if v == "disgust"));
    }

    #[test]
    fn label_serializes_lowercase() {
        let json = serde_json::to_string(&EmotionLabel::Surprise).unwrap();
        assert_eq!(json, "\"surprise\"");
    }

    #[test]
    fn default_weights_rank_anger_highest_and_neutral_lowest() {
        let w = PropagationWeights::default();
        let max = EmotionLabel::ALL
            .into_iter()
            .max_by(|a, b| w.weight(*a).total_cmp(&w.weight(*b)))
            .unwrap();
        let min = EmotionLabel::ALL
            .into_iter()
            .min_by(|a, b| w.weight(*a).total_cmp(&w.weight(*b)))
            .unwrap();
        assert_eq!(max, EmotionLabel::Anger);
        assert_eq!(min, EmotionLabel::Neutral);
    }

    #[test]
    fn overrides_replace_only_named_labels() {
        let w = PropagationWeights::with_overrides(" anger=2.0, Neutral = 0.1 ").unwrap();
        assert!((w.anger - 2.0).abs() < f64::EPSILON);
        assert!((w.neutral - 0.1).abs() < f64::EPSILON);
        assert!((w.joy - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn blank_overrides_keep_defaults() {
        assert_eq!(
            PropagationWeights::with_overrides("").unwrap(),
            PropagationWeights::default()
        );
    }

    #[test]
    fn overrides_reject_negative_weight() {
        let err = PropagationWeights::with_overrides("fear=-1").unwrap_err();
        assert!(matches!(err, CoreError::InvalidWeight { ref label, .. } if label == "fear"));
    }

    #[test]
    fn overrides_reject_missing_equals() {
        assert!(PropagationWeights::with_overrides("anger").is_err());
    }

    #[test]
    fn overrides_reject_unknown_label() {
        let err = PropagationWeights::with_overrides("trust=1.0").unwrap_err();
        assert!(matches!(err, CoreError::InvalidEmotionLabel(_)));
    }
}
