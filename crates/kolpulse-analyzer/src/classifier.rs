//! Classifier contract and the adapter that makes it safe to call per item.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kolpulse_core::EmotionLabel;
use serde::Deserialize;

use crate::error::AnalyzerError;
use crate::types::AnalyzerConfig;

/// Confidence reported with the neutral fallback.
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

/// Classifier-native labels and the emotion each one maps to.
///
/// Matching is ASCII case-insensitive. Labels not listed map to
/// [`EmotionLabel::Neutral`].
pub(crate) const LABEL_TABLE: &[(&str, EmotionLabel)] = &[
    // Binary sentiment models
    ("positive", EmotionLabel::Joy),
    ("negative", EmotionLabel::Sadness),
    ("neutral", EmotionLabel::Neutral),
    // Emotion models that already speak our vocabulary
    ("joy", EmotionLabel::Joy),
    ("sadness", EmotionLabel::Sadness),
    ("anger", EmotionLabel::Anger),
    ("fear", EmotionLabel::Fear),
    ("surprise", EmotionLabel::Surprise),
];

/// Output of the underlying model, before mapping.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawClassification {
    pub label: String,
    #[serde(alias = "score")]
    pub confidence: f64,
}

/// An external text classifier.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify one non-empty, already truncated text.
    async fn classify(&self, text: &str) -> Result<RawClassification, AnalyzerError>;
}

/// Mapped classification as used by the scorer.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub emotion: EmotionLabel,
    pub confidence: f64,
    /// `None` when the neutral fallback was used.
    pub raw_label: Option<String>,
}

impl Classification {
    #[must_use]
    pub fn neutral_fallback() -> Self {
        Self {
            emotion: EmotionLabel::Neutral,
            confidence: FALLBACK_CONFIDENCE,
            raw_label: None,
        }
    }
}

/// Map a classifier-native label onto the closed emotion set.
#[must_use]
pub fn map_label(raw: &str) -> EmotionLabel {
    let raw = raw.trim();
    LABEL_TABLE
        .iter()
        .find(|(native, _)| native.eq_ignore_ascii_case(raw))
        .map_or(EmotionLabel::Neutral, |&(_, label)| label)
}

/// Cut `text` to at most `max_chars` Unicode scalar values.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Wraps a [`Classifier`] with trimming, truncation, a timeout, and the
/// neutral fallback. Never fails.
#[derive(Clone)]
pub struct ClassifierAdapter {
    inner: Arc<dyn Classifier>,
    timeout: Duration,
    max_chars: usize,
}

impl ClassifierAdapter {
    #[must_use]
    pub fn new(inner: Arc<dyn Classifier>, timeout: Duration, max_chars: usize) -> Self {
        Self {
            inner,
            timeout,
            max_chars,
        }
    }

    #[must_use]
    pub fn from_config(inner: Arc<dyn Classifier>, config: &AnalyzerConfig) -> Self {
        Self::new(inner, config.classifier_timeout, config.classifier_max_chars)
    }

    /// Classify `text`, falling back to `(neutral, 0.5)` on blank input or
    /// any classifier failure. Failures are logged, not returned.
    pub async fn classify(&self, text: &str) -> Classification {
        let text = text.trim();
        if text.is_empty() {
            return Classification::neutral_fallback();
        }

        match self.try_classify(truncate_chars(text, self.max_chars)).await {
            Ok(classification) => classification,
            Err(e @ AnalyzerError::ClassifierTimeout(_)) => {
                tracing::warn!(error = %e, "classifier timed out; using neutral fallback");
                Classification::neutral_fallback()
            }
            Err(e) => {
                tracing::error!(error = %e, "classifier failed; using neutral fallback");
                Classification::neutral_fallback()
            }
        }
    }

    async fn try_classify(&self, text: &str) -> Result<Classification, AnalyzerError> {
        let raw = tokio::time::timeout(self.timeout, self.inner.classify(text))
            .await
            .map_err(|_| AnalyzerError::ClassifierTimeout(self.timeout))??;

        if !raw.confidence.is_finite() || !(0.0..=1.0).contains(&raw.confidence) {
            return Err(AnalyzerError::MalformedClassification(format!(
                "confidence {} outside [0, 1] for label '{}'",
                raw.confidence, raw.label
            )));
        }

        Ok(Classification {
            emotion: map_label(&raw.label),
            confidence: raw.confidence,
            raw_label: Some(raw.label),
        })
    }
}
