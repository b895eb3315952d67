//! Periodic trend detection over recently scored items.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use kolpulse_core::{AlertEvent, EmotionLabel, Severity, TrendBucket};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::bus::{publish_json, EventBus, ALERTS_CHANNEL};
use crate::error::AnalyzerError;
use crate::store::ItemStore;
use crate::supervisor::Unit;
use crate::types::AnalyzerConfig;

/// Group `(emotion, confidence, propagation_score)` triples into one bucket
/// per emotion, ordered by emotion.
pub fn aggregate_buckets<I>(scores: I) -> Vec<TrendBucket>
where
    I: IntoIterator<Item = (EmotionLabel, f64, f64)>,
{
    let mut sums: BTreeMap<EmotionLabel, (u64, f64, f64)> = BTreeMap::new();
    for (emotion, confidence, propagation) in scores {
        let entry = sums.entry(emotion).or_insert((0, 0.0, 0.0));
        entry.0 += 1;
        entry.1 += confidence;
        entry.2 += propagation;
    }

    sums.into_iter()
        .map(|(emotion, (count, confidence, propagation))| {
            #[allow(clippy::cast_precision_loss)]
            let n = count as f64;
            TrendBucket {
                emotion,
                count,
                mean_confidence: confidence / n,
                mean_propagation: propagation / n,
            }
        })
        .collect()
}

/// One high-severity alert per bucket whose mean propagation is strictly
/// above `threshold`.
#[must_use]
pub fn detect_spikes(buckets: &[TrendBucket], threshold: f64, now: DateTime<Utc>) -> Vec<AlertEvent> {
    buckets
        .iter()
        .filter(|b| b.count > 0 && b.mean_propagation > threshold)
        .map(|b| AlertEvent {
            emotion: b.emotion,
            severity: Severity::High,
            propagation_score: b.mean_propagation,
            item_count: b.count,
            timestamp: now,
        })
        .collect()
}

pub struct TrendDetector {
    store: Arc<dyn ItemStore>,
    bus: Arc<dyn EventBus>,
    interval: Duration,
    window: Duration,
    threshold: f64,
}

impl TrendDetector {
    #[must_use]
    pub fn new(store: Arc<dyn ItemStore>, bus: Arc<dyn EventBus>, config: &AnalyzerConfig) -> Self {
        Self {
            store,
            bus,
            interval: config.trend_interval,
            window: config.trend_window,
            threshold: config.alert_threshold,
        }
    }

    /// Run one detection pass ending at `now` and publish any spikes.
    ///
    /// Returns the alerts that were published. A failed publish is logged
    /// and does not stop the remaining alerts.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<Vec<AlertEvent>, AnalyzerError> {
        let since = TimeDelta::from_std(self.window)
            .ok()
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let buckets = self.store.trend_buckets(since).await?;
        let alerts = detect_spikes(&buckets, self.threshold, now);

        let mut published = Vec::with_capacity(alerts.len());
        for alert in alerts {
            tracing::warn!(
                emotion = %alert.emotion,
                propagation_score = alert.propagation_score,
                count = alert.item_count,
                "emotion spike detected"
            );
            match publish_json(self.bus.as_ref(), ALERTS_CHANNEL, &alert).await {
                Ok(()) => published.push(alert),
                Err(e) => tracing::error!(
                    emotion = %alert.emotion,
                    error = %e,
                    "failed to publish alert"
                ),
            }
        }

        tracing::debug!(buckets = buckets.len(), alerts = published.len(), "trend tick complete");
        Ok(published)
    }

    /// Tick every interval until `cancel` fires. The first tick runs
    /// immediately. A failed tick is logged and skipped.
    ///
    /// # Errors
    ///
    /// Does not fail; the signature matches [`Unit::run`].
    pub async fn schedule(&self, cancel: CancellationToken) -> Result<(), AnalyzerError> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            window_secs = self.window.as_secs(),
            threshold = self.threshold,
            "trend detector started"
        );

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::info!("trend detector stopping");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.tick(Utc::now()).await {
                        tracing::warn!(error = %e, "trend tick skipped");
                    }
                }
            }
        }
    }
}

#[async_trait]
impl Unit for TrendDetector {
    fn name(&self) -> &'static str {
        "trend-detector"
    }

    async fn run(&self, cancel: CancellationToken) -> Result<(), AnalyzerError> {
        self.schedule(cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(emotion: EmotionLabel, count: u64, mean_propagation: f64) -> TrendBucket {
        TrendBucket {
            emotion,
            count,
            mean_confidence: 0.8,
            mean_propagation,
        }
    }

    #[test]
    fn aggregates_per_emotion() {
        let buckets = aggregate_buckets(vec![
            (EmotionLabel::Anger, 0.9, 10.0),
            (EmotionLabel::Joy, 0.5, 2.0),
            (EmotionLabel::Anger, 0.7, 6.0),
        ]);

        assert_eq!(buckets.len(), 2);
        let anger = buckets
            .iter()
            .find(|b| b.emotion == EmotionLabel::Anger)
            .unwrap();
        assert_eq!(anger.count, 2);
        assert!((anger.mean_confidence - 0.8).abs() < 1e-12);
        assert!((anger.mean_propagation - 8.0).abs() < 1e-12);
    }

    #[test]
    fn empty_input_has_no_buckets() {
        assert!(aggregate_buckets(Vec::new()).is_empty());
    }

    #[test]
    fn spike_above_threshold_alerts() {
        let now = Utc::now();
        let alerts = detect_spikes(&[bucket(EmotionLabel::Anger, 10, 9.2)], 8.5, now);

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].emotion, EmotionLabel::Anger);
        assert_eq!(alerts[0].severity, Severity::High);
        assert_eq!(alerts[0].item_count, 10);
        assert_eq!(alerts[0].timestamp, now);
    }

    #[test]
    fn threshold_is_exclusive() {
        assert!(detect_spikes(&[bucket(EmotionLabel::Fear, 4, 8.5)], 8.5, Utc::now()).is_empty());
    }

    #[test]
    fn quiet_window_raises_nothing() {
        let buckets: Vec<TrendBucket> = EmotionLabel::ALL
            .into_iter()
            .map(|e| bucket(e, 5, 8.0))
            .collect();
        assert!(detect_spikes(&buckets, 8.5, Utc::now()).is_empty());
    }

    #[test]
    fn one_alert_per_spiking_emotion() {
        let buckets = vec![
            bucket(EmotionLabel::Anger, 3, 12.0),
            bucket(EmotionLabel::Joy, 3, 1.0),
            bucket(EmotionLabel::Surprise, 1, 30.0),
        ];
        let emotions: Vec<EmotionLabel> = detect_spikes(&buckets, 8.5, Utc::now())
            .into_iter()
            .map(|a| a.emotion)
            .collect();
        assert_eq!(emotions, [EmotionLabel::Anger, EmotionLabel::Surprise]);
    }
}
