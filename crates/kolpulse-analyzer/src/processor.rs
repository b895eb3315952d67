//! Classify, score, and persist a batch of items.

use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use kolpulse_core::{Item, PropagationWeights, ScoringResult};

use crate::classifier::{Classification, ClassifierAdapter};
use crate::propagation::{engagement_rate, propagation_score};
use crate::store::ItemStore;
use crate::types::{AnalyzerConfig, ItemScore};

pub struct ItemProcessor {
    classifier: ClassifierAdapter,
    store: Arc<dyn ItemStore>,
    weights: PropagationWeights,
    concurrency: usize,
}

impl ItemProcessor {
    #[must_use]
    pub fn new(
        classifier: ClassifierAdapter,
        store: Arc<dyn ItemStore>,
        config: &AnalyzerConfig,
    ) -> Self {
        Self {
            classifier,
            store,
            weights: config.weights,
            concurrency: config.classifier_concurrency.max(1),
        }
    }

    /// Process every item in `items` and return a score for each one that
    /// was persisted, in input order.
    ///
    /// Classifier failures never drop an item (it is scored as neutral).
    /// An item whose scoring cannot be saved is logged and left out; the
    /// rest of the batch continues.
    pub async fn process_batch(&self, items: &[Item]) -> Vec<ItemScore> {
        let pending: Vec<_> = items.iter().map(|item| self.process_item(item)).collect();
        let results: Vec<Option<ItemScore>> = stream::iter(pending)
            .buffered(self.concurrency)
            .collect()
            .await;

        results.into_iter().flatten().collect()
    }

    async fn process_item(&self, item: &Item) -> Option<ItemScore> {
        let classification = self.classifier.classify(&item.content).await;
        let scoring = self.score(item, classification);

        if let Err(e) = self.store.save_scoring(&item.item_id, &scoring).await {
            tracing::error!(
                item_id = %item.item_id,
                subject = %item.subject,
                error = %e,
                "failed to persist scoring; skipping item"
            );
            return None;
        }

        Some(ItemScore {
            item_id: item.item_id.clone(),
            subject: item.subject.clone(),
            emotion: scoring.emotion,
            confidence: scoring.confidence,
            propagation_score: scoring.propagation_score,
        })
    }

    fn score(&self, item: &Item, classification: Classification) -> ScoringResult {
        let rate = engagement_rate(item);
        ScoringResult {
            emotion: classification.emotion,
            confidence: classification.confidence,
            propagation_score: propagation_score(
                &self.weights,
                classification.emotion,
                classification.confidence,
                rate,
            ),
            engagement_rate: rate,
            raw_label: classification.raw_label,
            scored_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use kolpulse_core::{EmotionLabel, EngagementMetrics};

    use super::*;
    use crate::classifier::Classifier;
    use crate::memory::{MemoryStore, Script, ScriptedClassifier};

    fn item(id: &str, content: &str) -> Item {
        Item {
            item_id: id.to_string(),
            subject: "alice".to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
            metrics: EngagementMetrics {
                likes: 100,
                retweets: 50,
                replies: 10,
                views: 5_000,
            },
            audience_size: 1_000,
            scoring: None,
        }
    }

    fn processor(classifier: Arc<ScriptedClassifier>, store: Arc<MemoryStore>) -> ItemProcessor {
        let inner: Arc<dyn Classifier> = classifier;
        let adapter = ClassifierAdapter::new(inner, Duration::from_millis(50), 512);
        let config = AnalyzerConfig {
            classifier_concurrency: 3,
            ..AnalyzerConfig::default()
        };
        ItemProcessor::new(adapter, store, &config)
    }

    #[tokio::test]
    async fn scores_are_persisted_and_returned_in_input_order() {
        let store = Arc::new(MemoryStore::new());
        let items: Vec<Item> = (0..7)
            .map(|i| item(&format!("t-{i}"), &format!("text {i}")))
            .collect();
        for it in &items {
            store.insert(it.clone()).await;
        }
        let classifier = Arc::new(ScriptedClassifier::new("joy", 0.9));

        let scores = processor(classifier, store.clone())
            .process_batch(&items)
            .await;

        let ids: Vec<&str> = scores.iter().map(|s| s.item_id.as_str()).collect();
        assert_eq!(ids, ["t-0", "t-1", "t-2", "t-3", "t-4", "t-5", "t-6"]);
        for it in &items {
            let saved = store.item(&it.item_id).await.unwrap();
            let scoring = saved.scoring.expect("item should be scored");
            assert_eq!(scoring.emotion, EmotionLabel::Joy);
            assert!((scoring.engagement_rate - 0.215).abs() < 1e-12);
            // 0.8 * 0.81 * 10 * 1.215
            assert!((scoring.propagation_score - 7.873_2).abs() < 1e-9);
        }
    }

    #[tokio::test]
    async fn classifier_failure_still_scores_item_as_neutral() {
        let store = Arc::new(MemoryStore::new());
        let it = item("t-1", "boom");
        store.insert(it.clone()).await;
        let classifier = Arc::new(
            ScriptedClassifier::new("joy", 0.9).with("boom", Script::Fail("down".to_string())),
        );

        let scores = processor(classifier, store.clone())
            .process_batch(std::slice::from_ref(&it))
            .await;

        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].emotion, EmotionLabel::Neutral);
        assert!((scores[0].confidence - 0.5).abs() < f64::EPSILON);
        let saved = store.item("t-1").await.unwrap().scoring.unwrap();
        assert_eq!(saved.raw_label, None);
    }

    #[tokio::test]
    async fn persistence_failure_skips_only_that_item() {
        let store = Arc::new(MemoryStore::new());
        let items = vec![item("t-1", "a"), item("t-2", "b"), item("t-3", "c")];
        for it in &items {
            store.insert(it.clone()).await;
        }
        store.fail_saves_for("t-2").await;
        let classifier = Arc::new(ScriptedClassifier::new("fear", 0.6));

        let scores = processor(classifier, store.clone())
            .process_batch(&items)
            .await;

        let ids: Vec<&str> = scores.iter().map(|s| s.item_id.as_str()).collect();
        assert_eq!(ids, ["t-1", "t-3"]);
        assert!(store.item("t-2").await.unwrap().scoring.is_none());
    }

    #[tokio::test]
    async fn missing_item_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        let classifier = Arc::new(ScriptedClassifier::new("joy", 0.9));

        let scores = processor(classifier, store)
            .process_batch(&[item("ghost", "boo")])
            .await;

        assert!(scores.is_empty());
    }

    #[tokio::test]
    async fn batch_runs_on_a_spawned_task() {
        let store = Arc::new(MemoryStore::new());
        let items = vec![item("t-1", "a"), item("t-2", "b")];
        for it in &items {
            store.insert(it.clone()).await;
        }
        let classifier = Arc::new(ScriptedClassifier::new("anger", 0.9));
        let processor = Arc::new(processor(classifier, store.clone()));

        let handle = tokio::spawn(async move { processor.process_batch(&items).await });
        let scores = handle.await.unwrap();

        assert_eq!(scores.len(), 2);
        assert!(store.item("t-2").await.unwrap().scoring.is_some());
    }
}
