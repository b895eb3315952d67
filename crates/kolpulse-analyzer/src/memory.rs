//! In-memory collaborators for tests and local runs without Postgres.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kolpulse_core::{Item, ScoringResult, SubjectProfile, TrendBucket};
use tokio::sync::{broadcast, Mutex};

use crate::bus::{EventBus, Subscription};
use crate::classifier::{Classifier, RawClassification};
use crate::error::AnalyzerError;
use crate::store::ItemStore;
use crate::trends::aggregate_buckets;

const CHANNEL_CAPACITY: usize = 256;

/// Item and profile store backed by maps.
#[derive(Default)]
pub struct MemoryStore {
    items: Mutex<BTreeMap<String, Item>>,
    profiles: Mutex<HashMap<String, SubjectProfile>>,
    failing_saves: Mutex<HashSet<String>>,
    profile_writes: AtomicUsize,
    rejecting_profiles: AtomicBool,
    unavailable: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an item as-is.
    pub async fn insert(&self, item: Item) {
        self.items.lock().await.insert(item.item_id.clone(), item);
    }

    pub async fn item(&self, item_id: &str) -> Option<Item> {
        self.items.lock().await.get(item_id).cloned()
    }

    pub async fn profile(&self, subject: &str) -> Option<SubjectProfile> {
        self.profiles.lock().await.get(subject).cloned()
    }

    /// Number of successful profile writes so far.
    #[must_use]
    pub fn profile_writes(&self) -> usize {
        self.profile_writes.load(Ordering::SeqCst)
    }

    /// Make every later `save_scoring` for `item_id` fail.
    pub async fn fail_saves_for(&self, item_id: &str) {
        self.failing_saves.lock().await.insert(item_id.to_string());
    }

    /// While set, only `save_profile` fails.
    pub fn set_rejecting_profiles(&self, rejecting: bool) {
        self.rejecting_profiles.store(rejecting, Ordering::SeqCst);
    }

    /// While set, every operation fails with [`AnalyzerError::Store`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), AnalyzerError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AnalyzerError::Store("store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn unscored_items(
        &self,
        subject: &str,
        limit: usize,
    ) -> Result<Vec<Item>, AnalyzerError> {
        self.check_available()?;
        let items = self.items.lock().await;
        let mut pending: Vec<Item> = items
            .values()
            .filter(|item| item.subject == subject && !item.is_scored())
            .cloned()
            .collect();
        pending.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.item_id.cmp(&b.item_id))
        });
        pending.truncate(limit);
        Ok(pending)
    }

    async fn save_scoring(
        &self,
        item_id: &str,
        scoring: &ScoringResult,
    ) -> Result<(), AnalyzerError> {
        self.check_available()?;
        if self.failing_saves.lock().await.contains(item_id) {
            return Err(AnalyzerError::Store(format!("write rejected for {item_id}")));
        }
        let mut items = self.items.lock().await;
        let item = items
            .get_mut(item_id)
            .ok_or_else(|| AnalyzerError::NotFound(item_id.to_string()))?;
        item.scoring = Some(scoring.clone());
        Ok(())
    }

    async fn save_profile(&self, profile: &SubjectProfile) -> Result<(), AnalyzerError> {
        self.check_available()?;
        if self.rejecting_profiles.load(Ordering::SeqCst) {
            return Err(AnalyzerError::Store(format!(
                "profile write rejected for {}",
                profile.subject
            )));
        }
        self.profiles
            .lock()
            .await
            .insert(profile.subject.clone(), profile.clone());
        self.profile_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn trend_buckets(&self, since: DateTime<Utc>) -> Result<Vec<TrendBucket>, AnalyzerError> {
        self.check_available()?;
        let items = self.items.lock().await;
        Ok(aggregate_buckets(
            items
                .values()
                .filter_map(|item| item.scoring.as_ref())
                .filter(|s| s.scored_at >= since)
                .map(|s| (s.emotion, s.confidence, s.propagation_score)),
        ))
    }
}

/// Bus backed by Tokio broadcast channels. Records every publish.
#[derive(Default)]
pub struct MemoryBus {
    channels: Mutex<HashMap<String, broadcast::Sender<String>>>,
    published: Mutex<Vec<(String, String)>>,
    unavailable: AtomicBool,
}

impl MemoryBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Payloads published on `channel`, oldest first.
    pub async fn published_on(&self, channel: &str) -> Vec<String> {
        self.published
            .lock()
            .await
            .iter()
            .filter(|(c, _)| c == channel)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    pub async fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .lock()
            .await
            .get(channel)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Drop every open subscription; their next `recv` fails.
    pub async fn close_all(&self) {
        self.channels.lock().await.clear();
    }

    /// While set, `publish` and `subscribe` fail with [`AnalyzerError::Bus`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), AnalyzerError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AnalyzerError::Bus("bus unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl EventBus for MemoryBus {
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), AnalyzerError> {
        self.check_available()?;
        self.published
            .lock()
            .await
            .push((channel.to_string(), payload.to_string()));
        if let Some(sender) = self.channels.lock().await.get(channel) {
            // No receivers is fine: delivery is at-most-once.
            let _ = sender.send(payload.to_string());
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<Box<dyn Subscription>, AnalyzerError> {
        self.check_available()?;
        let receiver = self
            .channels
            .lock()
            .await
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe();
        Ok(Box::new(MemorySubscription {
            channel: channel.to_string(),
            receiver,
        }))
    }
}

struct MemorySubscription {
    channel: String,
    receiver: broadcast::Receiver<String>,
}

#[async_trait]
impl Subscription for MemorySubscription {
    async fn recv(&mut self) -> Result<String, AnalyzerError> {
        loop {
            match self.receiver.recv().await {
                Ok(payload) => return Ok(payload),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(channel = %self.channel, skipped, "subscriber lagged; messages dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(AnalyzerError::SubscriptionClosed(self.channel.clone()));
                }
            }
        }
    }
}

/// Scripted behaviour for one input text.
#[derive(Debug, Clone)]
pub enum Script {
    Reply { label: String, confidence: f64 },
    Fail(String),
    /// Never answers; exercises the adapter timeout.
    Hang,
}

/// Classifier that answers from a script keyed by exact input text.
pub struct ScriptedClassifier {
    scripts: HashMap<String, Script>,
    default: Script,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl ScriptedClassifier {
    /// Answer `(label, confidence)` for any text without a script.
    #[must_use]
    pub fn new(label: &str, confidence: f64) -> Self {
        Self {
            scripts: HashMap::new(),
            default: Script::Reply {
                label: label.to_string(),
                confidence,
            },
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with(mut self, text: &str, script: Script) -> Self {
        self.scripts.insert(text.to_string(), script);
        self
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Texts received, in call order.
    pub async fn seen_texts(&self) -> Vec<String> {
        self.seen.lock().await.clone()
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(&self, text: &str) -> Result<RawClassification, AnalyzerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().await.push(text.to_string());

        match self.scripts.get(text).unwrap_or(&self.default) {
            Script::Reply { label, confidence } => Ok(RawClassification {
                label: label.clone(),
                confidence: *confidence,
            }),
            Script::Fail(reason) => Err(AnalyzerError::Classifier(reason.clone())),
            Script::Hang => std::future::pending().await,
        }
    }
}
