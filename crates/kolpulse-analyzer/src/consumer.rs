//! New-item notification consumer.
//!
//! One notification triggers one batch: fetch the subject's unscored items,
//! score them, overwrite the subject profile, and publish it.
//!
//! A profile that could not be saved or published is parked per subject and
//! delivered on the next attempt, even when no items are left to score.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use kolpulse_core::SubjectProfile;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::bus::{
    publish_json, EventBus, NewItemsEvent, ProfileMessage, NEW_ITEMS_CHANNEL,
    PROFILE_UPDATES_CHANNEL,
};
use crate::error::AnalyzerError;
use crate::processor::ItemProcessor;
use crate::store::ItemStore;
use crate::supervisor::Unit;
use crate::types::AnalyzerConfig;

/// What one notification led to.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsumerOutcome {
    /// Payload was malformed and dropped.
    Discarded,
    /// The subject had nothing left to score and nothing parked (e.g. a
    /// duplicate notification).
    NoPendingItems,
    /// Items were fetched but none could be persisted.
    NothingScored { fetched: usize },
    /// Profile stored and published. Either freshly computed or a parked
    /// profile delivered late.
    ProfileUpdated(SubjectProfile),
}

/// Profile whose save or publish failed.
#[derive(Debug)]
struct ParkedProfile {
    profile: SubjectProfile,
    saved: bool,
}

pub struct NotificationConsumer {
    store: Arc<dyn ItemStore>,
    bus: Arc<dyn EventBus>,
    processor: ItemProcessor,
    page_size: usize,
    parked: Mutex<HashMap<String, ParkedProfile>>,
}

impl NotificationConsumer {
    #[must_use]
    pub fn new(
        store: Arc<dyn ItemStore>,
        bus: Arc<dyn EventBus>,
        processor: ItemProcessor,
        config: &AnalyzerConfig,
    ) -> Self {
        Self {
            store,
            bus,
            processor,
            page_size: config.fetch_page_size.max(1),
            parked: Mutex::new(HashMap::new()),
        }
    }

    /// Number of subjects with an undelivered profile.
    pub async fn parked_profiles(&self) -> usize {
        self.parked.lock().await.len()
    }

    /// Handle one raw payload from [`NEW_ITEMS_CHANNEL`].
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read, or the profile cannot be
    /// saved or published. Malformed payloads are not errors; they yield
    /// [`ConsumerOutcome::Discarded`].
    pub async fn handle_payload(&self, payload: &str) -> Result<ConsumerOutcome, AnalyzerError> {
        match NewItemsEvent::parse(payload) {
            Ok(event) => self.handle_subject(&event.subject).await,
            Err(e) => {
                tracing::warn!(error = %e, "discarding malformed notification");
                Ok(ConsumerOutcome::Discarded)
            }
        }
    }

    /// Score the pending items of `subject` and refresh its profile.
    ///
    /// # Errors
    ///
    /// See [`NotificationConsumer::handle_payload`].
    pub async fn handle_subject(&self, subject: &str) -> Result<ConsumerOutcome, AnalyzerError> {
        let items = self.store.unscored_items(subject, self.page_size).await?;
        if items.is_empty() {
            return match self.take_parked(subject).await {
                Some(parked) => self.deliver(parked).await.map(ConsumerOutcome::ProfileUpdated),
                None => {
                    tracing::debug!(subject, "no unscored items");
                    Ok(ConsumerOutcome::NoPendingItems)
                }
            };
        }

        let scores = self.processor.process_batch(&items).await;
        let Some(profile) = SubjectProfile::from_batch(
            subject,
            scores.iter().map(|s| (s.confidence, s.propagation_score)),
            Utc::now(),
        ) else {
            tracing::warn!(subject, fetched = items.len(), "no items in batch were scored");
            if let Some(parked) = self.take_parked(subject).await {
                return self.deliver(parked).await.map(ConsumerOutcome::ProfileUpdated);
            }
            return Ok(ConsumerOutcome::NothingScored {
                fetched: items.len(),
            });
        };

        if self.take_parked(subject).await.is_some() {
            tracing::debug!(subject, "parked profile superseded by a newer batch");
        }
        self.deliver(ParkedProfile {
            profile,
            saved: false,
        })
        .await
        .map(ConsumerOutcome::ProfileUpdated)
    }

    /// Try again to deliver every parked profile.
    pub async fn retry_parked(&self) {
        let subjects: Vec<String> = self.parked.lock().await.keys().cloned().collect();
        for subject in subjects {
            let Some(parked) = self.take_parked(&subject).await else {
                continue;
            };
            if let Err(e) = self.deliver(parked).await {
                tracing::warn!(
                    subject = %subject,
                    error = %e,
                    "parked profile still undeliverable"
                );
            }
        }
    }

    async fn take_parked(&self, subject: &str) -> Option<ParkedProfile> {
        self.parked.lock().await.remove(subject)
    }

    async fn park(&self, parked: ParkedProfile) {
        self.parked
            .lock()
            .await
            .insert(parked.profile.subject.clone(), parked);
    }

    /// Save (unless already saved) and publish `parked`. On failure it is
    /// parked again.
    async fn deliver(&self, mut parked: ParkedProfile) -> Result<SubjectProfile, AnalyzerError> {
        if !parked.saved {
            if let Err(e) = self.store.save_profile(&parked.profile).await {
                self.park(parked).await;
                return Err(e);
            }
            parked.saved = true;
        }

        let published = publish_json(
            self.bus.as_ref(),
            PROFILE_UPDATES_CHANNEL,
            &ProfileMessage::EmotionUpdate(parked.profile.clone()),
        )
        .await;
        if let Err(e) = published {
            self.park(parked).await;
            return Err(e);
        }

        let profile = parked.profile;
        tracing::info!(
            subject = %profile.subject,
            scored = profile.item_count,
            mean_propagation = profile.mean_propagation,
            "subject profile updated"
        );
        Ok(profile)
    }

    /// Consume notifications until `cancel` fires.
    ///
    /// A batch already in progress is finished before returning.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription cannot be opened or is closed by
    /// the bus, so the supervisor can restart the consumer.
    pub async fn listen(&self, cancel: CancellationToken) -> Result<(), AnalyzerError> {
        let mut subscription = self.bus.subscribe(NEW_ITEMS_CHANNEL).await?;
        tracing::info!(channel = NEW_ITEMS_CHANNEL, "listening for new items");

        loop {
            let payload = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::info!("notification consumer stopping");
                    return Ok(());
                }
                payload = subscription.recv() => payload?,
            };

            self.retry_parked().await;

            match self.handle_payload(&payload).await {
                Ok(outcome) => tracing::debug!(?outcome, "notification handled"),
                Err(e) => tracing::error!(
                    error = %e,
                    transient = e.is_transient(),
                    "notification failed; waiting for the next one"
                ),
            }
        }
    }
}

#[async_trait]
impl Unit for NotificationConsumer {
    fn name(&self) -> &'static str {
        "notification-consumer"
    }

    async fn run(&self, cancel: CancellationToken) -> Result<(), AnalyzerError> {
        self.listen(cancel).await
    }
}
