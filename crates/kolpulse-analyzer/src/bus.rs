//! Event bus contract and the messages carried over it.

use async_trait::async_trait;
use kolpulse_core::SubjectProfile;
use serde::{Deserialize, Serialize};

use crate::error::AnalyzerError;

/// Collector → analyzer: a subject has new items.
pub const NEW_ITEMS_CHANNEL: &str = "new_tweets";
/// Analyzer → downstream: a subject profile was recomputed.
pub const PROFILE_UPDATES_CHANNEL: &str = "emotion_updates";
/// Analyzer → downstream: an emotion spike was detected.
pub const ALERTS_CHANNEL: &str = "alerts";

/// Publish/subscribe message bus with at-most-once delivery.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), AnalyzerError>;

    async fn subscribe(&self, channel: &str) -> Result<Box<dyn Subscription>, AnalyzerError>;
}

/// A live subscription to one channel.
#[async_trait]
pub trait Subscription: Send {
    /// Wait for the next payload.
    ///
    /// Fails with [`AnalyzerError::SubscriptionClosed`] once the bus drops
    /// the subscription; the caller should resubscribe.
    async fn recv(&mut self) -> Result<String, AnalyzerError>;
}

/// Payload on [`NEW_ITEMS_CHANNEL`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItemsEvent {
    #[serde(alias = "username")]
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(
        rename = "latestItemId",
        alias = "latest_item_id",
        alias = "latest_tweet_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub latest_item_id: Option<String>,
}

impl NewItemsEvent {
    /// Parse a raw bus payload.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::MalformedEvent`] if the payload is not JSON,
    /// lacks a subject, or the subject is blank.
    pub fn parse(payload: &str) -> Result<Self, AnalyzerError> {
        let mut event: Self = serde_json::from_str(payload)
            .map_err(|e| AnalyzerError::MalformedEvent(e.to_string()))?;
        let trimmed = event.subject.trim();
        if trimmed.is_empty() {
            return Err(AnalyzerError::MalformedEvent("blank subject".to_string()));
        }
        if trimmed.len() != event.subject.len() {
            event.subject = trimmed.to_string();
        }
        Ok(event)
    }
}

/// Payload on [`PROFILE_UPDATES_CHANNEL`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ProfileMessage {
    #[serde(rename = "kol_emotion_update")]
    EmotionUpdate(SubjectProfile),
}

/// Serialize `message` and publish it on `channel`.
///
/// # Errors
///
/// Returns [`AnalyzerError::Json`] if serialization fails, or whatever the
/// bus returns on publish.
pub async fn publish_json<T: Serialize + Sync>(
    bus: &dyn EventBus,
    channel: &str,
    message: &T,
) -> Result<(), AnalyzerError> {
    let payload = serde_json::to_string(message)?;
    bus.publish(channel, &payload).await
}
