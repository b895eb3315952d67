//! PostgreSQL `LISTEN`/`NOTIFY` [`EventBus`].

use async_trait::async_trait;
use kolpulse_analyzer::{AnalyzerError, EventBus, Subscription};
use sqlx::postgres::PgListener;
use sqlx::PgPool;

#[derive(Clone)]
pub struct PgBus {
    pool: PgPool,
}

impl PgBus {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open and drop a listener connection to prove the bus is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::Bus`] if no listener connection can be made.
    pub async fn verify(&self) -> Result<(), AnalyzerError> {
        PgListener::connect_with(&self.pool)
            .await
            .map(drop)
            .map_err(|e| AnalyzerError::Bus(format!("listener connect failed: {e}")))
    }
}

#[async_trait]
impl EventBus for PgBus {
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), AnalyzerError> {
        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(channel)
            .bind(payload)
            .execute(&self.pool)
            .await
            .map_err(|e| AnalyzerError::Bus(format!("publish to '{channel}' failed: {e}")))?;
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<Box<dyn Subscription>, AnalyzerError> {
        let mut listener = PgListener::connect_with(&self.pool)
            .await
            .map_err(|e| AnalyzerError::Bus(format!("listener connect failed: {e}")))?;
        listener
            .listen(channel)
            .await
            .map_err(|e| AnalyzerError::Bus(format!("LISTEN {channel} failed: {e}")))?;

        Ok(Box::new(PgSubscription {
            channel: channel.to_string(),
            listener,
        }))
    }
}

struct PgSubscription {
    channel: String,
    listener: PgListener,
}

#[async_trait]
impl Subscription for PgSubscription {
    /// Notifications sent while the connection is down are lost, so a lost
    /// connection is reported as closed instead of silently reconnecting.
    async fn recv(&mut self) -> Result<String, AnalyzerError> {
        match self.listener.try_recv().await {
            Ok(Some(notification)) => Ok(notification.payload().to_string()),
            Ok(None) => Err(AnalyzerError::SubscriptionClosed(self.channel.clone())),
            Err(e) => Err(AnalyzerError::Bus(format!(
                "receive on '{}' failed: {e}",
                self.channel
            ))),
        }
    }
}
