//! PostgreSQL-backed [`ItemStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kolpulse_analyzer::{AnalyzerError, ItemStore};
use kolpulse_core::{Item, ScoringResult, SubjectProfile, TrendBucket};
use kolpulse_db::DbError;
use sqlx::PgPool;

#[derive(Clone)]
pub struct PgItemStore {
    pool: PgPool,
}

impl PgItemStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn store_error(e: &DbError) -> AnalyzerError {
    AnalyzerError::Store(e.to_string())
}

#[async_trait]
impl ItemStore for PgItemStore {
    async fn unscored_items(
        &self,
        subject: &str,
        limit: usize,
    ) -> Result<Vec<Item>, AnalyzerError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = kolpulse_db::list_unscored_items(&self.pool, subject, limit)
            .await
            .map_err(|e| store_error(&e))?;

        // A row that cannot be decoded is skipped so the rest of the page
        // still gets scored.
        let items = rows
            .into_iter()
            .filter_map(|row| {
                let item_id = row.item_id.clone();
                match row.into_item() {
                    Ok(item) => Some(item),
                    Err(e) => {
                        tracing::warn!(item_id = %item_id, error = %e, "skipping undecodable item row");
                        None
                    }
                }
            })
            .collect();
        Ok(items)
    }

    async fn save_scoring(
        &self,
        item_id: &str,
        scoring: &ScoringResult,
    ) -> Result<(), AnalyzerError> {
        kolpulse_db::update_item_scoring(&self.pool, item_id, scoring)
            .await
            .map_err(|e| match e {
                DbError::NotFound => AnalyzerError::NotFound(item_id.to_string()),
                other => store_error(&other),
            })
    }

    async fn save_profile(&self, profile: &SubjectProfile) -> Result<(), AnalyzerError> {
        kolpulse_db::upsert_subject_profile(&self.pool, profile)
            .await
            .map_err(|e| store_error(&e))
    }

    async fn trend_buckets(&self, since: DateTime<Utc>) -> Result<Vec<TrendBucket>, AnalyzerError> {
        let rows = kolpulse_db::list_trend_buckets(&self.pool, since)
            .await
            .map_err(|e| store_error(&e))?;

        rows.into_iter()
            .map(|row| row.into_bucket().map_err(|e| store_error(&e)))
            .collect()
    }
}
