//! Database operations for the `items` table.

use chrono::{DateTime, Utc};
use kolpulse_core::{EmotionLabel, EngagementMetrics, Item, ScoringResult, TrendBucket};
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ItemRow {
    pub item_id: String,
    pub subject: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub likes: i64,
    pub retweets: i64,
    pub replies: i64,
    pub views: i64,
    pub audience_size: i64,
    pub emotion: Option<String>,
    pub confidence: Option<f64>,
    pub propagation_score: Option<f64>,
    pub engagement_rate: Option<f64>,
    pub raw_label: Option<String>,
    pub scored_at: Option<DateTime<Utc>>,
    pub collected_at: DateTime<Utc>,
}

/// One `GROUP BY emotion` row of the trend query.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TrendBucketRow {
    pub emotion: String,
    pub item_count: i64,
    pub mean_confidence: f64,
    pub mean_propagation: f64,
}

const ITEM_COLUMNS: &str = "item_id, subject, content, created_at, likes, retweets, replies, \
     views, audience_size, emotion, confidence, propagation_score, engagement_rate, raw_label, \
     scored_at, collected_at";

fn count_to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn count_to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn parse_label(raw: &str) -> Result<EmotionLabel, DbError> {
    raw.parse().map_err(|e: kolpulse_core::CoreError| DbError::InvalidData {
        column: "emotion",
        reason: e.to_string(),
    })
}

impl ItemRow {
    /// Convert to the domain type.
    ///
    /// The scoring result is present only when every scoring column is set.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidData`] if the stored emotion is not a known label.
    pub fn into_item(self) -> Result<Item, DbError> {
        let scoring = match (
            self.emotion,
            self.confidence,
            self.propagation_score,
            self.engagement_rate,
            self.scored_at,
        ) {
            (
                Some(emotion),
                Some(confidence),
                Some(propagation_score),
                Some(engagement_rate),
                Some(scored_at),
            ) => Some(ScoringResult {
                emotion: parse_label(&emotion)?,
                confidence,
                propagation_score,
                engagement_rate,
                raw_label: self.raw_label,
                scored_at,
            }),
            _ => None,
        };

        Ok(Item {
            item_id: self.item_id,
            subject: self.subject,
            content: self.content,
            created_at: self.created_at,
            metrics: EngagementMetrics {
                likes: count_to_u64(self.likes),
                retweets: count_to_u64(self.retweets),
                replies: count_to_u64(self.replies),
                views: count_to_u64(self.views),
            },
            audience_size: count_to_u64(self.audience_size),
            scoring,
        })
    }
}

impl TrendBucketRow {
    /// # Errors
    ///
    /// Returns [`DbError::InvalidData`] if the stored emotion is not a known label.
    pub fn into_bucket(self) -> Result<TrendBucket, DbError> {
        Ok(TrendBucket {
            emotion: parse_label(&self.emotion)?,
            count: count_to_u64(self.item_count),
            mean_confidence: self.mean_confidence,
            mean_propagation: self.mean_propagation,
        })
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Insert or refresh a raw item keyed by `item_id`.
///
/// Content, metrics and audience are refreshed on conflict; scoring columns
/// are left untouched so a re-collected item keeps its score.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_item(pool: &PgPool, item: &Item) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO items \
             (item_id, subject, content, created_at, likes, retweets, replies, views, audience_size) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         ON CONFLICT (item_id) DO UPDATE SET \
             subject = EXCLUDED.subject, \
             content = EXCLUDED.content, \
             created_at = EXCLUDED.created_at, \
             likes = EXCLUDED.likes, \
             retweets = EXCLUDED.retweets, \
             replies = EXCLUDED.replies, \
             views = EXCLUDED.views, \
             audience_size = EXCLUDED.audience_size",
    )
    .bind(&item.item_id)
    .bind(&item.subject)
    .bind(&item.content)
    .bind(item.created_at)
    .bind(count_to_i64(item.metrics.likes))
    .bind(count_to_i64(item.metrics.retweets))
    .bind(count_to_i64(item.metrics.replies))
    .bind(count_to_i64(item.metrics.views))
    .bind(count_to_i64(item.audience_size))
    .execute(pool)
    .await?;

    Ok(())
}

/// Return one item by id, or `None` if it does not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_item(pool: &PgPool, item_id: &str) -> Result<Option<ItemRow>, DbError> {
    let row = sqlx::query_as::<_, ItemRow>(&format!(
        "SELECT {ITEM_COLUMNS} FROM items WHERE item_id = $1"
    ))
    .bind(item_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// List items of `subject` that have not been scored yet, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_unscored_items(
    pool: &PgPool,
    subject: &str,
    limit: i64,
) -> Result<Vec<ItemRow>, DbError> {
    let rows = sqlx::query_as::<_, ItemRow>(&format!(
        "SELECT {ITEM_COLUMNS} FROM items \
         WHERE subject = $1 AND scored_at IS NULL \
         ORDER BY created_at ASC, item_id ASC \
         LIMIT $2"
    ))
    .bind(subject)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Write a scoring result onto an existing item.
///
/// Rescoring overwrites the previous result.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no item has `item_id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_item_scoring(
    pool: &PgPool,
    item_id: &str,
    scoring: &ScoringResult,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE items SET \
             emotion = $2, \
             confidence = $3, \
             propagation_score = $4, \
             engagement_rate = $5, \
             raw_label = $6, \
             scored_at = $7 \
         WHERE item_id = $1",
    )
    .bind(item_id)
    .bind(scoring.emotion.as_str())
    .bind(scoring.confidence)
    .bind(scoring.propagation_score)
    .bind(scoring.engagement_rate)
    .bind(scoring.raw_label.as_deref())
    .bind(scoring.scored_at)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Aggregate items scored at or after `since`, grouped by emotion.
///
/// Ordered by emotion name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_trend_buckets(
    pool: &PgPool,
    since: DateTime<Utc>,
) -> Result<Vec<TrendBucketRow>, DbError> {
    let rows = sqlx::query_as::<_, TrendBucketRow>(
        "SELECT emotion, \
                COUNT(*) AS item_count, \
                AVG(confidence) AS mean_confidence, \
                AVG(propagation_score) AS mean_propagation \
         FROM items \
         WHERE scored_at >= $1 AND emotion IS NOT NULL \
         GROUP BY emotion \
         ORDER BY emotion",
    )
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> ItemRow {
        ItemRow {
            item_id: "t-1".to_string(),
            subject: "alice".to_string(),
            content: "hi".to_string(),
            created_at: Utc::now(),
            likes: 3,
            retweets: 2,
            replies: 1,
            views: 100,
            audience_size: 0,
            emotion: None,
            confidence: None,
            propagation_score: None,
            engagement_rate: None,
            raw_label: None,
            scored_at: None,
            collected_at: Utc::now(),
        }
    }

    #[test]
    fn unscored_row_converts_without_scoring() {
        let item = row().into_item().unwrap();
        assert!(item.scoring.is_none());
        assert_eq!(item.metrics.likes, 3);
        assert_eq!(item.audience_size, 0);
        assert_eq!(item.effective_audience(), 1);
    }

    #[test]
    fn scored_row_converts_with_scoring() {
        let mut r = row();
        r.emotion = Some("anger".to_string());
        r.confidence = Some(0.95);
        r.propagation_score = Some(116.4);
        r.engagement_rate = Some(9.75);
        r.raw_label = Some("ANGER".to_string());
        r.scored_at = Some(Utc::now());
        let scoring = r.into_item().unwrap().scoring.unwrap();
        assert_eq!(scoring.emotion, EmotionLabel::Anger);
        assert_eq!(scoring.raw_label.as_deref(), Some("ANGER"));
    }

    #[test]
    fn unknown_stored_label_is_invalid_data() {
        let mut r = row();
        r.emotion = Some("disgust".to_string());
        r.confidence = Some(0.5);
        r.propagation_score = Some(1.0);
        r.engagement_rate = Some(0.0);
        r.scored_at = Some(Utc::now());
        assert!(matches!(
            r.into_item(),
            Err(DbError::InvalidData { column: "emotion", .. })
        ));
    }

    #[test]
    fn negative_counts_clamp_to_zero() {
        assert_eq!(count_to_u64(-5), 0);
        assert_eq!(count_to_i64(u64::MAX), i64::MAX);
    }

    #[test]
    fn trend_row_converts() {
        let bucket = TrendBucketRow {
            emotion: "fear".to_string(),
            item_count: 4,
            mean_confidence: 0.7,
            mean_propagation: 5.5,
        }
        .into_bucket()
        .unwrap();
        assert_eq!(bucket.emotion, EmotionLabel::Fear);
        assert_eq!(bucket.count, 4);
    }
}
