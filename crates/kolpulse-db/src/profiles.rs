//! Database operations for the `subject_profiles` table.

use chrono::{DateTime, Utc};
use kolpulse_core::SubjectProfile;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `subject_profiles` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SubjectProfileRow {
    pub subject: String,
    pub mean_confidence: f64,
    pub mean_propagation: f64,
    pub item_count: i32,
    pub updated_at: DateTime<Utc>,
}

impl From<SubjectProfileRow> for SubjectProfile {
    fn from(row: SubjectProfileRow) -> Self {
        Self {
            subject: row.subject,
            mean_confidence: row.mean_confidence,
            mean_propagation: row.mean_propagation,
            item_count: u32::try_from(row.item_count).unwrap_or(0),
            updated_at: row.updated_at,
        }
    }
}

/// Insert or overwrite the profile for `profile.subject`.
///
/// The stored row is replaced wholesale: a profile is the latest batch
/// snapshot, never merged with earlier batches.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_subject_profile(pool: &PgPool, profile: &SubjectProfile) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO subject_profiles \
             (subject, mean_confidence, mean_propagation, item_count, updated_at) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (subject) DO UPDATE SET \
             mean_confidence = EXCLUDED.mean_confidence, \
             mean_propagation = EXCLUDED.mean_propagation, \
             item_count = EXCLUDED.item_count, \
             updated_at = EXCLUDED.updated_at",
    )
    .bind(&profile.subject)
    .bind(profile.mean_confidence)
    .bind(profile.mean_propagation)
    .bind(i32::try_from(profile.item_count).unwrap_or(i32::MAX))
    .bind(profile.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Return the profile for a subject, or `None` if none exists.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_subject_profile(
    pool: &PgPool,
    subject: &str,
) -> Result<Option<SubjectProfileRow>, DbError> {
    let row = sqlx::query_as::<_, SubjectProfileRow>(
        "SELECT subject, mean_confidence, mean_propagation, item_count, updated_at \
         FROM subject_profiles \
         WHERE subject = $1",
    )
    .bind(subject)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// List profiles ordered by most recently updated.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_subject_profiles(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<SubjectProfileRow>, DbError> {
    let rows = sqlx::query_as::<_, SubjectProfileRow>(
        "SELECT subject, mean_confidence, mean_propagation, item_count, updated_at \
         FROM subject_profiles \
         ORDER BY updated_at DESC, subject ASC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
