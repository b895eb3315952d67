//! Read-only profile and trend query handlers.

use chrono::{DateTime, TimeDelta, Utc};
use kolpulse_core::{SubjectProfile, TrendBucket};

/// Print the most recently updated subject profiles.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run_profiles(pool: &sqlx::PgPool, limit: i64) -> anyhow::Result<()> {
    let rows = kolpulse_db::list_subject_profiles(pool, limit.clamp(1, 200)).await?;

    if rows.is_empty() {
        println!("no subject profiles yet; the analyzer has not processed any batch");
        return Ok(());
    }

    println!(
        "{:<24}{:<18}{:<12}{:<14}ITEMS",
        "SUBJECT", "UPDATED", "EMOTION", "PROPAGATION"
    );
    for row in rows {
        println!("{}", profile_line(&SubjectProfile::from(row)));
    }

    Ok(())
}

/// Print per-emotion aggregates for items scored in the last `window_secs`.
///
/// Buckets above `threshold` are marked with `!`.
///
/// # Errors
///
/// Returns an error if `window_secs` is zero or reaches before the earliest
/// representable timestamp, or if the database query fails.
pub(crate) async fn run_trends(
    pool: &sqlx::PgPool,
    window_secs: u64,
    threshold: f64,
) -> anyhow::Result<()> {
    let since = window_start(Utc::now(), window_secs)?;

    let buckets = kolpulse_db::list_trend_buckets(pool, since)
        .await?
        .into_iter()
        .map(kolpulse_db::TrendBucketRow::into_bucket)
        .collect::<Result<Vec<_>, _>>()?;

    if buckets.is_empty() {
        println!("no items scored in the last {window_secs}s");
        return Ok(());
    }

    let spikes = kolpulse_analyzer::detect_spikes(&buckets, threshold, Utc::now());
    println!("window: {window_secs}s  threshold: {threshold}");
    println!(
        "  {:<10}{:<8}{:<12}PROPAGATION",
        "EMOTION", "ITEMS", "CONFIDENCE"
    );
    for bucket in &buckets {
        let spiking = spikes.iter().any(|a| a.emotion == bucket.emotion);
        println!("{}", trend_line(bucket, spiking));
    }

    Ok(())
}

fn window_start(now: DateTime<Utc>, window_secs: u64) -> anyhow::Result<DateTime<Utc>> {
    if window_secs == 0 {
        anyhow::bail!("--window-secs must be greater than zero");
    }
    i64::try_from(window_secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or_else(|| anyhow::anyhow!("--window-secs {window_secs} is out of range"))
}

fn profile_line(profile: &SubjectProfile) -> String {
    format!(
        "{:<24}{:<18}{:<12.3}{:<14.3}{}",
        profile.subject,
        profile.updated_at.format("%Y-%m-%d %H:%M"),
        profile.mean_confidence,
        profile.mean_propagation,
        profile.item_count
    )
}

fn trend_line(bucket: &TrendBucket, spiking: bool) -> String {
    format!(
        "{} {:<10}{:<8}{:<12.3}{:.3}",
        if spiking { '!' } else { ' ' },
        bucket.emotion.as_str(),
        bucket.count,
        bucket.mean_confidence,
        bucket.mean_propagation
    )
}
