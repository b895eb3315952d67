use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{TimeDelta, Utc};
use kolpulse_core::{EmotionLabel, TrendBucket};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

/// Thirty days.
const MAX_WINDOW_SECS: u64 = 30 * 24 * 60 * 60;

#[derive(Debug, Deserialize)]
pub(super) struct TrendsQuery {
    pub window_secs: Option<u64>,
}

#[derive(Debug, Serialize)]
pub(super) struct TrendsData {
    pub window_secs: u64,
    pub threshold: f64,
    pub buckets: Vec<TrendItem>,
}

#[derive(Debug, Serialize, PartialEq)]
pub(super) struct TrendItem {
    pub emotion: EmotionLabel,
    pub count: u64,
    pub mean_confidence: f64,
    pub mean_propagation: f64,
    pub above_threshold: bool,
}

fn trend_items(buckets: Vec<TrendBucket>, threshold: f64) -> Vec<TrendItem> {
    buckets
        .into_iter()
        .map(|b| TrendItem {
            emotion: b.emotion,
            count: b.count,
            mean_confidence: b.mean_confidence,
            mean_propagation: b.mean_propagation,
            above_threshold: b.mean_propagation > threshold,
        })
        .collect()
}

pub(super) async fn list_trends(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<TrendsQuery>,
) -> Result<Json<ApiResponse<TrendsData>>, ApiError> {
    let window_secs = query.window_secs.unwrap_or(state.trend_window_secs);
    if window_secs == 0 {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "window_secs must be greater than zero",
        ));
    }
    let window_secs = window_secs.min(MAX_WINDOW_SECS);

    // Bounded by MAX_WINDOW_SECS, so the cast cannot wrap.
    #[allow(clippy::cast_possible_wrap)]
    let since = Utc::now() - TimeDelta::seconds(window_secs as i64);

    let rows = kolpulse_db::list_trend_buckets(&state.pool, since)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let mut buckets = Vec::with_capacity(rows.len());
    for row in rows {
        match row.into_bucket() {
            Ok(bucket) => buckets.push(bucket),
            Err(e) => return Err(map_db_error(req_id.0, &e)),
        }
    }

    Ok(Json(ApiResponse {
        data: TrendsData {
            window_secs,
            threshold: state.alert_threshold,
            buckets: trend_items(buckets, state.alert_threshold),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
