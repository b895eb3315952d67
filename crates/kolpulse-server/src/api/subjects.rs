use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use kolpulse_core::SubjectProfile;
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct SubjectsQuery {
    pub limit: Option<i64>,
}

pub(super) async fn list_subjects(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<SubjectsQuery>,
) -> Result<Json<ApiResponse<Vec<SubjectProfile>>>, ApiError> {
    let rows = kolpulse_db::list_subject_profiles(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(SubjectProfile::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_subject(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(subject): Path<String>,
) -> Result<Json<ApiResponse<SubjectProfile>>, ApiError> {
    let row = kolpulse_db::get_subject_profile(&state.pool, &subject)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(
                req_id.0.clone(),
                "not_found",
                format!("no profile for subject '{subject}'"),
            )
        })?;

    Ok(Json(ApiResponse {
        data: SubjectProfile::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}
