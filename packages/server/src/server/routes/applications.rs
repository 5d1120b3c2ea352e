//! Read endpoints over recorded application history.

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::domains::applications::ApplicationRow;
use crate::server::app::AppState;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Serialize)]
pub struct ErrorBody {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn internal_error(context: &str, e: anyhow::Error) -> ApiError {
    error!(error = %e, "{context}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: context.to_string(),
        }),
    )
}

/// `GET /applications?limit=&offset=` — recent attempts, newest first.
pub async fn list_applications(
    Extension(state): Extension<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<ApplicationRow>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let rows = state
        .history
        .list(limit, offset)
        .await
        .map_err(|e| internal_error("failed to list applications", e))?;
    Ok(Json(rows))
}

/// `GET /applications/{job_id}` — one attempt by platform job id.
pub async fn get_application(
    Extension(state): Extension<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<ApplicationRow>, ApiError> {
    let row = state
        .history
        .find_by_job_id(&job_id)
        .await
        .map_err(|e| internal_error("failed to fetch application", e))?;

    match row {
        Some(row) => Ok(Json(row)),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                error: format!("no application recorded for job {job_id}"),
            }),
        )),
    }
}
