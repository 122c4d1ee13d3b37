//! HTTP handlers for browsing classified jobs.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::jobs::store::{self, JobFilter, JobStats};
use crate::models::job::{FitLabel, JobRow};
use crate::state::AppState;

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Deserialize)]
pub struct JobListQuery {
    pub label: Option<String>,
    pub company: Option<String>,
    #[serde(default)]
    pub remote_only: bool,
    pub search: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

/// GET /api/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    Query(params): Query<JobListQuery>,
) -> Result<Json<Vec<JobRow>>, AppError> {
    if !(1..=1000).contains(&params.limit) {
        return Err(AppError::Validation(
            "limit must be between 1 and 1000".to_string(),
        ));
    }
    if params.offset < 0 {
        return Err(AppError::Validation(
            "offset must be non-negative".to_string(),
        ));
    }

    let label = params
        .label
        .as_deref()
        .map(|s| s.parse::<FitLabel>())
        .transpose()
        .map_err(AppError::Validation)?;

    let filter = JobFilter {
        label,
        company: params.company,
        remote_only: params.remote_only,
        search: params.search,
        limit: params.limit,
        offset: params.offset,
    };
    let jobs = store::list(&state.db, &filter).await?;

    info!(
        "Listed {} jobs (label={:?}, company={:?}, remote_only={}, search={:?})",
        jobs.len(),
        filter.label,
        filter.company,
        filter.remote_only,
        filter.search
    );

    Ok(Json(jobs))
}

/// GET /api/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<JobRow>, AppError> {
    store::get(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Job not found".to_string()))
}

/// GET /api/jobs/stats/summary
pub async fn handle_job_stats(State(state): State<AppState>) -> Result<Json<JobStats>, AppError> {
    Ok(Json(store::stats(&state.db).await?))
}
