//! Job persistence and queries.
//!
//! Rows are only ever inserted in their final classified form, so the
//! listing queries filter on `status = 'classified'` and sort by score.

use chrono::Utc;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::models::job::{FitLabel, JobRow, JobStatus, WorkMode};
use crate::pipeline::ProcessedJob;

/// Filters for the job listing endpoint.
#[derive(Debug, Default, Clone)]
pub struct JobFilter {
    pub label: Option<FitLabel>,
    pub company: Option<String>,
    pub remote_only: bool,
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

/// Aggregate counts for the stats endpoint.
#[derive(Debug, Serialize)]
pub struct JobStats {
    pub total_jobs: i64,
    pub classified_jobs: i64,
    pub by_label: LabelCounts,
    pub by_work_mode: WorkModeCounts,
}

#[derive(Debug, Serialize)]
pub struct LabelCounts {
    pub best_fit: i64,
    pub mid_fit: i64,
    pub least_fit: i64,
}

#[derive(Debug, Serialize)]
pub struct WorkModeCounts {
    pub remote: i64,
    pub hybrid: i64,
    pub onsite: i64,
}

/// Inserts a fully processed job and returns the stored row.
///
/// An empty apply URL is stored as NULL so the UNIQUE constraint only
/// applies to real URLs.
pub async fn insert_classified(
    pool: &SqlitePool,
    job: &ProcessedJob,
) -> Result<JobRow, sqlx::Error> {
    let now = Utc::now();
    let apply_url = match job.normalized.apply_url.as_str() {
        "" => None,
        url => Some(url),
    };

    let result = sqlx::query(
        r#"
        INSERT INTO jobs (
            job_id, title, company, description, location, work_mode,
            apply_url, fetched_at, status, score, label,
            matched_keywords, llm_reasoning, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&job.normalized.job_id)
    .bind(&job.normalized.title)
    .bind(&job.normalized.company)
    .bind(&job.normalized.description)
    .bind(&job.normalized.location)
    .bind(job.normalized.work_mode.as_str())
    .bind(apply_url)
    .bind(job.normalized.fetched_at)
    .bind(JobStatus::Classified.as_str())
    .bind(job.result.score)
    .bind(job.label.as_str())
    .bind(Json(&job.result.matched_keywords))
    .bind(&job.result.reasoning)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    let id = result.last_insert_rowid();

    sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await
}

/// True if a job with this apply URL is already stored.
pub async fn exists_by_apply_url(pool: &SqlitePool, apply_url: &str) -> Result<bool, sqlx::Error> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM jobs WHERE apply_url = ? LIMIT 1")
        .bind(apply_url)
        .fetch_optional(pool)
        .await?;

    Ok(found.is_some())
}

/// Lists classified jobs, best score first.
///
/// SQLite LIKE is case-insensitive for ASCII, which covers the company
/// and free-text search filters.
pub async fn list(pool: &SqlitePool, filter: &JobFilter) -> Result<Vec<JobRow>, sqlx::Error> {
    let mut sql = String::from("SELECT * FROM jobs WHERE status = ?");
    if filter.label.is_some() {
        sql.push_str(" AND label = ?");
    }
    if filter.company.is_some() {
        sql.push_str(" AND company LIKE ?");
    }
    if filter.remote_only {
        sql.push_str(" AND work_mode = 'remote'");
    }
    if filter.search.is_some() {
        sql.push_str(" AND (title LIKE ? OR description LIKE ? OR company LIKE ?)");
    }
    sql.push_str(" ORDER BY score DESC LIMIT ? OFFSET ?");

    let mut query = sqlx::query_as::<_, JobRow>(&sql).bind(JobStatus::Classified.as_str());
    if let Some(label) = filter.label {
        query = query.bind(label.as_str());
    }
    if let Some(company) = &filter.company {
        query = query.bind(format!("%{company}%"));
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{search}%");
        query = query
            .bind(pattern.clone())
            .bind(pattern.clone())
            .bind(pattern);
    }

    query
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(pool)
        .await
}

/// Fetches a single job by rowid.
pub async fn get(pool: &SqlitePool, id: i64) -> Result<Option<JobRow>, sqlx::Error> {
    sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Aggregate counts over all stored jobs.
pub async fn stats(pool: &SqlitePool) -> Result<JobStats, sqlx::Error> {
    let total_jobs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs")
        .fetch_one(pool)
        .await?;
    let classified_jobs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE status = ?")
        .bind(JobStatus::Classified.as_str())
        .fetch_one(pool)
        .await?;

    let by_label = LabelCounts {
        best_fit: count_by_label(pool, FitLabel::Best).await?,
        mid_fit: count_by_label(pool, FitLabel::Mid).await?,
        least_fit: count_by_label(pool, FitLabel::Least).await?,
    };
    let by_work_mode = WorkModeCounts {
        remote: count_by_work_mode(pool, WorkMode::Remote).await?,
        hybrid: count_by_work_mode(pool, WorkMode::Hybrid).await?,
        onsite: count_by_work_mode(pool, WorkMode::Onsite).await?,
    };

    Ok(JobStats {
        total_jobs,
        classified_jobs,
        by_label,
        by_work_mode,
    })
}

async fn count_by_label(pool: &SqlitePool, label: FitLabel) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE label = ?")
        .bind(label.as_str())
        .fetch_one(pool)
        .await
}

async fn count_by_work_mode(pool: &SqlitePool, mode: WorkMode) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE work_mode = ?")
        .bind(mode.as_str())
        .fetch_one(pool)
        .await
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
