use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

/// The stored résumé. At most one row exists at any time; uploads replace
/// the previous row atomically.
///
/// Deliberately not `Serialize` — `content` must never leak through an
/// API response. Convert to [`ResumeResponse`] instead.
#[derive(Debug, Clone, FromRow)]
pub struct ResumeRow {
    pub id: i64,
    pub filename: String,
    pub content: String,
    pub skills: Json<Vec<String>>,
    pub experiences: Json<Vec<String>>,
    pub education: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// API shape for résumé endpoints; excludes the raw text content.
#[derive(Debug, Serialize)]
pub struct ResumeResponse {
    pub id: i64,
    pub filename: String,
    pub skills: Vec<String>,
    pub experiences: Vec<String>,
    pub education: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ResumeRow> for ResumeResponse {
    fn from(row: ResumeRow) -> Self {
        ResumeResponse {
            id: row.id,
            filename: row.filename,
            skills: row.skills.0,
            experiences: row.experiences.0,
            education: row.education.0,
            created_at: row.created_at,
        }
    }
}
