//! Résumé persistence. The table holds at most one row: uploading a new
//! résumé replaces whatever was there before.

use chrono::Utc;
use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::models::resume::ResumeRow;

/// Returns the current résumé, if one has been uploaded.
pub async fn current(pool: &SqlitePool) -> Result<Option<ResumeRow>, sqlx::Error> {
    sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes LIMIT 1")
        .fetch_optional(pool)
        .await
}

/// Replaces the stored résumé. Delete and insert run in one transaction,
/// so a concurrent reader never observes an empty table mid-swap.
pub async fn replace(
    pool: &SqlitePool,
    filename: &str,
    content: &str,
) -> Result<ResumeRow, sqlx::Error> {
    let now = Utc::now();
    let empty: Json<Vec<String>> = Json(Vec::new());

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM resumes").execute(&mut *tx).await?;

    let result = sqlx::query(
        r#"
        INSERT INTO resumes (filename, content, skills, experiences, education, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(filename)
    .bind(content)
    .bind(&empty)
    .bind(&empty)
    .bind(&empty)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let id = result.last_insert_rowid();
    tx.commit().await?;

    sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await
}

/// Deletes the stored résumé. Returns whether one existed.
pub async fn delete(pool: &SqlitePool) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM resumes").execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
