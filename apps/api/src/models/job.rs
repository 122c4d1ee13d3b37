use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// Work arrangement derived from the raw posting. Unrecognized values
/// default to `Onsite` during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkMode {
    Remote,
    Hybrid,
    Onsite,
}

impl WorkMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkMode::Remote => "remote",
            WorkMode::Hybrid => "hybrid",
            WorkMode::Onsite => "onsite",
        }
    }
}

/// Processing state of a persisted job. The fetch cycle only ever writes
/// fully processed rows, so `Classified` is the value in practice; the
/// remaining states exist for the column vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Normalized,
    Scored,
    Classified,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Normalized => "normalized",
            JobStatus::Scored => "scored",
            JobStatus::Classified => "classified",
            JobStatus::Failed => "failed",
        }
    }
}

/// Fit tier assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitLabel {
    Best,
    Mid,
    Least,
}

impl FitLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FitLabel::Best => "best",
            FitLabel::Mid => "mid",
            FitLabel::Least => "least",
        }
    }
}

impl std::str::FromStr for FitLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "best" => Ok(FitLabel::Best),
            "mid" => Ok(FitLabel::Mid),
            "least" => Ok(FitLabel::Least),
            other => Err(format!("unknown fit label '{other}'")),
        }
    }
}

/// A persisted job posting with its score and classification.
/// Rows are written once by the fetch cycle and never updated.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct JobRow {
    pub id: i64,
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub description: String,
    pub location: Option<String>,
    pub work_mode: String,
    /// NULL when the source provided no URL; such rows are exempt from dedup.
    pub apply_url: Option<String>,
    pub fetched_at: DateTime<Utc>,
    pub status: String,
    pub score: f64,
    pub label: Option<String>,
    pub matched_keywords: Json<Vec<String>>,
    pub llm_reasoning: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_fit_label_round_trips_through_str() {
        for label in [FitLabel::Best, FitLabel::Mid, FitLabel::Least] {
            assert_eq!(FitLabel::from_str(label.as_str()), Ok(label));
        }
    }

    #[test]
    fn test_fit_label_rejects_unknown() {
        assert!(FitLabel::from_str("great").is_err());
    }

    #[test]
    fn test_work_mode_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&WorkMode::Remote).unwrap(),
            "\"remote\""
        );
    }
}
