//! The job-processing pipeline: normalize → score → classify.
//!
//! An explicit ordered sequence of typed stage functions, not a graph
//! engine. Stage failure short-circuits via the Result — later stages
//! never run on defaulted input. The pipeline holds no state and is safe
//! to invoke concurrently.

pub mod classifier;
pub mod normalizer;
pub mod prompts;
pub mod scorer;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::models::job::FitLabel;
use normalizer::NormalizedJob;
use scorer::{JobScorer, ScoreResult};

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The raw record was rejected during normalization (details logged
    /// at the rejection site).
    #[error("job record rejected during normalization")]
    Normalize,
}

/// A job that made it through every stage. Carries everything the cycle
/// needs to persist and broadcast.
#[derive(Debug, Clone)]
pub struct ProcessedJob {
    pub normalized: NormalizedJob,
    pub result: ScoreResult,
    pub label: FitLabel,
}

/// Runs one raw record through the full pipeline. Scoring is total, so
/// the only failure mode is normalization rejecting the record.
pub async fn process(
    raw: &Value,
    resume_content: &str,
    scorer: &dyn JobScorer,
) -> Result<ProcessedJob, PipelineError> {
    let normalized = normalizer::normalize(raw).ok_or(PipelineError::Normalize)?;
    let result = scorer.score(&normalized, resume_content).await;
    let label = classifier::classify(result.score);

    debug!(
        "Pipeline finished for job {}: score {:.1}, label {}",
        normalized.job_id,
        result.score,
        label.as_str()
    );

    Ok(ProcessedJob {
        normalized,
        result,
        label,
    })
}
