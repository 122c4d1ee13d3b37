//! Scoring — second pipeline stage.
//!
//! `JobScorer` is the pluggable seam. `LlmScorer` does semantic matching
//! via Claude and falls back to `KeywordScorer` (deterministic term
//! overlap) on any failure; `KeywordScorer` alone is installed when no
//! API key is configured. Scoring is total — every job leaves this stage
//! with a numeric score.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::llm_client::LlmClient;
use crate::pipeline::normalizer::NormalizedJob;
use crate::pipeline::prompts::{SCORING_PROMPT_TEMPLATE, SCORING_SYSTEM};

/// Resumes shorter than this cannot be scored meaningfully.
pub const MIN_RESUME_CHARS: usize = 50;

const MAX_DESCRIPTION_CHARS: usize = 1500;
const MAX_RESUME_EXCERPT_CHARS: usize = 3000;
const MAX_REASONING_CHARS: usize = 500;
const MAX_KEYWORDS: usize = 20;
/// Each overlapping term is worth this many points in the fallback scorer.
const POINTS_PER_MATCH: f64 = 5.0;

/// Outcome of the scoring stage. Produced once per job per cycle, never
/// mutated afterwards.
#[derive(Debug, Clone)]
pub struct ScoreResult {
    /// Always within [0, 100].
    pub score: f64,
    /// Bounded to 500 chars.
    pub reasoning: String,
    /// Bounded to 20 entries; `total_matched` keeps the pre-cap count.
    pub matched_keywords: Vec<String>,
    pub total_matched: usize,
    /// "llm", "keyword", or "none" when the resume was unusable.
    pub backend: String,
}

/// The scoring seam. Implementations must be total — internal failures
/// resolve to a fallback result rather than an error.
#[async_trait]
pub trait JobScorer: Send + Sync {
    async fn score(&self, job: &NormalizedJob, resume_content: &str) -> ScoreResult;
}

// ────────────────────────────────────────────────────────────────────────────
// KeywordScorer — deterministic fallback backend
// ────────────────────────────────────────────────────────────────────────────

/// Pure-Rust term-overlap scorer. Fast, deterministic, no LLM call.
///
/// Tokenizes the resume and the job text (title + description), drops
/// stopwords, and awards a fixed number of points per shared term,
/// capped at 100.
pub struct KeywordScorer;

#[async_trait]
impl JobScorer for KeywordScorer {
    async fn score(&self, job: &NormalizedJob, resume_content: &str) -> ScoreResult {
        if resume_content.trim().chars().count() < MIN_RESUME_CHARS {
            return short_resume_result();
        }
        keyword_overlap(job, resume_content)
    }
}

fn keyword_overlap(job: &NormalizedJob, resume_content: &str) -> ScoreResult {
    let resume_terms: HashSet<String> = tokenize(resume_content).into_iter().collect();

    let job_text = format!("{} {}", job.title, job.description);
    let matched: Vec<String> = tokenize(&job_text)
        .into_iter()
        .filter(|term| resume_terms.contains(term))
        .collect();

    let total_matched = matched.len();
    let score = (total_matched as f64 * POINTS_PER_MATCH).min(100.0);

    ScoreResult {
        score,
        reasoning: format!(
            "Keyword overlap: {total_matched} terms shared between the resume and the posting"
        ),
        matched_keywords: matched.into_iter().take(MAX_KEYWORDS).collect(),
        total_matched,
        backend: "keyword".to_string(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LlmScorer — semantic backend with built-in fallback
// ────────────────────────────────────────────────────────────────────────────

/// Semantic scorer via Claude. Any LLM failure degrades to the keyword
/// scorer, so the pipeline never stalls on the external service.
pub struct LlmScorer {
    llm: LlmClient,
    fallback: KeywordScorer,
}

impl LlmScorer {
    pub fn new(llm: LlmClient) -> Self {
        Self {
            llm,
            fallback: KeywordScorer,
        }
    }
}

/// Structured verdict the prompt asks the model for.
#[derive(Debug, Deserialize)]
struct LlmVerdict {
    score: f64,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    matched_skills: Vec<String>,
}

#[async_trait]
impl JobScorer for LlmScorer {
    async fn score(&self, job: &NormalizedJob, resume_content: &str) -> ScoreResult {
        if resume_content.trim().chars().count() < MIN_RESUME_CHARS {
            return short_resume_result();
        }

        let prompt = SCORING_PROMPT_TEMPLATE
            .replace(
                "{resume}",
                truncate_chars(resume_content, MAX_RESUME_EXCERPT_CHARS),
            )
            .replace("{job_summary}", &job_summary(job));

        match self.llm.call_json::<LlmVerdict>(&prompt, SCORING_SYSTEM).await {
            Ok(verdict) => {
                let score = verdict.score.clamp(0.0, 100.0);
                let total_matched = verdict.matched_skills.len();
                info!("LLM scored '{}': {score:.0}/100", job.title);

                ScoreResult {
                    score,
                    reasoning: truncate_chars(&verdict.reasoning, MAX_REASONING_CHARS).to_string(),
                    matched_keywords: verdict
                        .matched_skills
                        .into_iter()
                        .take(MAX_KEYWORDS)
                        .collect(),
                    total_matched,
                    backend: "llm".to_string(),
                }
            }
            Err(e) => {
                warn!(
                    "LLM scoring failed for '{}', using keyword fallback: {e}",
                    job.title
                );
                self.fallback.score(job, resume_content).await
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

fn short_resume_result() -> ScoreResult {
    error!("Resume content missing or too short");
    ScoreResult {
        score: 0.0,
        reasoning: "No resume content".to_string(),
        matched_keywords: Vec::new(),
        total_matched: 0,
        backend: "none".to_string(),
    }
}

/// The bounded job text sent to the LLM.
fn job_summary(job: &NormalizedJob) -> String {
    format!(
        "Title: {}\nCompany: {}\nLocation: {}\nType: {}\nDescription: {}",
        job.title,
        job.company,
        job.location.as_deref().unwrap_or("N/A"),
        job.work_mode.as_str(),
        truncate_chars(&job.description, MAX_DESCRIPTION_CHARS),
    )
}

/// Char-boundary-safe prefix; `&text[..n]` would panic mid-codepoint.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Lowercased distinct tokens in first-seen order. Alphanumeric runs
/// (with `+` kept so "c++" survives), at least 3 chars, no stopwords,
/// no purely numeric tokens.
fn tokenize(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut tokens = Vec::new();

    for raw in text.split(|c: char| !(c.is_alphanumeric() || c == '+')) {
        let token = raw.to_lowercase();
        if token.chars().count() < 3 || token.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        if STOPWORDS.contains(&token.as_str()) {
            continue;
        }
        if seen.insert(token.clone()) {
            tokens.push(token);
        }
    }
    tokens
}

/// Words too common in both resumes and postings to carry any signal.
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "you", "your", "our", "are", "was", "were",
    "will", "have", "has", "had", "this", "that", "these", "those", "from",
    "not", "all", "can", "who", "what", "when", "where", "how", "why",
    "been", "being", "but", "they", "their", "them", "than", "then", "also",
    "able", "both", "each", "which", "while", "within", "across", "into",
    "more", "most", "other", "some", "such", "only", "just", "well", "very",
    "etc", "per", "plus", "must", "new", "work", "working", "team", "teams",
    "role", "job", "company", "experience", "years", "skills", "strong",
    "looking", "join", "required", "preferred", "nice", "about", "using",
    "use", "used",
];
