use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Every setting has a default; only malformed values abort startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Absent key means no LLM scoring — the keyword fallback runs instead.
    pub anthropic_api_key: Option<String>,
    /// Scraper sidecar endpoint that accepts a fetch query and returns raw postings.
    pub job_source_url: String,
    pub fetch_interval_minutes: u64,
    pub search_term: String,
    pub search_location: String,
    pub results_wanted: u32,
    pub hours_old: u32,
    /// Board names forwarded to the scraper, comma-separated in the env.
    pub job_sources: Vec<String>,
    pub search_remote_only: bool,
    pub search_job_type: Option<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: env_or("DATABASE_URL", "sqlite://jobs.db"),
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            job_source_url: env_or("JOB_SOURCE_URL", "http://localhost:8001/scrape"),
            fetch_interval_minutes: parse_interval_minutes(&env_or("FETCH_INTERVAL_MINUTES", "15"))
                .context("FETCH_INTERVAL_MINUTES must be a positive integer")?,
            search_term: env_or("JOB_SEARCH_TERM", "software engineer"),
            search_location: env_or("JOB_SEARCH_LOCATION", "United States"),
            results_wanted: env_or("JOB_RESULTS_WANTED", "20")
                .parse::<u32>()
                .context("JOB_RESULTS_WANTED must be a positive integer")?,
            hours_old: env_or("JOB_HOURS_OLD", "72")
                .parse::<u32>()
                .context("JOB_HOURS_OLD must be a positive integer")?,
            job_sources: env_or("JOB_SOURCES", "indeed,linkedin,zip_recruiter")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            search_remote_only: env_or("JOB_IS_REMOTE", "false")
                .parse::<bool>()
                .context("JOB_IS_REMOTE must be true or false")?,
            search_job_type: optional_env("JOB_TYPE"),
            port: env_or("PORT", "8000")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Returns `None` for unset or empty variables.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// The scheduler period must be at least one minute: tokio's interval
/// timer panics on a zero period.
fn parse_interval_minutes(raw: &str) -> Option<u64> {
    raw.parse::<u64>().ok().filter(|minutes| *minutes >= 1)
}
