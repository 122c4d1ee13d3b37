//! Job source collaborator — the boundary to the scraping side.
//!
//! The cycle only depends on the `JobSource` trait; the production
//! implementation posts the query to a scraper sidecar over HTTP. The
//! source is assumed slow and unreliable, so errors are caught at the
//! cycle boundary and treated as an empty batch.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::config::Config;

/// Search parameters forwarded to the scraper.
#[derive(Debug, Clone, Serialize)]
pub struct FetchQuery {
    pub search_term: String,
    pub location: String,
    pub results_wanted: u32,
    pub hours_old: u32,
    pub sources: Vec<String>,
    pub is_remote: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
}

impl FetchQuery {
    pub fn from_config(config: &Config) -> Self {
        FetchQuery {
            search_term: config.search_term.clone(),
            location: config.search_location.clone(),
            results_wanted: config.results_wanted,
            hours_old: config.hours_old,
            sources: config.job_sources.clone(),
            is_remote: config.search_remote_only,
            job_type: config.search_job_type.clone(),
        }
    }
}

/// A provider of raw, heterogeneous job records.
#[async_trait]
pub trait JobSource: Send + Sync {
    async fn fetch_batch(&self, query: &FetchQuery) -> Result<Vec<Value>>;
}

/// Posts the query to a scraper endpoint and returns whatever records it
/// produced. Accepts either a bare JSON array or `{"jobs": [...]}`.
pub struct HttpJobSource {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpJobSource {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(180))
                .build()
                .expect("Failed to build HTTP client"),
            endpoint,
        }
    }
}

#[async_trait]
impl JobSource for HttpJobSource {
    async fn fetch_batch(&self, query: &FetchQuery) -> Result<Vec<Value>> {
        info!(
            "Fetching jobs: '{}' in '{}' from {:?}",
            query.search_term, query.location, query.sources
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(query)
            .send()
            .await
            .context("job source request failed")?
            .error_for_status()
            .context("job source returned an error status")?;

        let body: Value = response
            .json()
            .await
            .context("job source returned invalid JSON")?;

        let records = parse_batch(body).context("job source returned an unexpected shape")?;
        info!("Fetched {} raw jobs", records.len());
        Ok(records)
    }
}

/// Scrapers disagree on the envelope; take a bare array or a `jobs` key.
fn parse_batch(body: Value) -> Option<Vec<Value>> {
    match body {
        Value::Array(records) => Some(records),
        Value::Object(mut obj) => match obj.remove("jobs") {
            Some(Value::Array(records)) => Some(records),
            _ => None,
        },
        _ => None,
    }
}
