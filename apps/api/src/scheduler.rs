//! Periodic job fetching and pipeline orchestration.
//!
//! One fetch cycle pulls a batch of raw postings from the configured
//! source, runs each through normalize → score → classify, persists the
//! survivors, and announces them over the WebSocket channel. Cycles are
//! single-flight: if one is still running when the next tick (or a manual
//! trigger) arrives, the newcomer is skipped rather than queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::errors::AppError;
use crate::jobs::store as job_store;
use crate::notify::JobNotifier;
use crate::pipeline;
use crate::pipeline::scorer::JobScorer;
use crate::resume::store as resume_store;
use crate::sources::{FetchQuery, JobSource};
use crate::state::AppState;

/// Counters for one completed fetch cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleStats {
    pub fetched: usize,
    pub stored: usize,
    pub duplicates: usize,
    pub failed: usize,
}

/// How a fetch cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// A previous cycle was still running.
    Skipped,
    /// No résumé uploaded yet; nothing to score against.
    NoResume,
    /// The résumé lookup itself failed.
    Aborted,
    Completed(CycleStats),
}

/// Snapshot of scheduler state for the info endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerInfo {
    pub is_running: bool,
    pub last_fetch: Option<DateTime<Utc>>,
    pub next_fetch: Option<DateTime<Utc>>,
    pub fetch_interval_minutes: u64,
}

enum JobDisposition {
    Stored,
    Duplicate,
}

pub struct FetchScheduler {
    db: SqlitePool,
    source: Arc<dyn JobSource>,
    scorer: Arc<dyn JobScorer>,
    notifier: JobNotifier,
    fetch_interval_minutes: u64,
    query: FetchQuery,
    running: AtomicBool,
    last_fetch: RwLock<Option<DateTime<Utc>>>,
    next_fetch: RwLock<Option<DateTime<Utc>>>,
}

/// Releases the running flag and stamps the cycle timestamps no matter how
/// the cycle exits.
struct CycleGuard<'a> {
    scheduler: &'a FetchScheduler,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        let now = Utc::now();
        self.scheduler.set_last_fetch(now);
        self.scheduler.set_next_fetch(
            now + chrono::Duration::minutes(self.scheduler.fetch_interval_minutes as i64),
        );
        self.scheduler.running.store(false, Ordering::SeqCst);
    }
}

impl FetchScheduler {
    pub fn new(
        db: SqlitePool,
        source: Arc<dyn JobSource>,
        scorer: Arc<dyn JobScorer>,
        notifier: JobNotifier,
        config: &Config,
    ) -> Self {
        Self {
            db,
            source,
            scorer,
            notifier,
            fetch_interval_minutes: config.fetch_interval_minutes,
            query: FetchQuery::from_config(config),
            running: AtomicBool::new(false),
            last_fetch: RwLock::new(None),
            next_fetch: RwLock::new(None),
        }
    }

    /// Spawns the periodic fetch loop. The first cycle runs one full
    /// interval after startup.
    pub fn start(self: &Arc<Self>) {
        let period = Duration::from_secs(self.fetch_interval_minutes * 60);
        self.set_next_fetch(
            Utc::now() + chrono::Duration::minutes(self.fetch_interval_minutes as i64),
        );

        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(
                "Job fetch scheduler started (every {} minutes)",
                scheduler.fetch_interval_minutes
            );
            loop {
                ticker.tick().await;
                scheduler.run_cycle().await;
            }
        });
    }

    /// Runs one fetch cycle end to end. Never returns an error: per-job
    /// failures are counted and logged, batch-level failures end the cycle
    /// with an outcome describing what happened.
    pub async fn run_cycle(&self) -> CycleOutcome {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Previous job fetch is still running, skipping this cycle");
            return CycleOutcome::Skipped;
        }
        let _guard = CycleGuard { scheduler: self };
        self.set_last_fetch(Utc::now());

        let resume = match resume_store::current(&self.db).await {
            Ok(Some(row)) => row,
            Ok(None) => {
                warn!("No resume found. Please upload a resume to start job processing.");
                return CycleOutcome::NoResume;
            }
            Err(e) => {
                error!("Could not load resume before fetching: {e}");
                return CycleOutcome::Aborted;
            }
        };

        let raw_jobs = match self.source.fetch_batch(&self.query).await {
            Ok(jobs) => jobs,
            Err(e) => {
                error!("Job fetch failed: {e:#}");
                Vec::new()
            }
        };
        if raw_jobs.is_empty() {
            info!("No new jobs fetched");
            return CycleOutcome::Completed(CycleStats::default());
        }

        let mut stats = CycleStats {
            fetched: raw_jobs.len(),
            ..Default::default()
        };
        for raw in &raw_jobs {
            match self.process_one(raw, &resume.content).await {
                Ok(JobDisposition::Stored) => stats.stored += 1,
                Ok(JobDisposition::Duplicate) => stats.duplicates += 1,
                Err(e) => {
                    stats.failed += 1;
                    error!("Error processing individual job: {e:#}");
                }
            }
        }

        info!(
            "Fetch cycle complete: {} fetched, {} stored, {} duplicates, {} failed",
            stats.fetched, stats.stored, stats.duplicates, stats.failed
        );
        CycleOutcome::Completed(stats)
    }

    /// Pushes a single raw posting through the pipeline and stores it.
    async fn process_one(
        &self,
        raw: &Value,
        resume_content: &str,
    ) -> anyhow::Result<JobDisposition> {
        let processed = pipeline::process(raw, resume_content, self.scorer.as_ref()).await?;

        let apply_url = processed.normalized.apply_url.as_str();
        if !apply_url.is_empty() && job_store::exists_by_apply_url(&self.db, apply_url).await? {
            debug!("Job already exists (same URL): {apply_url}");
            return Ok(JobDisposition::Duplicate);
        }

        let row = job_store::insert_classified(&self.db, &processed).await?;
        self.notifier.notify_new_job(&row);
        info!(
            "Stored job '{}' at {} ({}, score {:.0})",
            row.title,
            row.company,
            processed.label.as_str(),
            row.score
        );
        Ok(JobDisposition::Stored)
    }

    pub fn info(&self) -> SchedulerInfo {
        SchedulerInfo {
            is_running: self.running.load(Ordering::SeqCst),
            last_fetch: self.last_fetch.read().ok().and_then(|slot| *slot),
            next_fetch: self.next_fetch.read().ok().and_then(|slot| *slot),
            fetch_interval_minutes: self.fetch_interval_minutes,
        }
    }

    fn set_last_fetch(&self, at: DateTime<Utc>) {
        if let Ok(mut slot) = self.last_fetch.write() {
            *slot = Some(at);
        }
    }

    fn set_next_fetch(&self, at: DateTime<Utc>) {
        if let Ok(mut slot) = self.next_fetch.write() {
            *slot = Some(at);
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/trigger-fetch
///
/// Runs a cycle immediately instead of waiting for the next tick. The
/// résumé precondition is checked up front so the caller gets a clear 400
/// instead of a silently empty cycle.
pub async fn handle_trigger_fetch(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    if resume_store::current(&state.db).await?.is_none() {
        return Err(AppError::Precondition(
            "Please upload a resume first before fetching jobs.".to_string(),
        ));
    }

    info!("Manual job fetch triggered");
    let outcome = state.scheduler.run_cycle().await;

    Ok(Json(json!({
        "message": "Job fetch triggered",
        "outcome": outcome,
    })))
}

/// GET /api/scheduler/info
pub async fn handle_scheduler_info(State(state): State<AppState>) -> Json<SchedulerInfo> {
    Json(state.scheduler.info())
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;

    use super::*;
    use crate::db;
    use crate::pipeline::normalizer::NormalizedJob;
    use crate::pipeline::scorer::ScoreResult;

    const RESUME: &str =
        "Senior Rust engineer. Ten years of backend, distributed systems, and tooling work.";

    fn test_config() -> Config {
        Config {
            database_url: "sqlite::memory:".to_string(),
            anthropic_api_key: None,
            job_source_url: "http://localhost:8001/scrape".to_string(),
            fetch_interval_minutes: 15,
            search_term: "software engineer".to_string(),
            search_location: "United States".to_string(),
            results_wanted: 20,
            hours_old: 72,
            job_sources: vec!["indeed".to_string()],
            search_remote_only: false,
            search_job_type: None,
            port: 8000,
            rust_log: "info".to_string(),
        }
    }

    fn raw_job(id: &str, url: &str) -> Value {
        json!({
            "id": id,
            "title": "Rust Engineer",
            "company": "Acme Corp",
            "description": "Build backend services in Rust.",
            "location": "Berlin",
            "type": "remote",
            "apply_url": url,
        })
    }

    struct StaticSource {
        jobs: Vec<Value>,
        calls: AtomicUsize,
    }

    impl StaticSource {
        fn new(jobs: Vec<Value>) -> Self {
            Self {
                jobs,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl JobSource for StaticSource {
        async fn fetch_batch(&self, _query: &FetchQuery) -> anyhow::Result<Vec<Value>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.jobs.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl JobSource for FailingSource {
        async fn fetch_batch(&self, _query: &FetchQuery) -> anyhow::Result<Vec<Value>> {
            Err(anyhow::anyhow!("connection refused"))
        }
    }

    struct SlowSource {
        delay: Duration,
    }

    #[async_trait]
    impl JobSource for SlowSource {
        async fn fetch_batch(&self, _query: &FetchQuery) -> anyhow::Result<Vec<Value>> {
            time::sleep(self.delay).await;
            Ok(vec![raw_job("slow-1", "https://example.com/slow-1")])
        }
    }

    struct FixedScorer {
        score: f64,
    }

    #[async_trait]
    impl JobScorer for FixedScorer {
        async fn score(&self, _job: &NormalizedJob, _resume_content: &str) -> ScoreResult {
            ScoreResult {
                score: self.score,
                reasoning: "fixed".to_string(),
                matched_keywords: Vec::new(),
                total_matched: 0,
                backend: "test".to_string(),
            }
        }
    }

    async fn make_scheduler(source: Arc<dyn JobSource>) -> (Arc<FetchScheduler>, SqlitePool) {
        let pool = db::create_pool("sqlite::memory:").await.unwrap();
        db::init_schema(&pool).await.unwrap();
        let scheduler = Arc::new(FetchScheduler::new(
            pool.clone(),
            source,
            Arc::new(FixedScorer { score: 90.0 }),
            JobNotifier::new(),
            &test_config(),
        ));
        (scheduler, pool)
    }

    async fn upload_resume(pool: &SqlitePool) {
        resume_store::replace(pool, "resume.txt", RESUME)
            .await
            .unwrap();
    }

    async fn count_jobs(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM jobs")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_cycle_without_resume_does_not_fetch() {
        let source = Arc::new(StaticSource::new(vec![raw_job(
            "j1",
            "https://example.com/j1",
        )]));
        let (scheduler, pool) = make_scheduler(source.clone()).await;

        let outcome = scheduler.run_cycle().await;

        assert_eq!(outcome, CycleOutcome::NoResume);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert_eq!(count_jobs(&pool).await, 0);
    }

    #[tokio::test]
    async fn test_cycle_stores_fetched_batch() {
        let source = Arc::new(StaticSource::new(vec![
            raw_job("j1", "https://example.com/j1"),
            raw_job("j2", "https://example.com/j2"),
        ]));
        let (scheduler, pool) = make_scheduler(source).await;
        upload_resume(&pool).await;

        let outcome = scheduler.run_cycle().await;

        assert_eq!(
            outcome,
            CycleOutcome::Completed(CycleStats {
                fetched: 2,
                stored: 2,
                duplicates: 0,
                failed: 0,
            })
        );
        let rows = sqlx::query_as::<_, crate::models::job::JobRow>(
            "SELECT * FROM jobs ORDER BY job_id",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].status, "classified");
        assert_eq!(rows[0].label.as_deref(), Some("best"));
    }

    #[tokio::test]
    async fn test_second_cycle_counts_duplicates() {
        let source = Arc::new(StaticSource::new(vec![
            raw_job("j1", "https://example.com/j1"),
            raw_job("j2", "https://example.com/j2"),
        ]));
        let (scheduler, pool) = make_scheduler(source).await;
        upload_resume(&pool).await;

        scheduler.run_cycle().await;
        let second = scheduler.run_cycle().await;

        assert_eq!(
            second,
            CycleOutcome::Completed(CycleStats {
                fetched: 2,
                stored: 0,
                duplicates: 2,
                failed: 0,
            })
        );
        assert_eq!(count_jobs(&pool).await, 2);
    }

    #[tokio::test]
    async fn test_bad_record_does_not_poison_batch() {
        let source = Arc::new(StaticSource::new(vec![
            raw_job("j1", "https://example.com/j1"),
            json!("not an object"),
            raw_job("j3", "https://example.com/j3"),
        ]));
        let (scheduler, pool) = make_scheduler(source).await;
        upload_resume(&pool).await;

        let outcome = scheduler.run_cycle().await;

        assert_eq!(
            outcome,
            CycleOutcome::Completed(CycleStats {
                fetched: 3,
                stored: 2,
                duplicates: 0,
                failed: 1,
            })
        );
        assert_eq!(count_jobs(&pool).await, 2);
    }

    #[tokio::test]
    async fn test_duplicate_url_within_batch_stored_once() {
        let source = Arc::new(StaticSource::new(vec![
            raw_job("j1", "https://example.com/same"),
            raw_job("j2", "https://example.com/same"),
        ]));
        let (scheduler, pool) = make_scheduler(source).await;
        upload_resume(&pool).await;

        let outcome = scheduler.run_cycle().await;

        assert_eq!(
            outcome,
            CycleOutcome::Completed(CycleStats {
                fetched: 2,
                stored: 1,
                duplicates: 1,
                failed: 0,
            })
        );
    }

    #[tokio::test]
    async fn test_jobs_without_urls_are_never_deduplicated() {
        let source = Arc::new(StaticSource::new(vec![raw_job("j1", ""), raw_job("j2", "")]));
        let (scheduler, pool) = make_scheduler(source).await;
        upload_resume(&pool).await;

        let outcome = scheduler.run_cycle().await;

        assert_eq!(
            outcome,
            CycleOutcome::Completed(CycleStats {
                fetched: 2,
                stored: 2,
                duplicates: 0,
                failed: 0,
            })
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_completes_cycle_and_releases_flag() {
        let (scheduler, pool) = make_scheduler(Arc::new(FailingSource)).await;
        upload_resume(&pool).await;

        let outcome = scheduler.run_cycle().await;
        assert_eq!(outcome, CycleOutcome::Completed(CycleStats::default()));

        // The flag must be released so the next cycle can run.
        let next = scheduler.run_cycle().await;
        assert_eq!(next, CycleOutcome::Completed(CycleStats::default()));
        assert!(!scheduler.info().is_running);
    }

    #[tokio::test]
    async fn test_concurrent_cycle_is_skipped() {
        let source = Arc::new(SlowSource {
            delay: Duration::from_secs(5),
        });
        let (scheduler, pool) = make_scheduler(source).await;
        upload_resume(&pool).await;

        let background = Arc::clone(&scheduler);
        let handle = tokio::spawn(async move { background.run_cycle().await });

        // Let the first cycle claim the flag and park in its slow fetch.
        time::sleep(Duration::from_millis(50)).await;
        assert!(scheduler.info().is_running);
        assert_eq!(scheduler.run_cycle().await, CycleOutcome::Skipped);

        let first = handle.await.unwrap();
        assert_eq!(
            first,
            CycleOutcome::Completed(CycleStats {
                fetched: 1,
                stored: 1,
                duplicates: 0,
                failed: 0,
            })
        );

        // Once the first cycle finishes, the flag is free again.
        let rerun = scheduler.run_cycle().await;
        assert_eq!(
            rerun,
            CycleOutcome::Completed(CycleStats {
                fetched: 1,
                stored: 0,
                duplicates: 1,
                failed: 0,
            })
        );
    }

    #[tokio::test]
    async fn test_cycle_stamps_timestamps() {
        let source = Arc::new(StaticSource::new(vec![raw_job(
            "j1",
            "https://example.com/j1",
        )]));
        let (scheduler, pool) = make_scheduler(source).await;
        upload_resume(&pool).await;

        assert!(scheduler.info().last_fetch.is_none());
        assert!(scheduler.info().next_fetch.is_none());

        scheduler.run_cycle().await;

        let info = scheduler.info();
        assert!(!info.is_running);
        let last = info.last_fetch.unwrap();
        let next = info.next_fetch.unwrap();
        assert_eq!(next - last, chrono::Duration::minutes(15));
    }

    #[tokio::test]
    async fn test_skipped_cycle_leaves_timestamps_untouched() {
        let source = Arc::new(StaticSource::new(Vec::new()));
        let (scheduler, _pool) = make_scheduler(source).await;

        scheduler.running.store(true, Ordering::SeqCst);
        assert_eq!(scheduler.run_cycle().await, CycleOutcome::Skipped);
        assert!(scheduler.info().last_fetch.is_none());
        assert!(scheduler.info().next_fetch.is_none());
    }

    #[tokio::test]
    async fn test_cycle_notifies_subscribers() {
        let source = Arc::new(StaticSource::new(vec![raw_job(
            "j1",
            "https://example.com/j1",
        )]));
        let pool = db::create_pool("sqlite::memory:").await.unwrap();
        db::init_schema(&pool).await.unwrap();
        let notifier = JobNotifier::new();
        let mut rx = notifier.subscribe();
        let scheduler = FetchScheduler::new(
            pool.clone(),
            source,
            Arc::new(FixedScorer { score: 90.0 }),
            notifier,
            &test_config(),
        );
        upload_resume(&pool).await;

        scheduler.run_cycle().await;

        let payload = rx.recv().await.unwrap();
        let event: Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(event["type"], "new_job");
        assert_eq!(event["data"]["job_id"], "j1");
    }

    async fn make_state() -> (AppState, SqlitePool) {
        let source = Arc::new(StaticSource::new(vec![raw_job(
            "j1",
            "https://example.com/j1",
        )]));
        let (scheduler, pool) = make_scheduler(source).await;
        let state = AppState {
            db: pool.clone(),
            scheduler,
            notifier: JobNotifier::new(),
        };
        (state, pool)
    }

    #[tokio::test]
    async fn test_trigger_fetch_requires_resume() {
        let (state, _pool) = make_state().await;

        let result = handle_trigger_fetch(State(state)).await;
        match result {
            Err(AppError::Precondition(message)) => {
                assert_eq!(message, "Please upload a resume first before fetching jobs.");
            }
            other => panic!("expected precondition error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_trigger_fetch_runs_cycle() {
        let (state, pool) = make_state().await;
        upload_resume(&pool).await;

        let Json(body) = handle_trigger_fetch(State(state)).await.unwrap();
        assert_eq!(body["message"], "Job fetch triggered");
        assert_eq!(body["outcome"]["status"], "completed");
        assert_eq!(body["outcome"]["stored"], 1);
        assert_eq!(count_jobs(&pool).await, 1);
    }

    #[tokio::test]
    async fn test_scheduler_info_handler_reports_interval() {
        let (state, _pool) = make_state().await;

        let Json(info) = handle_scheduler_info(State(state)).await;
        assert!(!info.is_running);
        assert_eq!(info.fetch_interval_minutes, 15);
        assert!(info.last_fetch.is_none());
    }
}
