use std::sync::Arc;

use sqlx::SqlitePool;

use crate::notify::JobNotifier;
use crate::scheduler::FetchScheduler;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub scheduler: Arc<FetchScheduler>,
    pub notifier: JobNotifier,
}
