pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::jobs::handlers as job_handlers;
use crate::notify;
use crate::resume::handlers as resume_handlers;
use crate::scheduler;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/", get(health::api_banner))
        // Jobs
        .route("/api/jobs", get(job_handlers::handle_list_jobs))
        .route(
            "/api/jobs/stats/summary",
            get(job_handlers::handle_job_stats),
        )
        .route("/api/jobs/:id", get(job_handlers::handle_get_job))
        // Resume
        .route("/api/resume/upload", post(resume_handlers::handle_upload))
        .route("/api/resume/current", get(resume_handlers::handle_current))
        .route("/api/resume/delete", delete(resume_handlers::handle_delete))
        // Scheduler
        .route("/api/trigger-fetch", post(scheduler::handle_trigger_fetch))
        .route(
            "/api/scheduler/info",
            get(scheduler::handle_scheduler_info),
        )
        // Live updates
        .route("/api/ws", get(notify::ws_upgrade))
        .with_state(state)
}
