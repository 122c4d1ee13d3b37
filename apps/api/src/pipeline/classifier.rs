//! Classification — third pipeline stage.
//!
//! Pure threshold mapping from score to fit tier. Total over f64 and
//! monotonic; no side effects.

use tracing::debug;

use crate::models::job::FitLabel;

pub const BEST_FIT_THRESHOLD: f64 = 85.0;
pub const MID_FIT_THRESHOLD: f64 = 65.0;

pub fn classify(score: f64) -> FitLabel {
    let label = if score >= BEST_FIT_THRESHOLD {
        FitLabel::Best
    } else if score >= MID_FIT_THRESHOLD {
        FitLabel::Mid
    } else {
        FitLabel::Least
    };

    debug!("Classified score {score} as {}", label.as_str());
    label
}
