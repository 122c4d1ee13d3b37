//! Normalization — first pipeline stage.
//!
//! Maps heterogeneous raw records (field names vary by source) onto one
//! canonical shape. A record without a usable id is rejected whole; every
//! other field degrades to a documented default.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use crate::models::job::WorkMode;

/// Canonical job shape produced from a raw source record.
#[derive(Debug, Clone)]
pub struct NormalizedJob {
    /// Source-assigned external identifier. Never empty.
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub description: String,
    pub location: Option<String>,
    pub work_mode: WorkMode,
    /// Global dedup key. Empty when the source provided no link.
    pub apply_url: String,
    pub fetched_at: DateTime<Utc>,
}

/// Normalizes one raw record. Returns `None` (and logs) when the record
/// is unusable; nothing is ever partially produced.
pub fn normalize(raw: &Value) -> Option<NormalizedJob> {
    let Some(obj) = raw.as_object() else {
        error!("Raw job record is not a JSON object");
        return None;
    };

    let Some(job_id) = first_string(obj, &["external_id", "id", "job_id"]) else {
        error!("Missing job_id in raw job data");
        return None;
    };

    let title = first_string(obj, &["title", "job_title"])
        .unwrap_or_else(|| "Unknown Title".to_string());
    let company = first_string(obj, &["company", "company_name"])
        .unwrap_or_else(|| "Unknown Company".to_string());

    let description = first_string(obj, &["description", "job_description"]).unwrap_or_default();
    if description.is_empty() {
        warn!("Job {job_id} has no description");
    }

    let location = first_string(obj, &["location", "job_location"]);
    let work_mode =
        normalize_work_mode(first_string(obj, &["type", "work_type"]).as_deref().unwrap_or(""));
    let apply_url = first_string(obj, &["apply_url", "url", "link"]).unwrap_or_default();
    let fetched_at = parse_timestamp(obj.get("timestamp"));

    debug!("Normalized job: {job_id} - {title}");

    Some(NormalizedJob {
        job_id,
        title,
        company,
        description,
        location,
        work_mode,
        apply_url,
        fetched_at,
    })
}

/// First non-empty value among the candidate keys. Strings are trimmed;
/// numbers are stringified (some boards ship numeric ids).
fn first_string(obj: &Map<String, Value>, candidates: &[&str]) -> Option<String> {
    for key in candidates {
        match obj.get(*key) {
            Some(Value::String(s)) => {
                let trimmed = s.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

/// Case-insensitive substring mapping. Anything unrecognized, including
/// the empty string, is onsite.
fn normalize_work_mode(raw: &str) -> WorkMode {
    let lower = raw.to_lowercase();
    if lower.contains("remote") {
        WorkMode::Remote
    } else if lower.contains("hybrid") {
        WorkMode::Hybrid
    } else {
        WorkMode::Onsite
    }
}

/// Parses the source timestamp. Accepts RFC 3339 (trailing `Z` included),
/// offset-less ISO-8601 treated as UTC, and bare dates. Anything else
/// falls back to now.
fn parse_timestamp(value: Option<&Value>) -> DateTime<Utc> {
    if let Some(Value::String(s)) = value {
        let s = s.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return dt.with_timezone(&Utc);
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
            return DateTime::from_naive_utc_and_offset(naive, Utc);
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
            return DateTime::from_naive_utc_and_offset(naive, Utc);
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            if let Some(naive) = date.and_hms_opt(0, 0, 0) {
                return DateTime::from_naive_utc_and_offset(naive, Utc);
            }
        }
    }
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use serde_json::json;

    #[test]
    fn test_normalize_valid_job() {
        let raw = json!({
            "external_id": "test123",
            "title": "Software Engineer",
            "company": "Tech Corp",
            "description": "Great opportunity",
            "location": "Remote",
            "type": "remote",
            "apply_url": "https://example.com/apply",
            "timestamp": "2024-01-15T10:30:00Z"
        });

        let job = normalize(&raw).unwrap();
        assert_eq!(job.job_id, "test123");
        assert_eq!(job.title, "Software Engineer");
        assert_eq!(job.company, "Tech Corp");
        assert_eq!(job.work_mode, WorkMode::Remote);
        assert_eq!(job.apply_url, "https://example.com/apply");
    }

    #[test]
    fn test_normalize_alternate_field_names() {
        let raw = json!({
            "id": "alt-1",
            "job_title": "Backend Developer",
            "company_name": "Acme",
            "job_description": "Build services",
            "job_location": "Berlin",
            "link": "https://acme.example/jobs/1"
        });

        let job = normalize(&raw).unwrap();
        assert_eq!(job.job_id, "alt-1");
        assert_eq!(job.title, "Backend Developer");
        assert_eq!(job.company, "Acme");
        assert_eq!(job.description, "Build services");
        assert_eq!(job.location.as_deref(), Some("Berlin"));
        assert_eq!(job.apply_url, "https://acme.example/jobs/1");
    }

    #[test]
    fn test_normalize_missing_job_id_rejects_record() {
        let raw = json!({
            "title": "Software Engineer",
            "company": "Tech Corp",
            "description": "Great opportunity"
        });
        assert!(normalize(&raw).is_none());
    }

    #[test]
    fn test_normalize_empty_id_candidates_reject_record() {
        let raw = json!({ "external_id": "", "id": "   ", "title": "X" });
        assert!(normalize(&raw).is_none());
    }

    #[test]
    fn test_normalize_numeric_id_is_stringified() {
        let raw = json!({ "id": 4815162342u64, "title": "Numeric" });
        let job = normalize(&raw).unwrap();
        assert_eq!(job.job_id, "4815162342");
    }

    #[test]
    fn test_normalize_non_object_rejected() {
        assert!(normalize(&json!("not a job")).is_none());
        assert!(normalize(&json!(null)).is_none());
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let raw = json!({ "external_id": "d1" });
        let job = normalize(&raw).unwrap();
        assert_eq!(job.title, "Unknown Title");
        assert_eq!(job.company, "Unknown Company");
        assert_eq!(job.description, "");
        assert_eq!(job.location, None);
        assert_eq!(job.work_mode, WorkMode::Onsite);
        assert_eq!(job.apply_url, "");
    }

    #[test]
    fn test_work_mode_mapping() {
        assert_eq!(normalize_work_mode("Remote Work"), WorkMode::Remote);
        assert_eq!(normalize_work_mode("Hybrid"), WorkMode::Hybrid);
        assert_eq!(normalize_work_mode("HYBRID (3 days on-site)"), WorkMode::Hybrid);
        assert_eq!(normalize_work_mode("On-site"), WorkMode::Onsite);
        assert_eq!(normalize_work_mode(""), WorkMode::Onsite);
    }

    #[test]
    fn test_timestamp_rfc3339_with_zulu() {
        let parsed = parse_timestamp(Some(&json!("2024-01-15T10:30:00Z")));
        assert_eq!(parsed.hour(), 10);
        assert_eq!(parsed.minute(), 30);
    }

    #[test]
    fn test_timestamp_offsetless_is_utc() {
        let parsed = parse_timestamp(Some(&json!("2024-01-15T10:30:00")));
        assert_eq!(parsed.hour(), 10);
    }

    #[test]
    fn test_timestamp_bare_date() {
        let parsed = parse_timestamp(Some(&json!("2024-01-15")));
        assert_eq!(parsed.hour(), 0);
        assert_eq!(parsed.to_rfc3339()[..10].to_string(), "2024-01-15");
    }

    #[test]
    fn test_timestamp_garbage_defaults_to_now() {
        let before = Utc::now();
        let parsed = parse_timestamp(Some(&json!("next Tuesday")));
        assert!(parsed >= before);
    }

    #[test]
    fn test_timestamp_missing_defaults_to_now() {
        let before = Utc::now();
        let parsed = parse_timestamp(None);
        assert!(parsed >= before);
    }
}
