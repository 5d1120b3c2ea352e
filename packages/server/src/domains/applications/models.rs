//! Application-history records.

use autopilot::{ApplyOutcome, JobRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// One persisted application attempt, as stored and as served by the API.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ApplicationRow {
    pub id: Uuid,
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub url: String,
    /// Stable outcome label, see [`ApplyOutcome::as_str`].
    pub outcome: String,
    pub detail: Option<String>,
    pub applied_at: DateTime<Utc>,
}

/// A terminal outcome ready to be recorded.
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub url: String,
    pub outcome: String,
    pub detail: Option<String>,
    pub applied_at: DateTime<Utc>,
}

impl NewApplication {
    pub fn from_outcome(job: &JobRecord, outcome: &ApplyOutcome) -> Self {
        Self {
            job_id: job.job_id.clone(),
            title: job.title.clone(),
            company: job.company.clone(),
            url: job.url.clone(),
            outcome: outcome.as_str().to_string(),
            detail: outcome.detail().map(str::to_string),
            applied_at: Utc::now(),
        }
    }
}
