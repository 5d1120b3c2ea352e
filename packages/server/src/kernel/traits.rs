// Trait definitions for dependency injection
//
// Infrastructure seams only - run policy lives in kernel::run, and the
// page-driving logic lives in the autopilot crate.

use anyhow::Result;
use async_trait::async_trait;
use autopilot::{ApplyOutcome, JobRecord};

use crate::domains::applications::{ApplicationRow, NewApplication};

/// Persistence of application attempts.
///
/// `is_previously_applied` must be consulted before starting an apply flow;
/// `record_application` is called exactly once per job that reaches a
/// terminal state, including skips.
#[async_trait]
pub trait ApplicationHistory: Send + Sync {
    async fn is_previously_applied(&self, job_id: &str) -> Result<bool>;

    async fn record_application(&self, application: NewApplication) -> Result<()>;

    /// Recent attempts, newest first.
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<ApplicationRow>>;

    async fn find_by_job_id(&self, job_id: &str) -> Result<Option<ApplicationRow>>;
}

/// Drives one job to its terminal outcome. Implementations are total: a
/// page failure comes back as `FailedError`, never as a propagated error.
#[async_trait]
pub trait ApplyDriver: Send + Sync {
    async fn apply(&self, job: &JobRecord) -> ApplyOutcome;
}
