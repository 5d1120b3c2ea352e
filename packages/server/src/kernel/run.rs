//! Run orchestrator: one session, one collector pass, one job at a time.
//!
//! ```text
//! execute_run
//!     │
//!     ├─► BrowserSession::launch          (released on every exit path)
//!     ├─► ListingCollector::collect       (deduplicated JobRecords)
//!     └─► RunService::process
//!             ├─► history.is_previously_applied   (warn + proceed on error)
//!             ├─► driver.apply                    (one terminal outcome)
//!             └─► history.record_application      (once per terminal state)
//! ```
//!
//! Jobs run strictly sequentially: the session models a single logical
//! user, and concurrent modal interactions on one page would corrupt state.
//! Processing may stop between jobs (the cap), never mid-flow.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use autopilot::{
    ApplyFlow, ApplyOutcome, AutopilotError, BrowserSession, JobRecord, ListingCollector,
    SessionConfig,
};
use tracing::{debug, error, info, warn};

use crate::config::ApplySettings;
use crate::domains::applications::NewApplication;
use crate::kernel::traits::{ApplicationHistory, ApplyDriver};

#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Cap on apply attempts per run; skips do not count against it.
    pub max_jobs_to_apply: usize,
}

/// Tally of one run, for logs and the exit summary.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub collected: usize,
    pub attempted: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// [`ApplyDriver`] over the real apply-flow state machine.
pub struct FlowDriver {
    flow: ApplyFlow,
}

impl FlowDriver {
    pub fn new(flow: ApplyFlow) -> Self {
        Self { flow }
    }
}

#[async_trait]
impl ApplyDriver for FlowDriver {
    async fn apply(&self, job: &JobRecord) -> ApplyOutcome {
        self.flow.run(job).await
    }
}

/// Applies run policy to a collected job sequence.
pub struct RunService {
    history: Arc<dyn ApplicationHistory>,
    config: RunConfig,
}

impl RunService {
    pub fn new(history: Arc<dyn ApplicationHistory>, config: RunConfig) -> Self {
        Self { history, config }
    }

    /// Process jobs in discovery order. Every job that enters the loop
    /// reaches exactly one terminal state and is recorded exactly once.
    pub async fn process(&self, jobs: &[JobRecord], driver: &dyn ApplyDriver) -> RunSummary {
        let mut summary = RunSummary {
            collected: jobs.len(),
            ..Default::default()
        };

        for job in jobs {
            if summary.attempted >= self.config.max_jobs_to_apply {
                info!(
                    cap = self.config.max_jobs_to_apply,
                    "apply cap reached, stopping run"
                );
                break;
            }

            if job.already_applied_hint {
                debug!(job_id = %job.job_id, "card carried an applied badge");
            }

            // Availability over strict dedup: a broken history store must
            // not stall the run.
            let previously = match self.history.is_previously_applied(&job.job_id).await {
                Ok(applied) => applied,
                Err(e) => {
                    warn!(job_id = %job.job_id, error = %e, "history lookup failed, proceeding as not applied");
                    false
                }
            };

            if previously {
                info!(job_id = %job.job_id, title = %job.title, "already applied, skipping");
                summary.skipped += 1;
                self.record(job, &ApplyOutcome::SkippedAlreadyApplied).await;
                continue;
            }

            summary.attempted += 1;
            let outcome = driver.apply(job).await;
            match outcome {
                ApplyOutcome::Succeeded => summary.succeeded += 1,
                _ => summary.failed += 1,
            }
            self.record(job, &outcome).await;
        }

        info!(?summary, "run complete");
        summary
    }

    /// Recording failures are logged, never propagated: the outcome already
    /// happened on the remote site and must not be retried because of a
    /// local store error.
    async fn record(&self, job: &JobRecord, outcome: &ApplyOutcome) {
        let application = NewApplication::from_outcome(job, outcome);
        if let Err(e) = self.history.record_application(application).await {
            error!(job_id = %job.job_id, outcome = %outcome, error = %e, "failed to record application");
        }
    }
}

/// One full automation run: launch, collect, apply, and always release the
/// browser session, including on error paths.
pub async fn execute_run(
    settings: &ApplySettings,
    history: Arc<dyn ApplicationHistory>,
) -> Result<RunSummary> {
    let session_config = SessionConfig {
        headless: settings.headless,
        ..Default::default()
    };
    let session = BrowserSession::launch(&session_config).await?;
    let result = run_with_session(&session, settings, history).await;
    session.close().await;
    result
}

async fn run_with_session(
    session: &BrowserSession,
    settings: &ApplySettings,
    history: Arc<dyn ApplicationHistory>,
) -> Result<RunSummary> {
    let surface = session.surface();

    let collector = ListingCollector::new(surface.clone());
    let jobs = match collector
        .collect(&settings.search_query(), &settings.credentials())
        .await
    {
        Ok(jobs) => jobs,
        Err(AutopilotError::NoResultsFound(waited)) => {
            info!(?waited, "search returned no quick-apply listings");
            Vec::new()
        }
        Err(e) => return Err(e.into()),
    };
    info!(collected = jobs.len(), "collection pass finished");

    let driver = FlowDriver::new(ApplyFlow::new(surface));
    let service = RunService::new(
        history,
        RunConfig {
            max_jobs_to_apply: settings.max_jobs_to_apply,
        },
    );
    Ok(service.process(&jobs, &driver).await)
}
