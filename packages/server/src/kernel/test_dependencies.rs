// Mock collaborators for kernel tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use autopilot::{ApplyOutcome, JobRecord};

use crate::domains::applications::{ApplicationRow, NewApplication};
use crate::kernel::traits::{ApplicationHistory, ApplyDriver};

/// In-memory [`ApplicationHistory`] that records every call and can be
/// scripted to fail.
pub struct MockApplicationHistory {
    applied: Mutex<HashSet<String>>,
    recorded: Mutex<Vec<NewApplication>>,
    fail_lookups: AtomicBool,
    fail_records: AtomicBool,
}

impl MockApplicationHistory {
    pub fn new() -> Self {
        Self {
            applied: Mutex::new(HashSet::new()),
            recorded: Mutex::new(Vec::new()),
            fail_lookups: AtomicBool::new(false),
            fail_records: AtomicBool::new(false),
        }
    }

    /// Seed a job id the store considers already applied.
    pub fn with_applied(self, job_id: &str) -> Self {
        self.applied.lock().unwrap().insert(job_id.to_string());
        self
    }

    pub fn failing_lookups(self) -> Self {
        self.fail_lookups.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_records(self) -> Self {
        self.fail_records.store(true, Ordering::SeqCst);
        self
    }

    /// Everything recorded, in call order.
    pub fn recorded(&self) -> Vec<NewApplication> {
        self.recorded.lock().unwrap().clone()
    }
}

#[async_trait]
impl ApplicationHistory for MockApplicationHistory {
    async fn is_previously_applied(&self, job_id: &str) -> Result<bool> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(anyhow!("history store unavailable"));
        }
        Ok(self.applied.lock().unwrap().contains(job_id))
    }

    async fn record_application(&self, application: NewApplication) -> Result<()> {
        self.recorded.lock().unwrap().push(application);
        if self.fail_records.load(Ordering::SeqCst) {
            return Err(anyhow!("history store unavailable"));
        }
        Ok(())
    }

    async fn list(&self, _limit: i64, _offset: i64) -> Result<Vec<ApplicationRow>> {
        Ok(Vec::new())
    }

    async fn find_by_job_id(&self, _job_id: &str) -> Result<Option<ApplicationRow>> {
        Ok(None)
    }
}

/// [`ApplyDriver`] that replays scripted outcomes and records which jobs it
/// was asked to apply to.
pub struct ScriptedDriver {
    outcomes: Mutex<Vec<ApplyOutcome>>,
    fallback: ApplyOutcome,
    applied: Mutex<Vec<String>>,
}

impl ScriptedDriver {
    /// Replay `outcomes` in order, then fall back to `FailedNoEasyApply`.
    pub fn new(outcomes: Vec<ApplyOutcome>) -> Self {
        let mut reversed = outcomes;
        reversed.reverse();
        Self {
            outcomes: Mutex::new(reversed),
            fallback: ApplyOutcome::FailedNoEasyApply,
            applied: Mutex::new(Vec::new()),
        }
    }

    /// Return the same outcome for every job.
    pub fn always(outcome: ApplyOutcome) -> Self {
        Self {
            outcomes: Mutex::new(Vec::new()),
            fallback: outcome,
            applied: Mutex::new(Vec::new()),
        }
    }

    pub fn applied_job_ids(&self) -> Vec<String> {
        self.applied.lock().unwrap().clone()
    }
}

#[async_trait]
impl ApplyDriver for ScriptedDriver {
    async fn apply(&self, job: &JobRecord) -> ApplyOutcome {
        self.applied.lock().unwrap().push(job.job_id.clone());
        self.outcomes
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| self.fallback.clone())
    }
}
