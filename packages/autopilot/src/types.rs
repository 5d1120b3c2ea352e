//! Core data types shared across the collector and the apply flow.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::surface::ElementRef;

/// One discovered listing. Immutable after collection; ownership passes to
/// the caller. `job_id` is the platform-assigned identifier and the only
/// dedup/application key (position in the feed is never used).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub url: String,
    /// Inferred from page markup at discovery time. Advisory only; the
    /// authoritative check is the external history lookup.
    pub already_applied_hint: bool,
}

/// Search parameters for one collection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub title: String,
    pub location: String,
}

/// Login credentials. The password is redacted from debug output.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Terminal result of one apply attempt. Produced exactly once per job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Succeeded,
    /// No quick-apply trigger was available for the job.
    FailedNoEasyApply,
    /// The modal requires input this system must not synthesize.
    FailedIncomplete(String),
    /// An unexpected page interaction failure, isolated to this job.
    FailedError(String),
    /// The job was skipped before the flow started (caller-produced).
    SkippedAlreadyApplied,
}

impl ApplyOutcome {
    /// Stable label used for persistence and logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyOutcome::Succeeded => "succeeded",
            ApplyOutcome::FailedNoEasyApply => "failed_no_easy_apply",
            ApplyOutcome::FailedIncomplete(_) => "failed_incomplete",
            ApplyOutcome::FailedError(_) => "failed_error",
            ApplyOutcome::SkippedAlreadyApplied => "skipped_already_applied",
        }
    }

    /// Human-readable reason/cause, where the variant carries one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApplyOutcome::FailedIncomplete(reason) => Some(reason),
            ApplyOutcome::FailedError(cause) => Some(cause),
            _ => None,
        }
    }
}

impl fmt::Display for ApplyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.detail() {
            Some(detail) => write!(f, "{} ({})", self.as_str(), detail),
            None => f.write_str(self.as_str()),
        }
    }
}

/// The primary action currently offered by the apply modal.
///
/// Classification priority is Submit over Review over Next: Review signals
/// the flow is closer to completion than Next, and Submit ends it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryAction {
    Submit,
    Review,
    Next,
}

/// Snapshot of the currently visible modal control set.
///
/// Recomputed from the live page on every state-machine tick and never
/// cached across ticks; the underlying page mutates asynchronously.
#[derive(Debug)]
pub struct ModalStep {
    pub primary: Option<(PrimaryAction, ElementRef)>,
    pub has_questions: bool,
    pub questions_prefilled: bool,
    pub empty_required: bool,
}

impl ModalStep {
    /// True when the modal exposes screening questions the user has not
    /// answered. The flow must stop here rather than guess an answer.
    pub fn blocks_on_input(&self) -> bool {
        self.has_questions && !self.questions_prefilled && self.empty_required
    }
}
