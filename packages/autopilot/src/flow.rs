//! Apply-Flow state machine: one job, one modal, one terminal outcome.
//!
//! The modal has a bounded but unknown number of steps. Each tick re-queries
//! the live page for the current control set (nothing is cached across
//! ticks), decides whether the flow is blocked on input the user must
//! provide, and otherwise clicks the primary action. Any interaction
//! failure is caught and converted into a terminal outcome so one job's
//! failure never blocks the next.
//!
//! ```text
//! NotStarted ─► Opened ─► Stepping ─► AwaitingReview ─► Submitted ─► Done
//!      │                     │
//!      ▼                     ▼
//! NoEasyApplyAvailable   BlockedOnInput / Errored
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::SurfaceError;
use crate::locator::ElementLocator;
use crate::surface::PageSurface;
use crate::types::{ApplyOutcome, JobRecord, PrimaryAction};

const BLOCKED_REASON: &str = "unanswered required questions";
const STEP_LIMIT_CAUSE: &str = "step limit exceeded";

/// Tunables for the state machine. Every wait is bounded.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Deadline for the quick-apply trigger after the card is focused.
    pub open_timeout: Duration,
    /// Deadline for the confirmation dismiss control after submission.
    pub done_timeout: Duration,
    /// Interval between modal-state polls.
    pub poll_interval: Duration,
    /// Pause after each click, letting the modal re-render.
    pub settle: Duration,
    /// Bounds the stepping loop if primary-action detection oscillates.
    pub max_steps: usize,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            open_timeout: Duration::from_secs(10),
            done_timeout: Duration::from_secs(8),
            poll_interval: Duration::from_millis(500),
            settle: Duration::from_millis(800),
            max_steps: 12,
        }
    }
}

/// Machine states, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlowState {
    NotStarted,
    Opened,
    Stepping,
    AwaitingReview,
    Submitted,
    Done,
}

/// Drives one job's apply modal from open to terminal outcome.
pub struct ApplyFlow {
    surface: Arc<dyn PageSurface>,
    locator: ElementLocator,
    config: FlowConfig,
}

impl ApplyFlow {
    pub fn new(surface: Arc<dyn PageSurface>) -> Self {
        Self::with_config(surface, FlowConfig::default())
    }

    pub fn with_config(surface: Arc<dyn PageSurface>, config: FlowConfig) -> Self {
        let locator = ElementLocator::new(surface.clone());
        Self {
            surface,
            locator,
            config,
        }
    }

    /// Run the flow to completion. Always produces exactly one terminal
    /// outcome; interaction failures surface as `FailedError`, never as a
    /// propagated error.
    pub async fn run(&self, job: &JobRecord) -> ApplyOutcome {
        let outcome = match self.drive(job).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(job_id = %job.job_id, error = %e, "apply flow aborted by page failure");
                ApplyOutcome::FailedError(e.to_string())
            }
        };
        info!(job_id = %job.job_id, outcome = %outcome, "apply flow finished");
        outcome
    }

    async fn drive(&self, job: &JobRecord) -> Result<ApplyOutcome, SurfaceError> {
        let mut state = FlowState::NotStarted;

        // Focus the card so the detail pane (and its apply trigger) renders.
        if let Some(card) = self.locator.job_card_by_id(&job.job_id).await {
            self.surface.click(&card).await?;
        } else {
            // The virtualized feed may have de-rendered the card. A trigger
            // found on the feed could belong to whatever listing the detail
            // pane currently shows, so open the job's own page and probe
            // there instead.
            debug!(job_id = %job.job_id, url = %job.url, "card not rendered, opening job page");
            self.surface.goto(&job.url).await?;
        }
        tokio::time::sleep(self.config.settle).await;

        let trigger = self
            .locator
            .wait_first_visible(
                crate::locator::selectors::EASY_APPLY_BUTTON,
                self.config.open_timeout,
                self.config.poll_interval,
            )
            .await;
        let Some(trigger) = trigger else {
            debug!(job_id = %job.job_id, "no quick-apply trigger");
            return Ok(ApplyOutcome::FailedNoEasyApply);
        };
        self.surface.click(&trigger).await?;
        self.transition(&mut state, FlowState::Opened, job);
        tokio::time::sleep(self.config.settle).await;

        for step in 1..=self.config.max_steps {
            let snapshot = self.locator.modal_step().await;
            debug!(
                job_id = %job.job_id,
                step,
                primary = ?snapshot.primary.as_ref().map(|(a, _)| *a),
                has_questions = snapshot.has_questions,
                prefilled = snapshot.questions_prefilled,
                empty_required = snapshot.empty_required,
                "modal tick"
            );

            // Never submit synthetic answers to unknown screening questions.
            if snapshot.blocks_on_input() {
                info!(job_id = %job.job_id, "blocked on unanswered required questions");
                return Ok(ApplyOutcome::FailedIncomplete(BLOCKED_REASON.to_string()));
            }

            match snapshot.primary {
                None => {
                    // The modal may still be rendering; the step limit
                    // bounds how long we tolerate this.
                    tokio::time::sleep(self.config.poll_interval).await;
                }
                Some((PrimaryAction::Submit, el)) => {
                    self.transition(&mut state, FlowState::AwaitingReview, job);
                    self.surface.click(&el).await?;
                    self.transition(&mut state, FlowState::Submitted, job);
                    self.dismiss_confirmation(job).await;
                    self.transition(&mut state, FlowState::Done, job);
                    return Ok(ApplyOutcome::Succeeded);
                }
                Some((action, el)) => {
                    debug!(job_id = %job.job_id, step, action = ?action, "advancing modal");
                    self.surface.click(&el).await?;
                    self.transition(&mut state, FlowState::Stepping, job);
                    tokio::time::sleep(self.config.settle).await;
                }
            }
        }

        warn!(job_id = %job.job_id, max_steps = self.config.max_steps, "primary-action detection looped");
        Ok(ApplyOutcome::FailedError(STEP_LIMIT_CAUSE.to_string()))
    }

    /// Submission itself is the success signal; the dismissal click is
    /// cosmetic. A missing Done control is a soft anomaly worth logging,
    /// since confirmation UI varies the most across listings.
    async fn dismiss_confirmation(&self, job: &JobRecord) {
        let done = self
            .locator
            .wait_first_visible(
                crate::locator::selectors::DONE_BUTTON,
                self.config.done_timeout,
                self.config.poll_interval,
            )
            .await;
        match done {
            Some(el) => {
                if let Err(e) = self.surface.click(&el).await {
                    debug!(job_id = %job.job_id, error = %e, "dismiss click failed after submission");
                }
            }
            None => {
                warn!(job_id = %job.job_id, "submission confirmed but no dismiss control found");
            }
        }
    }

    fn transition(&self, state: &mut FlowState, next: FlowState, job: &JobRecord) {
        debug!(job_id = %job.job_id, from = ?state, to = ?next, "flow transition");
        *state = next;
    }
}
