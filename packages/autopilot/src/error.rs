//! Error taxonomy for the automation core.
//!
//! Transient conditions (element absent, empty feed pass) are not errors and
//! never appear here; they are encoded as `None`/`false`/loop termination.

use std::time::Duration;

use thiserror::Error;

/// Failure while talking to the live page over the control channel.
///
/// These are per-interaction failures. The `ElementLocator` swallows them
/// (absence semantics); the apply-flow machine converts them into a terminal
/// `FailedError` outcome for the one job being processed.
#[derive(Debug, Error)]
pub enum SurfaceError {
    /// A previously returned element reference no longer maps to current
    /// page content. References must be re-acquired by semantic query.
    #[error("stale element reference")]
    Stale,

    /// The browser transport dropped or rejected the command.
    #[error("browser transport error: {0}")]
    Transport(String),

    /// In-page script evaluation failed or returned an unusable value.
    #[error("script evaluation failed: {0}")]
    Evaluation(String),
}

/// Run-level failures surfaced by the collector and the session.
#[derive(Debug, Error)]
pub enum AutopilotError {
    /// The post-login landing indicator never appeared. Aborts the run:
    /// an unauthenticated session cannot reliably expose quick-apply state.
    #[error("authentication failed: no landing indicator within {0:?}")]
    AuthenticationFailed(Duration),

    /// The results surface rendered zero cards within the timeout. Signals
    /// an empty result set to the caller, not a hard failure.
    #[error("no results found for query within {0:?}")]
    NoResultsFound(Duration),

    /// The browser process could not be started or connected to.
    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),

    /// A page interaction failed outside any per-job recovery scope.
    #[error(transparent)]
    Surface(#[from] SurfaceError),
}
