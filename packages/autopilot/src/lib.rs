//! Quick-apply automation core.
//!
//! Drives a job-listing site through a live browser session and turns its
//! semi-structured UI into two well-defined operations:
//!
//! - [`ListingCollector::collect`] paginates an infinite-scroll results feed
//!   into a deduplicated sequence of [`JobRecord`]s.
//! - [`ApplyFlow::run`] advances one job's multi-step apply modal to exactly
//!   one terminal [`ApplyOutcome`].
//!
//! # Architecture
//!
//! ```text
//! BrowserSession (chromiumoxide)
//!     │
//!     └─► PageSurface (trait: queries + actions against the live page)
//!             │
//!             ├─► ElementLocator   (semantic intent → zero-or-one elements)
//!             ├─► ListingCollector (login, search, scroll-harvest)
//!             └─► ApplyFlow        (modal state machine → ApplyOutcome)
//! ```
//!
//! The locator never raises on absence: a missing element is an expected
//! outcome encoded as `None`/`false`. All waits are bounded polls; nothing
//! in this crate blocks without a deadline.

pub mod collector;
pub mod error;
pub mod flow;
pub mod locator;
pub mod session;
pub mod surface;
pub mod testing;
pub mod types;

pub use collector::{CollectorConfig, ListingCollector};
pub use error::{AutopilotError, SurfaceError};
pub use flow::{ApplyFlow, FlowConfig};
pub use locator::ElementLocator;
pub use session::{BrowserSession, SessionConfig};
pub use surface::{ElementRef, PageSurface};
pub use types::{ApplyOutcome, Credentials, JobRecord, ModalStep, PrimaryAction, SearchQuery};
