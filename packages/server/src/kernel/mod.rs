//! Infrastructure: trait seams, the Postgres history repository, and the
//! run orchestrator.

pub mod history;
pub mod run;
pub mod traits;

#[cfg(test)]
pub mod test_dependencies;

pub use history::PostgresApplicationHistory;
pub use run::{execute_run, FlowDriver, RunConfig, RunService, RunSummary};
pub use traits::{ApplicationHistory, ApplyDriver};
