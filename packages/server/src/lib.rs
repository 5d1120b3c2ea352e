//! Host application for the quick-apply automation core.
//!
//! Wires the `autopilot` crate to its collaborators: a Postgres-backed
//! application-history repository, the run orchestrator, and an HTTP API
//! exposing recorded history.

pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::{ApplySettings, Config};
