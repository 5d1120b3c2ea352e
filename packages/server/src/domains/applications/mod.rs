pub mod models;

pub use models::{ApplicationRow, NewApplication};
