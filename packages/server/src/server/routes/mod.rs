mod applications;
mod health;

pub use applications::{get_application, list_applications};
pub use health::health_handler;
