//! Process configuration, loaded once from the environment.
//!
//! Split per binary: [`Config`] is what the API server needs, while
//! [`ApplySettings`] carries the automation-run knobs and is only loaded by
//! `apply-run`. The server must start without credentials or search terms.

use anyhow::{Context, Result};
use autopilot::{Credentials, SearchQuery};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("PORT must be a number")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ApplySettings {
    pub apply_email: String,
    pub apply_password: String,
    pub search_title: String,
    pub search_location: String,
    pub max_jobs_to_apply: usize,
    pub headless: bool,
}

impl ApplySettings {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            apply_email: std::env::var("APPLY_EMAIL").context("APPLY_EMAIL must be set")?,
            apply_password: std::env::var("APPLY_PASSWORD")
                .context("APPLY_PASSWORD must be set")?,
            search_title: std::env::var("SEARCH_TITLE").context("SEARCH_TITLE must be set")?,
            search_location: std::env::var("SEARCH_LOCATION")
                .context("SEARCH_LOCATION must be set")?,
            max_jobs_to_apply: std::env::var("MAX_JOBS_TO_APPLY")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("MAX_JOBS_TO_APPLY must be a number")?,
            headless: std::env::var("HEADLESS")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
        })
    }

    pub fn search_query(&self) -> SearchQuery {
        SearchQuery {
            title: self.search_title.clone(),
            location: self.search_location.clone(),
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            email: self.apply_email.clone(),
            password: self.apply_password.clone(),
        }
    }
}
