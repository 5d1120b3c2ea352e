// One-shot automation run: collect listings, apply, record outcomes.

use std::sync::Arc;

use anyhow::{Context, Result};
use server_core::config::ApplySettings;
use server_core::kernel::{execute_run, PostgresApplicationHistory};
use server_core::Config;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug,autopilot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    let settings = ApplySettings::from_env().context("Failed to load run settings")?;
    tracing::info!(
        title = %settings.search_title,
        location = %settings.search_location,
        max_jobs = settings.max_jobs_to_apply,
        "starting automation run"
    );

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let history = Arc::new(PostgresApplicationHistory::new(pool));

    let summary = execute_run(&settings, history).await?;

    tracing::info!(
        collected = summary.collected,
        attempted = summary.attempted,
        succeeded = summary.succeeded,
        skipped = summary.skipped,
        failed = summary.failed,
        "automation run finished"
    );
    Ok(())
}
