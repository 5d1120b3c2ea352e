//! Postgres-backed application history.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;

use crate::domains::applications::{ApplicationRow, NewApplication};
use crate::kernel::traits::ApplicationHistory;

/// Outcomes that count as "already applied" for dedup purposes. A prior
/// failed attempt does not: the job is still worth retrying in a later run.
const APPLIED_OUTCOMES: [&str; 2] = ["succeeded", "skipped_already_applied"];

pub struct PostgresApplicationHistory {
    pool: PgPool,
}

impl PostgresApplicationHistory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApplicationHistory for PostgresApplicationHistory {
    async fn is_previously_applied(&self, job_id: &str) -> Result<bool> {
        let applied: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM applications WHERE job_id = $1 AND outcome = ANY($2))",
        )
        .bind(job_id)
        .bind(&APPLIED_OUTCOMES[..])
        .fetch_one(&self.pool)
        .await
        .context("Failed to check application history")?;
        Ok(applied)
    }

    async fn record_application(&self, application: NewApplication) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO applications (job_id, title, company, url, outcome, detail, applied_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (job_id) DO UPDATE SET
                outcome = EXCLUDED.outcome,
                detail = EXCLUDED.detail,
                applied_at = EXCLUDED.applied_at
            "#,
        )
        .bind(&application.job_id)
        .bind(&application.title)
        .bind(&application.company)
        .bind(&application.url)
        .bind(&application.outcome)
        .bind(&application.detail)
        .bind(application.applied_at)
        .execute(&self.pool)
        .await
        .context("Failed to record application")?;
        Ok(())
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<ApplicationRow>> {
        let rows = sqlx::query_as::<_, ApplicationRow>(
            "SELECT * FROM applications ORDER BY applied_at DESC, job_id LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list applications")?;
        Ok(rows)
    }

    async fn find_by_job_id(&self, job_id: &str) -> Result<Option<ApplicationRow>> {
        let row = sqlx::query_as::<_, ApplicationRow>(
            "SELECT * FROM applications WHERE job_id = $1",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch application")?;
        Ok(row)
    }
}
