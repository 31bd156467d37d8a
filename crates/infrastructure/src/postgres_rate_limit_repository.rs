//! PostgreSQL-backed copilot request budgets using the `copilot_rate_limits` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use procura_application::{AttemptInfo, RateLimitRepository};
use procura_core::{AppError, AppResult};

/// PostgreSQL implementation of the rate limit repository port.
#[derive(Clone)]
pub struct PostgresRateLimitRepository {
    pool: PgPool,
}

impl PostgresRateLimitRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WindowRow {
    attempt_count: i32,
    window_started_at: DateTime<Utc>,
}

#[async_trait]
impl RateLimitRepository for PostgresRateLimitRepository {
    async fn record_attempt(
        &self,
        key: &str,
        window_duration_seconds: i64,
    ) -> AppResult<AttemptInfo> {
        if window_duration_seconds <= 0 {
            return Err(AppError::Validation(
                "rate limit window must be greater than zero seconds".to_owned(),
            ));
        }

        // An expired window restarts at one attempt.
        let row = sqlx::query_as::<_, WindowRow>(
            r#"
            INSERT INTO copilot_rate_limits AS limits (key, window_started_at, attempt_count)
            VALUES ($1, now(), 1)
            ON CONFLICT (key) DO UPDATE
            SET
                attempt_count = CASE
                    WHEN limits.window_started_at + make_interval(secs => $2::float8) <= now()
                    THEN 1
                    ELSE limits.attempt_count + 1
                END,
                window_started_at = CASE
                    WHEN limits.window_started_at + make_interval(secs => $2::float8) <= now()
                    THEN now()
                    ELSE limits.window_started_at
                END
            RETURNING attempt_count, window_started_at
            "#,
        )
        .bind(key)
        .bind(window_duration_seconds as f64)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to count copilot request: {error}")))?;

        Ok(AttemptInfo {
            attempt_count: row.attempt_count,
            window_started_at: row.window_started_at,
        })
    }

    async fn cleanup_expired(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM copilot_rate_limits WHERE window_started_at < $1")
            .bind(before)
            .execute(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to prune copilot rate limits: {error}"))
            })?;

        Ok(result.rows_affected())
    }
}
