use async_trait::async_trait;
use sqlx::PgPool;

use procura_application::{AuditEvent, AuditRepository};
use procura_core::{AppError, AppResult};

/// PostgreSQL-backed append-only audit log for denials and entitlement checks.
#[derive(Clone)]
pub struct PostgresAuditRepository {
    pool: PgPool,
}

impl PostgresAuditRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRepository for PostgresAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        let AuditEvent {
            tenant_id,
            subject,
            action,
            resource_type,
            resource_id,
            detail,
        } = event;

        sqlx::query(
            r#"
            INSERT INTO audit_log_entries (tenant_id, subject, action, resource_type, resource_id, detail)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(subject)
        .bind(action.as_str())
        .bind(resource_type)
        .bind(resource_id)
        .bind(detail)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to append '{}' audit entry: {error}",
                action.as_str()
            ))
        })?;

        Ok(())
    }
}
