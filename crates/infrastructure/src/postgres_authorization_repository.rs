use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tracing::warn;

use procura_application::AuthorizationRepository;
use procura_core::{AppError, AppResult, TenantId};
use procura_domain::Permission;

/// PostgreSQL-backed lookup of explicit copilot permission grants.
#[derive(Clone)]
pub struct PostgresAuthorizationRepository {
    pool: PgPool,
}

impl PostgresAuthorizationRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Grants one permission to a subject. Granting twice is a no-op.
    pub async fn grant(
        &self,
        tenant_id: TenantId,
        subject: &str,
        permission: Permission,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO copilot_permission_grants (tenant_id, subject, permission)
            VALUES ($1, $2, $3)
            ON CONFLICT (tenant_id, subject, permission) DO NOTHING
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(subject)
        .bind(permission.as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to store permission grant: {error}")))?;

        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct GrantRow {
    permission: String,
}

#[async_trait]
impl AuthorizationRepository for PostgresAuthorizationRepository {
    async fn list_permissions_for_subject(
        &self,
        tenant_id: TenantId,
        subject: &str,
    ) -> AppResult<Vec<Permission>> {
        let rows = sqlx::query_as::<_, GrantRow>(
            r#"
            SELECT permission
            FROM copilot_permission_grants
            WHERE tenant_id = $1 AND subject = $2
            ORDER BY permission
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(subject)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list permission grants for subject '{subject}': {error}"
            ))
        })?;

        // Grants written by a newer release are skipped rather than failing the lookup.
        Ok(rows
            .into_iter()
            .filter_map(|row| match Permission::from_str(row.permission.as_str()) {
                Ok(permission) => Some(permission),
                Err(_) => {
                    warn!(permission = %row.permission, "ignoring unknown stored permission");
                    None
                }
            })
            .collect())
    }
}
