use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use procura_application::{EntityStore, NewEntityRecord, WorkspaceSearch, WorkspaceToolProvider};
use procura_core::{AppError, AppResult, TenantId};
use procura_domain::EntityReference;

use crate::postgres_action_draft_repository::page_value;

/// PostgreSQL-backed procurement record store.
///
/// Converted drafts land here through the draft decision transaction, and
/// converters and chat search tools read from the same table.
#[derive(Clone)]
pub struct PostgresEntityStore {
    pool: PgPool,
}

impl PostgresEntityStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct RecordRow {
    record_id: Uuid,
    entity_kind: String,
    data: Value,
    created_at: DateTime<Utc>,
}

/// Inserts converted entities on the given connection.
///
/// Runs inside the draft decision transaction; a repeated idempotency key
/// violates the unique index and aborts the whole decision.
pub(crate) async fn insert_records(
    connection: &mut PgConnection,
    tenant_id: TenantId,
    created_by: &str,
    records: &[NewEntityRecord],
) -> AppResult<()> {
    for record in records {
        sqlx::query(
            r#"
            INSERT INTO procurement_records (
                record_id, tenant_id, entity_kind, idempotency_key, data, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(record.record_id)
        .bind(tenant_id.as_uuid())
        .bind(record.entity_kind.as_str())
        .bind(record.idempotency_key.as_str())
        .bind(&record.data)
        .bind(created_by)
        .execute(&mut *connection)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to create {} record: {error}",
                record.entity_kind.as_str()
            ))
        })?;
    }

    Ok(())
}

#[async_trait]
impl EntityStore for PostgresEntityStore {
    async fn entity_exists(
        &self,
        tenant_id: TenantId,
        reference: &EntityReference,
    ) -> AppResult<bool> {
        let Ok(record_id) = Uuid::parse_str(reference.entity_id()) else {
            return Ok(false);
        };

        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM procurement_records
                WHERE tenant_id = $1 AND entity_kind = $2 AND record_id = $3
            )
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(reference.entity_kind().as_str())
        .bind(record_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to check entity '{reference}': {error}"))
        })
    }
}

#[async_trait]
impl WorkspaceToolProvider for PostgresEntityStore {
    async fn search_records(
        &self,
        tenant_id: TenantId,
        search: WorkspaceSearch,
    ) -> AppResult<Vec<Value>> {
        let pattern = search
            .text
            .as_deref()
            .map(|text| format!("%{}%", text.replace('%', "\\%").replace('_', "\\_")));

        let rows = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT record_id, entity_kind, data, created_at
            FROM procurement_records
            WHERE tenant_id = $1
              AND entity_kind = $2
              AND ($3::TEXT IS NULL OR data::TEXT ILIKE $3)
            ORDER BY created_at DESC
            LIMIT $4
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(search.record_kind.as_str())
        .bind(pattern)
        .bind(page_value(search.limit)?)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to search {} records: {error}",
                search.record_kind
            ))
        })?;

        Ok(rows
            .into_iter()
            .map(|row| {
                json!({
                    "id": row.record_id,
                    "kind": row.entity_kind,
                    "data": row.data,
                    "created_at": row.created_at,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests;
