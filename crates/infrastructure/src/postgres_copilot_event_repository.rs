use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use procura_application::CopilotEventRepository;
use procura_core::{AppError, AppResult, TenantId};
use procura_domain::{
    CopilotEvent, EntityKind, EntityReference, EventCount, EventFeature, EventQuery, EventStatus,
};

use crate::postgres_action_draft_repository::page_value;

/// PostgreSQL-backed append-only copilot event log.
#[derive(Clone)]
pub struct PostgresCopilotEventRepository {
    pool: PgPool,
}

impl PostgresCopilotEventRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct EventRow {
    event_id: Uuid,
    tenant_id: Uuid,
    actor: String,
    feature: String,
    status: String,
    request: Value,
    response: Option<Value>,
    latency_ms: i64,
    entity_kind: Option<String>,
    entity_id: Option<String>,
    occurred_at: DateTime<Utc>,
}

impl EventRow {
    fn into_event(self) -> AppResult<CopilotEvent> {
        let entity = match (self.entity_kind, self.entity_id) {
            (Some(kind), Some(id)) => Some(EntityReference::new(kind.parse::<EntityKind>()?, id)?),
            _ => None,
        };

        Ok(CopilotEvent {
            event_id: self.event_id,
            tenant_id: TenantId::from_uuid(self.tenant_id),
            actor: self.actor,
            feature: EventFeature::parse(self.feature.as_str())?,
            status: EventStatus::parse(self.status.as_str())?,
            request: self.request,
            response: self.response,
            latency_ms: u64::try_from(self.latency_ms).unwrap_or_default(),
            entity,
            occurred_at: self.occurred_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct CountRow {
    feature: String,
    status: String,
    count: i64,
}

/// Inserts one event on the given connection.
///
/// Transition writes call this inside their own transaction so the event and
/// the state change commit together.
pub(crate) async fn insert_event(connection: &mut PgConnection, event: &CopilotEvent) -> AppResult<()> {
    let latency_ms = i64::try_from(event.latency_ms).unwrap_or(i64::MAX);
    sqlx::query(
        r#"
        INSERT INTO copilot_events (
            event_id, tenant_id, actor, feature, status, request, response,
            latency_ms, entity_kind, entity_id, occurred_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(event.event_id)
    .bind(event.tenant_id.as_uuid())
    .bind(event.actor.as_str())
    .bind(event.feature.as_str())
    .bind(event.status.as_str())
    .bind(&event.request)
    .bind(event.response.as_ref())
    .bind(latency_ms)
    .bind(event.entity.as_ref().map(|entity| entity.entity_kind().as_str()))
    .bind(event.entity.as_ref().map(EntityReference::entity_id))
    .bind(event.occurred_at)
    .execute(&mut *connection)
    .await
    .map_err(|error| {
        AppError::Internal(format!(
            "failed to append '{}' copilot event: {error}",
            event.feature.as_str()
        ))
    })?;

    Ok(())
}

/// Appends the WHERE clause shared by listing and summarizing.
fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &EventQuery) {
    builder.push(" WHERE TRUE");
    if let Some(tenant_id) = query.tenant_id {
        builder.push(" AND tenant_id = ").push_bind(tenant_id.as_uuid());
    }
    if let Some(feature) = query.feature {
        builder.push(" AND feature = ").push_bind(feature.as_str());
    }
    if let Some(status) = query.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(from) = query.from {
        builder.push(" AND occurred_at >= ").push_bind(from);
    }
    if let Some(to) = query.to {
        builder.push(" AND occurred_at < ").push_bind(to);
    }
}

#[async_trait]
impl CopilotEventRepository for PostgresCopilotEventRepository {
    async fn append_event(&self, event: &CopilotEvent) -> AppResult<()> {
        let mut connection = self.pool.acquire().await.map_err(|error| {
            AppError::Internal(format!("failed to acquire event connection: {error}"))
        })?;
        insert_event(&mut *connection, event).await
    }

    async fn list_events(&self, query: &EventQuery) -> AppResult<Vec<CopilotEvent>> {
        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "SELECT event_id, tenant_id, actor, feature, status, request, response, \
             latency_ms, entity_kind, entity_id, occurred_at FROM copilot_events",
        );
        push_filters(&mut builder, query);
        builder
            .push(" ORDER BY occurred_at DESC, event_id LIMIT ")
            .push_bind(page_value(query.limit)?)
            .push(" OFFSET ")
            .push_bind(page_value(query.offset)?);

        let rows = builder
            .build_query_as::<EventRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to list copilot events: {error}")))?;

        rows.into_iter().map(EventRow::into_event).collect()
    }

    async fn summarize_events(&self, query: &EventQuery) -> AppResult<Vec<EventCount>> {
        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("SELECT feature, status, COUNT(*) AS count FROM copilot_events");
        push_filters(&mut builder, query);
        builder.push(" GROUP BY feature, status ORDER BY feature, status");

        let rows = builder
            .build_query_as::<CountRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to summarize copilot events: {error}"))
            })?;

        rows.into_iter()
            .map(|row| {
                Ok(EventCount {
                    feature: EventFeature::parse(row.feature.as_str())?,
                    status: EventStatus::parse(row.status.as_str())?,
                    count: u64::try_from(row.count).unwrap_or_default(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests;
