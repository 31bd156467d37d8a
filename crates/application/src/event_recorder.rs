use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use procura_core::{ActorContext, AppError, AppResult, TenantId};
use procura_domain::{
    CopilotEvent, EntityReference, EventCount, EventFeature, EventQuery, EventStatus,
};
use serde_json::{Value, json};
use tracing::warn;
use uuid::Uuid;

use crate::{CopilotEventRepository, PermissionGate};

/// Largest page served by event listing.
pub const EVENT_PAGE_MAX: usize = 500;

/// One event to append.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    /// Event name.
    pub feature: EventFeature,
    /// Outcome.
    pub status: EventStatus,
    /// Request payload.
    pub request: Value,
    /// Response payload.
    pub response: Option<Value>,
    /// Latency of the recorded operation.
    pub latency_ms: u64,
    /// Correlated entity.
    pub entity: Option<EntityReference>,
}

impl EventRecord {
    /// Builds a success record timed from `started`.
    #[must_use]
    pub fn success(feature: EventFeature, request: Value, response: Value, started: Instant) -> Self {
        Self {
            feature,
            status: EventStatus::Success,
            request,
            response: Some(response),
            latency_ms: elapsed_ms(started),
            entity: None,
        }
    }

    /// Builds an error record carrying the failure code and message.
    #[must_use]
    pub fn failure(feature: EventFeature, request: Value, error: &AppError, started: Instant) -> Self {
        Self {
            feature,
            status: EventStatus::Error,
            request,
            response: Some(json!({
                "code": error.code(),
                "message": error.message(),
            })),
            latency_ms: elapsed_ms(started),
            entity: None,
        }
    }

    /// Correlates the record with an entity.
    #[must_use]
    pub fn with_entity(mut self, entity: EntityReference) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Stamps the record into an event without writing it.
    ///
    /// Transitions hand the event to their repository write so both land together.
    #[must_use]
    pub fn into_event(self, tenant_id: TenantId, actor: &str) -> CopilotEvent {
        CopilotEvent {
            event_id: Uuid::new_v4(),
            tenant_id,
            actor: actor.to_owned(),
            feature: self.feature,
            status: self.status,
            request: self.request,
            response: self.response,
            latency_ms: self.latency_ms,
            entity: self.entity,
            occurred_at: Utc::now(),
        }
    }
}

/// Append-only writer for the copilot event log.
#[derive(Clone)]
pub struct EventRecorder {
    repository: Arc<dyn CopilotEventRepository>,
}

impl EventRecorder {
    /// Creates a recorder.
    #[must_use]
    pub fn new(repository: Arc<dyn CopilotEventRepository>) -> Self {
        Self { repository }
    }

    /// Appends one event.
    pub async fn record(
        &self,
        tenant_id: TenantId,
        actor: &str,
        record: EventRecord,
    ) -> AppResult<CopilotEvent> {
        let event = record.into_event(tenant_id, actor);
        self.repository.append_event(&event).await?;
        Ok(event)
    }

    /// Records a failure and returns the original error.
    ///
    /// A failing event write is logged; the caller still sees the operation's own error.
    pub async fn record_failure(
        &self,
        tenant_id: TenantId,
        actor: &str,
        feature: EventFeature,
        request: Value,
        error: AppError,
        started: Instant,
    ) -> AppError {
        let record = EventRecord::failure(feature, request, &error, started);
        if let Err(record_error) = self.record(tenant_id, actor, record).await {
            warn!(
                feature = feature.as_str(),
                error = %record_error,
                "failed to record copilot error event"
            );
        }

        error
    }
}

/// Read side of the event log.
#[derive(Clone)]
pub struct EventQueryService {
    gate: PermissionGate,
    repository: Arc<dyn CopilotEventRepository>,
}

impl EventQueryService {
    /// Creates the read service.
    #[must_use]
    pub fn new(gate: PermissionGate, repository: Arc<dyn CopilotEventRepository>) -> Self {
        Self { gate, repository }
    }

    /// Lists events. Non-administrators are pinned to their own company.
    pub async fn list_events(
        &self,
        actor: &ActorContext,
        query: EventQuery,
    ) -> AppResult<Vec<CopilotEvent>> {
        let query = self.authorize(actor, query).await?;
        self.repository.list_events(&query).await
    }

    /// Counts events by feature and status.
    pub async fn summarize_events(
        &self,
        actor: &ActorContext,
        query: EventQuery,
    ) -> AppResult<Vec<EventCount>> {
        let query = self.authorize(actor, query).await?;
        self.repository.summarize_events(&query).await
    }

    async fn authorize(&self, actor: &ActorContext, mut query: EventQuery) -> AppResult<EventQuery> {
        if query.tenant_id.is_none() && !actor.is_platform_admin() {
            query.tenant_id = Some(actor.require_company()?);
        }

        self.gate.require_read_events(actor, query.tenant_id).await?;

        if let (Some(from), Some(to)) = (query.from, query.to)
            && from >= to
        {
            return Err(AppError::Validation(
                "event window start must be before its end".to_owned(),
            ));
        }

        query.limit = query.limit.clamp(1, EVENT_PAGE_MAX);
        Ok(query)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
