use chrono::{DateTime, Utc};
use procura_core::{AppError, TenantId};
use procura_domain::{CopilotEvent, EventCount, EventFeature, EventQuery, EventStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;
use uuid::Uuid;

use super::common::EntityReferenceResponse;

/// Query string filters for event reads.
#[derive(Debug, Default, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/event-list-query-request.ts"
)]
pub struct EventListQueryRequest {
    pub company_id: Option<String>,
    pub feature: Option<String>,
    pub status: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl TryFrom<EventListQueryRequest> for EventQuery {
    type Error = AppError;

    fn try_from(value: EventListQueryRequest) -> Result<Self, Self::Error> {
        let tenant_id = value
            .company_id
            .map(|raw| {
                Uuid::parse_str(raw.trim())
                    .map(TenantId::from_uuid)
                    .map_err(|error| AppError::Validation(format!("invalid company_id: {error}")))
            })
            .transpose()?;

        Ok(Self {
            tenant_id,
            feature: value.feature.as_deref().map(EventFeature::parse).transpose()?,
            status: value.status.as_deref().map(EventStatus::parse).transpose()?,
            from: value.from.as_deref().map(|raw| parse_timestamp("from", raw)).transpose()?,
            to: value.to.as_deref().map(|raw| parse_timestamp("to", raw)).transpose()?,
            limit: value.limit.unwrap_or(100),
            offset: value.offset.unwrap_or(0),
        })
    }
}

fn parse_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| {
            AppError::Validation(format!("invalid {field} timestamp '{raw}': {error}"))
        })
}

/// API representation of a copilot event.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/copilot-event-response.ts"
)]
pub struct CopilotEventResponse {
    pub event_id: String,
    pub company_id: String,
    pub actor: String,
    pub feature: String,
    pub status: String,
    #[ts(type = "Record<string, unknown>")]
    pub request: Value,
    #[ts(type = "Record<string, unknown> | null")]
    pub response: Option<Value>,
    #[ts(type = "number")]
    pub latency_ms: u64,
    pub entity: Option<EntityReferenceResponse>,
    pub occurred_at: String,
}

impl From<CopilotEvent> for CopilotEventResponse {
    fn from(value: CopilotEvent) -> Self {
        Self {
            event_id: value.event_id.to_string(),
            company_id: value.tenant_id.to_string(),
            actor: value.actor,
            feature: value.feature.as_str().to_owned(),
            status: value.status.as_str().to_owned(),
            request: value.request,
            response: value.response,
            latency_ms: value.latency_ms,
            entity: value.entity.as_ref().map(EntityReferenceResponse::from),
            occurred_at: value.occurred_at.to_rfc3339(),
        }
    }
}

/// Number of events for one feature and status.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/event-count-response.ts"
)]
pub struct EventCountResponse {
    pub feature: String,
    pub status: String,
    #[ts(type = "number")]
    pub count: u64,
}

impl From<EventCount> for EventCountResponse {
    fn from(value: EventCount) -> Self {
        Self {
            feature: value.feature.as_str().to_owned(),
            status: value.status.as_str().to_owned(),
            count: value.count,
        }
    }
}
