use chrono::{DateTime, Utc};
use procura_core::{AppError, AppResult, TenantId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::entity::EntityReference;

/// Outcome recorded on a copilot event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Operation or external call succeeded.
    Success,
    /// Operation or external call failed.
    Error,
}

impl EventStatus {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    /// Parses storage value.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            _ => Err(AppError::Validation(format!(
                "unknown event status '{value}'"
            ))),
        }
    }
}

/// Closed set of event names written to the copilot event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventFeature {
    /// Action planning call.
    ActionPlan,
    /// Draft approval and conversion.
    ActionApprove,
    /// Draft rejection.
    ActionReject,
    /// Draft rating.
    ActionFeedback,
    /// Workflow planning call.
    WorkflowStart,
    /// Workflow step drafted.
    WorkflowStepReady,
    /// Workflow step approved.
    WorkflowStepApproved,
    /// Workflow step rejected.
    WorkflowStepRejected,
    /// Workflow finished.
    WorkflowCompleted,
    /// Workflow cancelled by a user.
    WorkflowCancelled,
    /// Chat completion call.
    ChatResponse,
    /// Tool batch resolved against workspace data.
    ToolsResolved,
    /// Tool batch replaced by a guided resolution.
    ToolsFallback,
}

impl EventFeature {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ActionPlan => "action_plan",
            Self::ActionApprove => "action_approve",
            Self::ActionReject => "action_reject",
            Self::ActionFeedback => "action_feedback",
            Self::WorkflowStart => "workflow_start",
            Self::WorkflowStepReady => "workflow_step_ready",
            Self::WorkflowStepApproved => "workflow_step_approved",
            Self::WorkflowStepRejected => "workflow_step_rejected",
            Self::WorkflowCompleted => "workflow_completed",
            Self::WorkflowCancelled => "workflow_cancelled",
            Self::ChatResponse => "chat_response",
            Self::ToolsResolved => "tools_resolved",
            Self::ToolsFallback => "tools_fallback",
        }
    }

    /// Returns all known features.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[EventFeature] = &[
            EventFeature::ActionPlan,
            EventFeature::ActionApprove,
            EventFeature::ActionReject,
            EventFeature::ActionFeedback,
            EventFeature::WorkflowStart,
            EventFeature::WorkflowStepReady,
            EventFeature::WorkflowStepApproved,
            EventFeature::WorkflowStepRejected,
            EventFeature::WorkflowCompleted,
            EventFeature::WorkflowCancelled,
            EventFeature::ChatResponse,
            EventFeature::ToolsResolved,
            EventFeature::ToolsFallback,
        ];

        ALL
    }

    /// Parses storage value.
    pub fn parse(value: &str) -> AppResult<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|feature| feature.as_str() == value)
            .ok_or_else(|| AppError::Validation(format!("unknown event feature '{value}'")))
    }
}

/// Immutable audit record of one transition or external call attempt.
///
/// Workflow events embed a denormalized snapshot in `request`. That snapshot is
/// derived for query convenience; workflow tables remain authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopilotEvent {
    /// Event identifier.
    pub event_id: Uuid,
    /// Owning company.
    pub tenant_id: TenantId,
    /// Acting subject.
    pub actor: String,
    /// Event name.
    pub feature: EventFeature,
    /// Outcome.
    pub status: EventStatus,
    /// Request payload.
    pub request: Value,
    /// Response payload, absent on failures without a body.
    pub response: Option<Value>,
    /// Wall-clock latency of the recorded operation.
    pub latency_ms: u64,
    /// Correlated entity.
    pub entity: Option<EntityReference>,
    /// Occurrence timestamp.
    pub occurred_at: DateTime<Utc>,
}

/// Read-side filter for the event log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventQuery {
    /// Company scope. `None` spans every company.
    pub tenant_id: Option<TenantId>,
    /// Feature filter.
    pub feature: Option<EventFeature>,
    /// Status filter.
    pub status: Option<EventStatus>,
    /// Inclusive lower bound.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound.
    pub to: Option<DateTime<Utc>>,
    /// Page size.
    pub limit: usize,
    /// Page offset.
    pub offset: usize,
}

impl EventQuery {
    /// Returns whether `event` satisfies every filter except paging.
    #[must_use]
    pub fn matches(&self, event: &CopilotEvent) -> bool {
        self.tenant_id.is_none_or(|tenant_id| event.tenant_id == tenant_id)
            && self.feature.is_none_or(|feature| event.feature == feature)
            && self.status.is_none_or(|status| event.status == status)
            && self.from.is_none_or(|from| event.occurred_at >= from)
            && self.to.is_none_or(|to| event.occurred_at < to)
    }
}

/// Count of events for one feature and status pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCount {
    /// Event name.
    pub feature: EventFeature,
    /// Outcome.
    pub status: EventStatus,
    /// Number of matching events.
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use procura_core::TenantId;
    use serde_json::json;
    use uuid::Uuid;

    use super::{CopilotEvent, EventFeature, EventQuery, EventStatus};

    #[test]
    fn query_filters_by_company_feature_and_window() {
        let tenant_id = TenantId::new();
        let now = Utc::now();
        let event = CopilotEvent {
            event_id: Uuid::new_v4(),
            tenant_id,
            actor: "alice".to_owned(),
            feature: EventFeature::ActionPlan,
            status: EventStatus::Success,
            request: json!({}),
            response: None,
            latency_ms: 12,
            entity: None,
            occurred_at: now,
        };

        let query = EventQuery {
            tenant_id: Some(tenant_id),
            feature: Some(EventFeature::ActionPlan),
            from: Some(now - Duration::minutes(1)),
            to: Some(now + Duration::minutes(1)),
            ..EventQuery::default()
        };
        assert!(query.matches(&event));

        let other_company = EventQuery {
            tenant_id: Some(TenantId::new()),
            ..EventQuery::default()
        };
        assert!(!other_company.matches(&event));

        let errors_only = EventQuery {
            status: Some(EventStatus::Error),
            ..EventQuery::default()
        };
        assert!(!errors_only.matches(&event));
    }

    #[test]
    fn features_parse_from_storage_values() {
        for feature in EventFeature::all() {
            assert!(matches!(EventFeature::parse(feature.as_str()), Ok(value) if value == *feature));
        }
    }
}
