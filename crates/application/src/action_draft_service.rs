use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use procura_core::{ActorContext, AppError, AppResult};
use procura_domain::{
    ActionDraft, ActionDraftId, ActionFeedback, ActionInput, ActionType, EntityKind,
    EntityReference, EventFeature, FeatureKey, NewActionDraft,
};
use serde_json::{Value, json};
use tracing::info;

use crate::copilot_context::{company_context, invalid_service_response};
use crate::{
    ActionDraftListQuery, ActionDraftRepository, ConversionOutcome, ConversionRegistry,
    CopilotServiceContext, DraftDecisionWrite, EventRecord, PlanActionRequest, RateLimitRule,
};

mod decisions;
mod feedback;
mod plan;
mod reads;

/// Input for planning one action.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanActionInput {
    /// Requested action type.
    pub action_type: ActionType,
    /// Free-text request.
    pub query: Option<String>,
    /// Structured inputs.
    pub inputs: Value,
    /// Workspace filters.
    pub filters: Value,
}

/// Approved draft with every entity its conversion produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovedDraft {
    /// Draft in the approved state.
    pub draft: ActionDraft,
    /// Conversion result, primary entity first.
    pub outcome: ConversionOutcome,
}

/// Draft lifecycle: plan, approve with conversion, reject, feedback and reads.
#[derive(Clone)]
pub struct ActionDraftService {
    context: CopilotServiceContext,
    repository: Arc<dyn ActionDraftRepository>,
    conversions: ConversionRegistry,
    rate_limit_rule: RateLimitRule,
}

impl ActionDraftService {
    /// Creates the draft service.
    #[must_use]
    pub fn new(
        context: CopilotServiceContext,
        repository: Arc<dyn ActionDraftRepository>,
        conversions: ConversionRegistry,
        rate_limit_rule: RateLimitRule,
    ) -> Self {
        Self {
            context,
            repository,
            conversions,
            rate_limit_rule,
        }
    }

    async fn load_draft(&self, actor: &ActorContext, draft_id: ActionDraftId) -> AppResult<ActionDraft> {
        let tenant_id = actor.require_company()?;
        self.repository
            .find_draft(tenant_id, draft_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("action draft '{draft_id}' does not exist")))
    }
}

fn draft_reference(draft_id: ActionDraftId) -> AppResult<EntityReference> {
    EntityReference::new(EntityKind::ActionDraft, draft_id.to_string())
}
