use procura_application::{ApprovedDraft, PlanActionInput};
use procura_core::AppError;
use procura_domain::{ActionDraft, ActionFeedback, ActionType, Citation, DraftDecision};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use ts_rs::TS;

use super::common::EntityReferenceResponse;

/// Incoming payload for planning one action.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/plan-copilot-action-request.ts"
)]
pub struct PlanCopilotActionRequest {
    pub action_type: String,
    pub query: Option<String>,
    #[ts(type = "Record<string, unknown> | null")]
    pub inputs: Option<Value>,
    #[ts(type = "Record<string, unknown> | null")]
    pub filters: Option<Value>,
}

impl TryFrom<PlanCopilotActionRequest> for PlanActionInput {
    type Error = AppError;

    fn try_from(value: PlanCopilotActionRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            action_type: value.action_type.parse::<ActionType>()?,
            query: value.query,
            inputs: value.inputs.unwrap_or_else(|| json!({})),
            filters: value.filters.unwrap_or_else(|| json!({})),
        })
    }
}

/// Incoming payload for rejecting a draft.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/reject-action-request.ts"
)]
pub struct RejectActionRequest {
    pub reason: String,
}

/// Incoming payload for rating a draft.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/submit-action-feedback-request.ts"
)]
pub struct SubmitActionFeedbackRequest {
    pub rating: i32,
    pub comment: Option<String>,
}

/// Source the AI service cited for a draft.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/citation-response.ts"
)]
pub struct CitationResponse {
    pub doc_id: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub snippet: Option<String>,
}

impl From<&Citation> for CitationResponse {
    fn from(value: &Citation) -> Self {
        Self {
            doc_id: value.doc_id.clone(),
            title: value.title.clone(),
            url: value.url.clone(),
            snippet: value.snippet.clone(),
        }
    }
}

/// API representation of an action draft.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/action-draft-response.ts"
)]
pub struct ActionDraftResponse {
    pub draft_id: String,
    pub action_type: String,
    pub status: String,
    pub query: Option<String>,
    #[ts(type = "Record<string, unknown>")]
    pub inputs: Value,
    #[ts(type = "Record<string, unknown>")]
    pub filters: Value,
    pub summary: String,
    #[ts(type = "Record<string, unknown>")]
    pub payload: Value,
    pub citations: Vec<CitationResponse>,
    pub warnings: Vec<String>,
    pub confidence: Option<f64>,
    pub needs_human_review: bool,
    pub entity: Option<EntityReferenceResponse>,
    pub decided_by: Option<String>,
    pub decided_at: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_by: String,
    pub created_at: String,
}

impl From<ActionDraft> for ActionDraftResponse {
    fn from(value: ActionDraft) -> Self {
        let (decided_by, decided_at, rejection_reason) = match value.decision() {
            DraftDecision::Drafted => (None, None, None),
            DraftDecision::Approved {
                approved_by,
                approved_at,
                ..
            } => (Some(approved_by.clone()), Some(approved_at.to_rfc3339()), None),
            DraftDecision::Rejected {
                rejected_by,
                rejected_at,
                reason,
            } => (
                Some(rejected_by.clone()),
                Some(rejected_at.to_rfc3339()),
                Some(reason.as_str().to_owned()),
            ),
        };
        let input = value.input();
        let output = value.output();

        Self {
            draft_id: value.draft_id().to_string(),
            action_type: value.action_type().as_str().to_owned(),
            status: value.status().as_str().to_owned(),
            query: input.query.clone(),
            inputs: input.inputs.clone(),
            filters: input.filters.clone(),
            summary: output.summary.clone(),
            payload: output.payload.clone(),
            citations: output.citations.iter().map(CitationResponse::from).collect(),
            warnings: output.warnings.clone(),
            confidence: output.confidence,
            needs_human_review: output.needs_human_review,
            entity: value.entity().map(EntityReferenceResponse::from),
            decided_by,
            decided_at,
            rejection_reason,
            created_by: value.created_by().to_owned(),
            created_at: value.created_at().to_rfc3339(),
        }
    }
}

/// Approved draft with every entity its conversion created.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/approve-action-response.ts"
)]
pub struct ApproveActionResponse {
    pub draft: ActionDraftResponse,
    pub entities: Vec<EntityReferenceResponse>,
}

impl From<ApprovedDraft> for ApproveActionResponse {
    fn from(value: ApprovedDraft) -> Self {
        Self {
            entities: value
                .outcome
                .entities()
                .iter()
                .map(EntityReferenceResponse::from)
                .collect(),
            draft: ActionDraftResponse::from(value.draft),
        }
    }
}

/// API representation of one feedback entry.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/action-feedback-response.ts"
)]
pub struct ActionFeedbackResponse {
    pub feedback_id: String,
    pub draft_id: String,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_by: String,
    pub created_at: String,
}

impl From<ActionFeedback> for ActionFeedbackResponse {
    fn from(value: ActionFeedback) -> Self {
        Self {
            feedback_id: value.feedback_id().to_string(),
            draft_id: value.draft_id().to_string(),
            rating: value.rating().value(),
            comment: value.comment().map(str::to_owned),
            created_by: value.created_by().to_owned(),
            created_at: value.created_at().to_rfc3339(),
        }
    }
}
