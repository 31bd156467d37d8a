use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use procura_application::{
    AttemptInfo, AuditEvent, AuditRepository, AuthorizationRepository, ChatReply, ChatRequest,
    CompleteWorkflowStepRequest, CompletedWorkflowStep, CopilotFacade, CopilotPorts,
    CopilotRateLimits, CopilotServiceClient, CopilotSettings, DraftedWorkflowStep,
    EntitlementDefaults, EntitlementRepository, PlanActionRequest, PlanWorkflowRequest,
    PlannedAction, PlannedWorkflow, RateLimitRepository,
};
use procura_core::{ActorContext, AppError, AppResult, TenantId};
use procura_domain::{ActionOutput, FeatureKey, Permission};
use procura_infrastructure::{InMemoryCopilotRepository, InMemoryDecisionLeaseCoordinator};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use super::actions::{
    ActionDraftListQueryRequest, approve_draft_handler, get_draft_handler, list_drafts_handler,
    plan_action_handler, reject_draft_handler,
};
use super::chat::{create_thread_handler, list_messages_handler, send_message_handler};
use super::events::summarize_events_handler;
use super::workflows::get_workflow_handler;
use crate::dto::{
    CreateChatThreadRequest, EventListQueryRequest, PlanCopilotActionRequest, RejectActionRequest,
    SendChatMessageRequest,
};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Default)]
struct RecordingAudit {
    events: Mutex<Vec<AuditEvent>>,
}

#[async_trait]
impl AuditRepository for RecordingAudit {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        self.events.lock().await.push(event);
        Ok(())
    }
}

struct PersonaOnlyAuthorization;

#[async_trait]
impl AuthorizationRepository for PersonaOnlyAuthorization {
    async fn list_permissions_for_subject(
        &self,
        _tenant_id: TenantId,
        _subject: &str,
    ) -> AppResult<Vec<Permission>> {
        Ok(Vec::new())
    }
}

struct NoOverrides;

#[async_trait]
impl EntitlementRepository for NoOverrides {
    async fn find_feature_override(
        &self,
        _tenant_id: TenantId,
        _feature: FeatureKey,
    ) -> AppResult<Option<Value>> {
        Ok(None)
    }

    async fn find_plan_feature(
        &self,
        _tenant_id: TenantId,
        _feature: FeatureKey,
    ) -> AppResult<Option<Value>> {
        Ok(None)
    }
}

struct UnlimitedRateLimits;

#[async_trait]
impl RateLimitRepository for UnlimitedRateLimits {
    async fn record_attempt(
        &self,
        _key: &str,
        _window_duration_seconds: i64,
    ) -> AppResult<AttemptInfo> {
        Ok(AttemptInfo {
            attempt_count: 1,
            window_started_at: Utc::now(),
        })
    }

    async fn cleanup_expired(&self, _before: DateTime<Utc>) -> AppResult<u64> {
        Ok(0)
    }
}

struct ScriptedCopilotService;

fn unavailable<T>() -> AppResult<T> {
    Err(AppError::ServiceUnavailable("not scripted".to_owned()).with_code("ai_service_disabled"))
}

#[async_trait]
impl CopilotServiceClient for ScriptedCopilotService {
    async fn plan_action(&self, request: PlanActionRequest) -> AppResult<PlannedAction> {
        Ok(PlannedAction {
            action_type: request.action_type,
            output: ActionOutput {
                summary: "RFQ for 200 bearings".to_owned(),
                payload: json!({
                    "title": "Bearings Q4",
                    "currency": "EUR",
                    "items": [{"description": "6204 bearing", "quantity": 200.0}],
                }),
                citations: Vec::new(),
                warnings: Vec::new(),
                confidence: Some(0.8),
                needs_human_review: true,
            },
        })
    }

    async fn plan_workflow(&self, _request: PlanWorkflowRequest) -> AppResult<PlannedWorkflow> {
        unavailable()
    }

    async fn next_workflow_step(&self, _workflow_id: &str) -> AppResult<DraftedWorkflowStep> {
        unavailable()
    }

    async fn complete_workflow_step(
        &self,
        _request: CompleteWorkflowStepRequest,
    ) -> AppResult<CompletedWorkflowStep> {
        unavailable()
    }

    async fn chat(&self, _request: ChatRequest) -> AppResult<ChatReply> {
        Ok(ChatReply {
            content: "Two RFQs are open.".to_owned(),
            tool_calls: Vec::new(),
        })
    }
}

fn app_state() -> AppState {
    let store = Arc::new(InMemoryCopilotRepository::new());
    let ports = CopilotPorts {
        audit: Arc::new(RecordingAudit::default()),
        authorization: Arc::new(PersonaOnlyAuthorization),
        entitlements: Arc::new(NoOverrides),
        rate_limits: Arc::new(UnlimitedRateLimits),
        drafts: store.clone(),
        workflows: store.clone(),
        events: store.clone(),
        chats: store.clone(),
        entity_store: store.clone(),
        workspace_tools: store,
        leases: Arc::new(InMemoryDecisionLeaseCoordinator::new()),
        ai_client: Arc::new(ScriptedCopilotService),
    };
    let settings = CopilotSettings {
        entitlement_defaults: EntitlementDefaults {
            ai_actions_enabled: true,
            ai_workflows_enabled: true,
            ai_chat_enabled: true,
        },
        rate_limits: CopilotRateLimits::per_minute(30),
        lease_seconds: 30,
        tool_timeout: Duration::from_millis(200),
    };

    AppState {
        copilot: CopilotFacade::new(ports, settings).unwrap_or_else(|_| unreachable!()),
        frontend_url: "http://localhost:3000".to_owned(),
    }
}

fn buyer(tenant_id: TenantId) -> ActorContext {
    ActorContext::new("buyer-1", "Buyer One", None, Some(tenant_id)).with_persona("buyer_admin")
}

fn status_and_code(error: &ApiError) -> (StatusCode, &'static str) {
    (error.status(), error.0.code())
}

async fn plan_rfq(state: &AppState, actor: &ActorContext) -> String {
    let (status, Json(draft)) = plan_action_handler(
        State(state.clone()),
        Extension(actor.clone()),
        Json(PlanCopilotActionRequest {
            action_type: "rfq_draft".to_owned(),
            query: Some("bearings for line 3".to_owned()),
            inputs: None,
            filters: None,
        }),
    )
    .await
    .unwrap_or_else(|_| unreachable!());

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(draft.status, "drafted");
    draft.draft_id
}

#[tokio::test]
async fn planned_draft_is_approved_once_and_listed() {
    let state = app_state();
    let actor = buyer(TenantId::new());
    let draft_id = plan_rfq(&state, &actor).await;

    let Json(approved) = approve_draft_handler(
        State(state.clone()),
        Extension(actor.clone()),
        Path(draft_id.clone()),
    )
    .await
    .unwrap_or_else(|_| unreachable!());
    assert_eq!(approved.draft.status, "approved");
    assert_eq!(approved.draft.decided_by.as_deref(), Some("buyer-1"));
    assert!(!approved.entities.is_empty());
    assert_eq!(
        approved.draft.entity.as_ref().map(|entity| entity.entity_kind.as_str()),
        Some(approved.entities[0].entity_kind.as_str())
    );

    let again = approve_draft_handler(
        State(state.clone()),
        Extension(actor.clone()),
        Path(draft_id.clone()),
    )
    .await;
    assert_eq!(
        again.err().as_ref().map(status_and_code),
        Some((StatusCode::CONFLICT, "draft_already_decided"))
    );

    let Json(listed) = list_drafts_handler(
        State(state),
        Extension(actor),
        Query(ActionDraftListQueryRequest {
            status: Some("approved".to_owned()),
            action_type: None,
            limit: None,
            offset: None,
        }),
    )
    .await
    .unwrap_or_else(|_| unreachable!());
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].draft_id, draft_id);
}

#[tokio::test]
async fn rejection_requires_a_reason_and_records_it() {
    let state = app_state();
    let actor = buyer(TenantId::new());
    let draft_id = plan_rfq(&state, &actor).await;

    let blank = reject_draft_handler(
        State(state.clone()),
        Extension(actor.clone()),
        Path(draft_id.clone()),
        Json(RejectActionRequest {
            reason: "   ".to_owned(),
        }),
    )
    .await;
    assert_eq!(
        blank.err().map(|error| error.status()),
        Some(StatusCode::UNPROCESSABLE_ENTITY)
    );

    let Json(rejected) = reject_draft_handler(
        State(state),
        Extension(actor),
        Path(draft_id),
        Json(RejectActionRequest {
            reason: "wrong supplier list".to_owned(),
        }),
    )
    .await
    .unwrap_or_else(|_| unreachable!());
    assert_eq!(rejected.status, "rejected");
    assert_eq!(rejected.rejection_reason.as_deref(), Some("wrong supplier list"));
}

#[tokio::test]
async fn drafts_are_hidden_across_companies_and_ids_are_validated() {
    let state = app_state();
    let owner = buyer(TenantId::new());
    let draft_id = plan_rfq(&state, &owner).await;
    let outsider = buyer(TenantId::new());

    let hidden = get_draft_handler(
        State(state.clone()),
        Extension(outsider),
        Path(draft_id),
    )
    .await;
    assert_eq!(hidden.err().map(|error| error.status()), Some(StatusCode::NOT_FOUND));

    let malformed = get_draft_handler(
        State(state.clone()),
        Extension(owner),
        Path("not-a-uuid".to_owned()),
    )
    .await;
    assert_eq!(
        malformed.err().map(|error| error.status()),
        Some(StatusCode::UNPROCESSABLE_ENTITY)
    );

    let missing = get_workflow_handler(
        State(state),
        Extension(buyer(TenantId::new())),
        Path("wf-unknown".to_owned()),
    )
    .await;
    assert_eq!(missing.err().map(|error| error.status()), Some(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn actor_without_company_is_forbidden() {
    let state = app_state();
    let actor = ActorContext::new("drifter", "Drifter", None, None).with_persona("buyer_admin");

    let result = create_thread_handler(
        State(state),
        Extension(actor),
        Json(CreateChatThreadRequest::default()),
    )
    .await;

    assert_eq!(
        result.err().as_ref().map(status_and_code),
        Some((StatusCode::FORBIDDEN, "company_context_missing"))
    );
}

#[tokio::test]
async fn chat_message_round_trip_returns_the_exchange() {
    let state = app_state();
    let actor = buyer(TenantId::new());

    let (status, Json(thread)) = create_thread_handler(
        State(state.clone()),
        Extension(actor.clone()),
        Json(CreateChatThreadRequest {
            title: Some("Sourcing".to_owned()),
        }),
    )
    .await
    .unwrap_or_else(|_| unreachable!());
    assert_eq!(status, StatusCode::CREATED);

    let Json(exchange) = send_message_handler(
        State(state.clone()),
        Extension(actor.clone()),
        Path(thread.thread_id.clone()),
        Json(SendChatMessageRequest {
            content: "what is open?".to_owned(),
        }),
    )
    .await
    .unwrap_or_else(|_| unreachable!());
    let roles: Vec<&str> = exchange.messages.iter().map(|message| message.role.as_str()).collect();
    assert_eq!(roles, vec!["user", "assistant"]);
    assert_eq!(exchange.tool_rounds, 0);

    let Json(messages) = list_messages_handler(
        State(state),
        Extension(actor),
        Path(thread.thread_id),
        Query(super::chat::ChatMessageListQueryRequest { limit: None }),
    )
    .await
    .unwrap_or_else(|_| unreachable!());
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content, "Two RFQs are open.");
}

#[tokio::test]
async fn event_summary_counts_planning_calls() {
    let state = app_state();
    let actor = buyer(TenantId::new());
    plan_rfq(&state, &actor).await;
    plan_rfq(&state, &actor).await;

    let Json(counts) = summarize_events_handler(
        State(state),
        Extension(actor),
        Query(EventListQueryRequest::default()),
    )
    .await
    .unwrap_or_else(|_| unreachable!());

    let planned = counts
        .iter()
        .find(|count| count.feature == "action_plan" && count.status == "success")
        .map(|count| count.count);
    assert_eq!(planned, Some(2));
}
