//! Application services and ports.

#![forbid(unsafe_code)]

mod action_draft_service;
mod chat_service;
mod conversion_registry;
mod copilot_context;
mod copilot_facade;
mod copilot_ports;
mod entitlement_service;
mod event_recorder;
mod permission_gate;
mod rate_limit_service;
mod security_ports;
mod tool_resolver;
mod workflow_orchestration_service;

#[cfg(test)]
mod test_fakes;

pub use action_draft_service::{ActionDraftService, ApprovedDraft, PlanActionInput};
pub use chat_service::{CHAT_HISTORY_WINDOW, ChatExchange, ChatService, MAX_TOOL_ROUNDS};
pub use conversion_registry::{
    ActionConverter, ConversionContext, ConversionOutcome, ConversionRegistry, PreparedConversion,
    PreparedEntity, default_converters,
};
pub use copilot_context::CopilotServiceContext;
pub use copilot_facade::{CopilotFacade, CopilotPorts, CopilotSettings};
pub use copilot_ports::{
    ActionDraftListQuery, ActionDraftRepository, ChatReply, ChatRepository, ChatRequest,
    CompleteWorkflowStepRequest, CompletedWorkflowStep, CopilotEventRepository,
    CopilotServiceClient, CopilotWorkflowRepository, DecisionLease, DecisionLeaseCoordinator,
    DraftDecisionWrite, DraftedWorkflowStep, EntityStore, NewEntityRecord, PlanActionRequest,
    PlanWorkflowRequest, PlannedAction, PlannedWorkflow, WorkflowListQuery, WorkspaceSearch,
    WorkspaceToolProvider,
};
pub use entitlement_service::{EntitlementDefaults, EntitlementService};
pub use event_recorder::{EVENT_PAGE_MAX, EventQueryService, EventRecord, EventRecorder};
pub use permission_gate::PermissionGate;
pub use rate_limit_service::{
    AttemptInfo, CopilotRateLimits, RateLimitRepository, RateLimitRule, RateLimitService,
};
pub use security_ports::{
    AuditEvent, AuditRepository, AuthorizationRepository, EntitlementRepository,
};
pub use tool_resolver::{TOOL_RESULT_LIMIT_DEFAULT, ToolBatchOutcome, ToolResolver};
pub use workflow_orchestration_service::{
    CompleteStepInput, StartWorkflowInput, WorkflowDetail, WorkflowOrchestrationService,
    WorkflowStepOutcome,
};
