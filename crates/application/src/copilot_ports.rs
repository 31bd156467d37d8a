mod ai_service;
mod chat;
mod drafts;
mod entities;
mod events;
mod lease;
mod workflows;

pub use ai_service::{
    ChatReply, ChatRequest, CompleteWorkflowStepRequest, CompletedWorkflowStep,
    CopilotServiceClient, DraftedWorkflowStep, PlanActionRequest, PlanWorkflowRequest,
    PlannedAction, PlannedWorkflow,
};
pub use chat::ChatRepository;
pub use drafts::{ActionDraftListQuery, ActionDraftRepository, DraftDecisionWrite};
pub use entities::{EntityStore, NewEntityRecord, WorkspaceSearch, WorkspaceToolProvider};
pub use events::CopilotEventRepository;
pub use lease::{DecisionLease, DecisionLeaseCoordinator};
pub use workflows::{CopilotWorkflowRepository, WorkflowListQuery};
