//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod action;
mod chat;
mod entitlement;
mod entity;
mod event;
mod feedback;
mod security;
mod workflow;

pub use action::{
    ActionDraft, ActionDraftId, ActionDraftStatus, ActionInput, ActionOutput, ActionType,
    Citation, DraftDecision, NewActionDraft,
};
pub use chat::{
    CHAT_MESSAGE_MAX_LENGTH, CallToAction, ChatMessage, ChatRole, ChatThread, GuidedResolution,
    ToolCall, ToolResult, ToolResultStatus, WorkspaceTool,
};
pub use entitlement::{
    EntitlementResolution, EntitlementSource, FeatureKey, flag_value_enabled, resolve_entitlement,
};
pub use entity::{EntityKind, EntityReference};
pub use event::{CopilotEvent, EventCount, EventFeature, EventQuery, EventStatus};
pub use feedback::{
    ActionFeedback, FEEDBACK_COMMENT_MAX_LENGTH, FEEDBACK_RATING_MAX, FEEDBACK_RATING_MIN,
    FeedbackRating,
};
pub use security::{AuditAction, CompanyRole, Permission};
pub use workflow::{
    NewWorkflow, StepApprovalState, StepDecision, Workflow, WorkflowId, WorkflowStatus,
    WorkflowStep, WorkflowStepPlan, WorkflowType,
};
