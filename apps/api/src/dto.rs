mod actions;
mod chat;
mod common;
mod events;
mod workflows;

pub use actions::{
    ActionDraftResponse, ActionFeedbackResponse, ApproveActionResponse, CitationResponse,
    PlanCopilotActionRequest, RejectActionRequest, SubmitActionFeedbackRequest,
};
pub use chat::{
    ChatExchangeResponse, ChatMessageResponse, ChatThreadResponse, CreateChatThreadRequest,
    SendChatMessageRequest, ToolCallResponse, ToolResultResponse,
};
pub use common::{EntityReferenceResponse, HealthResponse};
pub use events::{CopilotEventResponse, EventCountResponse, EventListQueryRequest};
pub use workflows::{
    CompleteCopilotWorkflowStepRequest, StartCopilotWorkflowRequest, WorkflowDetailResponse,
    WorkflowResponse, WorkflowStepOutcomeResponse, WorkflowStepResponse,
};
