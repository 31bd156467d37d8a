use async_trait::async_trait;
use procura_core::AppResult;
use procura_domain::{
    ActionInput, ActionOutput, ActionType, ChatMessage, StepApprovalState, ToolCall, ToolResult,
    WorkflowStatus, WorkflowStepPlan, WorkflowType,
};
use serde_json::Value;
use uuid::Uuid;

/// Request sent to the AI service to plan one action.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanActionRequest {
    /// Requested action type.
    pub action_type: ActionType,
    /// Planning input.
    pub input: ActionInput,
    /// Company and actor snapshot.
    pub company_context: Value,
}

/// Proposal returned by the AI service.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedAction {
    /// Action type the service planned.
    pub action_type: ActionType,
    /// Proposal body.
    pub output: ActionOutput,
}

/// Request sent to the AI service to plan a workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanWorkflowRequest {
    /// Requested workflow kind.
    pub workflow_type: WorkflowType,
    /// Start inputs.
    pub inputs: Value,
    /// Company and actor snapshot.
    pub company_context: Value,
}

/// Initial workflow plan returned by the AI service.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedWorkflow {
    /// Service-issued identifier.
    pub workflow_id: String,
    /// Reported status.
    pub status: WorkflowStatus,
    /// Ordered step plan.
    pub steps: Vec<WorkflowStepPlan>,
}

/// Step draft returned by the AI service.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftedWorkflowStep {
    /// Index the service drafted.
    pub step_index: u32,
    /// Action the step proposes.
    pub action_type: ActionType,
    /// Approval state the service reports.
    pub approval_state: StepApprovalState,
    /// Inputs the reviewer must provide.
    pub required_inputs: Value,
    /// Drafted payload.
    pub draft_output: Value,
}

/// Step decision forwarded to the AI service.
#[derive(Debug, Clone, PartialEq)]
pub struct CompleteWorkflowStepRequest {
    /// Service-issued identifier.
    pub workflow_id: String,
    /// Decided step.
    pub step_index: u32,
    /// Whether the reviewer approved.
    pub approval: bool,
    /// Reviewer-confirmed output.
    pub output: Value,
}

/// Workflow progress after a step decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletedWorkflowStep {
    /// Overall status reported by the service.
    pub workflow_status: WorkflowStatus,
    /// Next step to work on, when the service names one.
    pub next_step: Option<u32>,
}

/// Chat completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Conversation thread.
    pub thread_id: Uuid,
    /// Prior trail including the newest user message.
    pub messages: Vec<ChatMessage>,
    /// Results for the tool calls of the previous round.
    pub tool_results: Vec<ToolResult>,
    /// Company and actor snapshot.
    pub company_context: Value,
}

/// Chat completion reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    /// Assistant text.
    pub content: String,
    /// Tool calls to resolve before the next round.
    pub tool_calls: Vec<ToolCall>,
}

/// Port for the remote AI inference service.
///
/// Implementations enforce a bounded timeout and return
/// `AppError::ServiceUnavailable` when disabled, unreachable or timed out.
#[async_trait]
pub trait CopilotServiceClient: Send + Sync {
    /// Plans one action.
    async fn plan_action(&self, request: PlanActionRequest) -> AppResult<PlannedAction>;

    /// Plans a workflow.
    async fn plan_workflow(&self, request: PlanWorkflowRequest) -> AppResult<PlannedWorkflow>;

    /// Drafts the step the workflow currently waits on.
    async fn next_workflow_step(&self, workflow_id: &str) -> AppResult<DraftedWorkflowStep>;

    /// Reports a step decision and returns workflow progress.
    async fn complete_workflow_step(
        &self,
        request: CompleteWorkflowStepRequest,
    ) -> AppResult<CompletedWorkflowStep>;

    /// Produces the next chat reply.
    async fn chat(&self, request: ChatRequest) -> AppResult<ChatReply>;
}
