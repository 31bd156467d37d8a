use procura_application::ChatRequest;
use procura_domain::{
    ActionInput, ActionType, ChatRole, Citation, StepApprovalState, ToolCall, ToolResult,
    WorkflowStatus, WorkflowStepPlan, WorkflowType,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub(super) struct ActionPlanBody<'a> {
    pub(super) action_type: ActionType,
    pub(super) input: &'a ActionInput,
    pub(super) company_context: &'a Value,
}

#[derive(Debug, Deserialize)]
pub(super) struct PlannedActionBody {
    pub(super) action_type: ActionType,
    pub(super) summary: String,
    #[serde(default)]
    pub(super) payload: Value,
    #[serde(default)]
    pub(super) citations: Vec<Citation>,
    #[serde(default)]
    pub(super) warnings: Vec<String>,
    #[serde(default)]
    pub(super) confidence: Option<f64>,
    #[serde(default = "review_by_default")]
    pub(super) needs_human_review: bool,
}

fn review_by_default() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub(super) struct WorkflowPlanBody<'a> {
    pub(super) workflow_type: WorkflowType,
    pub(super) inputs: &'a Value,
    pub(super) company_context: &'a Value,
}

#[derive(Debug, Deserialize)]
pub(super) struct PlannedWorkflowBody {
    pub(super) workflow_id: String,
    pub(super) status: WorkflowStatus,
    #[serde(default)]
    pub(super) steps: Vec<WorkflowStepPlan>,
}

#[derive(Debug, Deserialize)]
pub(super) struct NextStepBody {
    pub(super) step_index: u32,
    pub(super) action_type: ActionType,
    #[serde(default = "pending_by_default")]
    pub(super) approval_state: StepApprovalState,
    #[serde(default)]
    pub(super) required_inputs: Value,
    #[serde(default)]
    pub(super) draft_output: Value,
}

fn pending_by_default() -> StepApprovalState {
    StepApprovalState::Pending
}

#[derive(Debug, Serialize)]
pub(super) struct CompleteStepBody<'a> {
    pub(super) step_index: u32,
    pub(super) approval: bool,
    pub(super) output: &'a Value,
}

#[derive(Debug, Deserialize)]
pub(super) struct CompletedStepBody {
    pub(super) workflow_status: WorkflowStatus,
    #[serde(default)]
    pub(super) next_step: Option<u32>,
}

#[derive(Debug, Serialize)]
pub(super) struct ChatMessageBody<'a> {
    role: ChatRole,
    content: &'a str,
    #[serde(skip_serializing_if = "no_tool_calls")]
    tool_calls: &'a [ToolCall],
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_result: Option<&'a ToolResult>,
}

fn no_tool_calls(calls: &&[ToolCall]) -> bool {
    calls.is_empty()
}

#[derive(Debug, Serialize)]
pub(super) struct ChatBody<'a> {
    thread_id: Uuid,
    messages: Vec<ChatMessageBody<'a>>,
    tool_results: &'a [ToolResult],
    company_context: &'a Value,
}

impl<'a> ChatBody<'a> {
    pub(super) fn from_request(request: &'a ChatRequest) -> Self {
        Self {
            thread_id: request.thread_id,
            messages: request
                .messages
                .iter()
                .map(|message| ChatMessageBody {
                    role: message.role,
                    content: message.content.as_str(),
                    tool_calls: message.tool_calls.as_slice(),
                    tool_result: message.tool_result.as_ref(),
                })
                .collect(),
            tool_results: request.tool_results.as_slice(),
            company_context: &request.company_context,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ChatReplyBody {
    #[serde(default)]
    pub(super) content: String,
    #[serde(default)]
    pub(super) tool_calls: Vec<ToolCall>,
}
