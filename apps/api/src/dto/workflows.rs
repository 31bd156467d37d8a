use procura_application::{
    CompleteStepInput, StartWorkflowInput, WorkflowDetail, WorkflowStepOutcome,
};
use procura_core::AppError;
use procura_domain::{Workflow, WorkflowStep, WorkflowType};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use ts_rs::TS;

/// Incoming payload for starting a workflow.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/start-copilot-workflow-request.ts"
)]
pub struct StartCopilotWorkflowRequest {
    pub workflow_type: String,
    #[ts(type = "Record<string, unknown> | null")]
    pub inputs: Option<Value>,
}

impl TryFrom<StartCopilotWorkflowRequest> for StartWorkflowInput {
    type Error = AppError;

    fn try_from(value: StartCopilotWorkflowRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            workflow_type: WorkflowType::parse(&value.workflow_type)?,
            inputs: value.inputs.unwrap_or_else(|| json!({})),
        })
    }
}

/// Incoming reviewer decision on the pending step.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/complete-copilot-workflow-step-request.ts"
)]
pub struct CompleteCopilotWorkflowStepRequest {
    pub step_index: u32,
    pub approval: bool,
    #[ts(type = "Record<string, unknown> | null")]
    pub output: Option<Value>,
}

impl From<CompleteCopilotWorkflowStepRequest> for CompleteStepInput {
    fn from(value: CompleteCopilotWorkflowStepRequest) -> Self {
        Self {
            step_index: value.step_index,
            approval: value.approval,
            output: value.output.unwrap_or_else(|| json!({})),
        }
    }
}

/// API representation of a workflow header.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/workflow-response.ts"
)]
pub struct WorkflowResponse {
    pub workflow_id: String,
    pub workflow_type: String,
    pub status: String,
    pub current_step: u32,
    pub step_count: usize,
    #[ts(type = "Record<string, unknown>")]
    pub inputs: Value,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Workflow> for WorkflowResponse {
    fn from(value: Workflow) -> Self {
        Self {
            workflow_id: value.workflow_id().as_str().to_owned(),
            workflow_type: value.workflow_type().as_str().to_owned(),
            status: value.status().as_str().to_owned(),
            current_step: value.current_step(),
            step_count: value.steps().len(),
            inputs: value.inputs().clone(),
            created_by: value.created_by().to_owned(),
            created_at: value.created_at().to_rfc3339(),
            updated_at: value.updated_at().to_rfc3339(),
        }
    }
}

/// API representation of one workflow step.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/workflow-step-response.ts"
)]
pub struct WorkflowStepResponse {
    pub step_index: u32,
    pub action_type: String,
    pub name: Option<String>,
    #[ts(type = "Record<string, unknown>")]
    pub required_inputs: Value,
    #[ts(type = "Record<string, unknown> | null")]
    pub draft_output: Option<Value>,
    pub approval_state: String,
    pub decided_by: Option<String>,
    pub decided_at: Option<String>,
    #[ts(type = "Record<string, unknown> | null")]
    pub decided_output: Option<Value>,
    pub updated_at: String,
}

impl From<WorkflowStep> for WorkflowStepResponse {
    fn from(value: WorkflowStep) -> Self {
        let decision = value.decision();

        Self {
            step_index: value.step_index(),
            action_type: value.action_type().as_str().to_owned(),
            name: value.name().map(str::to_owned),
            required_inputs: value.required_inputs().clone(),
            draft_output: value.draft_output().cloned(),
            approval_state: value.approval_state().as_str().to_owned(),
            decided_by: decision.map(|decision| decision.decided_by.clone()),
            decided_at: decision.map(|decision| decision.decided_at.to_rfc3339()),
            decided_output: decision.map(|decision| decision.output.clone()),
            updated_at: value.updated_at().to_rfc3339(),
        }
    }
}

/// Workflow with its steps ordered by index.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/workflow-detail-response.ts"
)]
pub struct WorkflowDetailResponse {
    pub workflow: WorkflowResponse,
    pub steps: Vec<WorkflowStepResponse>,
}

impl From<WorkflowDetail> for WorkflowDetailResponse {
    fn from(value: WorkflowDetail) -> Self {
        Self {
            workflow: WorkflowResponse::from(value.workflow),
            steps: value
                .steps
                .into_iter()
                .map(WorkflowStepResponse::from)
                .collect(),
        }
    }
}

/// Workflow and the step a next or complete call touched.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/workflow-step-outcome-response.ts"
)]
pub struct WorkflowStepOutcomeResponse {
    pub workflow: WorkflowResponse,
    pub step: WorkflowStepResponse,
}

impl From<WorkflowStepOutcome> for WorkflowStepOutcomeResponse {
    fn from(value: WorkflowStepOutcome) -> Self {
        Self {
            workflow: WorkflowResponse::from(value.workflow),
            step: WorkflowStepResponse::from(value.step),
        }
    }
}
