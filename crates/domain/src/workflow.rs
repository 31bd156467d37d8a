use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use procura_core::{AppError, AppResult, NonEmptyString, TenantId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::action::ActionType;

/// Workflow identifier issued by the AI service and stored verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowId(String);

impl WorkflowId {
    /// Longest accepted identifier.
    pub const MAX_LENGTH: usize = 128;

    /// Creates a validated identifier.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.len() > Self::MAX_LENGTH {
            return Err(AppError::Validation(format!(
                "workflow id must be 1..={} characters",
                Self::MAX_LENGTH
            )));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the identifier value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for WorkflowId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Kind of multi-step plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowType {
    /// RFQ through purchase order negotiation.
    Procurement,
    /// Receipt inspection and non-conformance handling.
    ReceivingQuality,
    /// Invoice matching through payment.
    InvoicePayment,
}

impl WorkflowType {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Procurement => "procurement",
            Self::ReceivingQuality => "receiving_quality",
            Self::InvoicePayment => "invoice_payment",
        }
    }

    /// Parses storage value.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "procurement" => Ok(Self::Procurement),
            "receiving_quality" => Ok(Self::ReceivingQuality),
            "invoice_payment" => Ok(Self::InvoicePayment),
            _ => Err(AppError::Validation(format!(
                "unknown workflow type '{value}'"
            ))),
        }
    }

    /// Returns whether starting this workflow requires finance rights.
    #[must_use]
    pub fn is_financial(&self) -> bool {
        matches!(self, Self::InvoicePayment)
    }
}

/// Overall workflow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Planned, no step drafted yet.
    Pending,
    /// At least one step drafted.
    InProgress,
    /// Every step approved.
    Completed,
    /// Stopped by an unrecoverable service error or a rejected step.
    Failed,
    /// Cancelled by a user.
    Cancelled,
}

impl WorkflowStatus {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses storage value. `active` and `running` are accepted as service aliases.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "pending" => Ok(Self::Pending),
            "in_progress" | "active" | "running" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(AppError::Validation(format!(
                "unknown workflow status '{value}'"
            ))),
        }
    }

    /// Returns whether no further transitions are allowed.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Approval state of one workflow step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepApprovalState {
    /// Awaiting a decision.
    Pending,
    /// Approved.
    Approved,
    /// Rejected.
    Rejected,
}

impl StepApprovalState {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parses storage value.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(AppError::Validation(format!(
                "unknown step approval state '{value}'"
            ))),
        }
    }
}

/// Denormalized summary of one planned step stored on the workflow row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStepPlan {
    /// Zero-based position.
    pub step_index: u32,
    /// Action the step will propose.
    pub action_type: ActionType,
    /// Display name.
    pub name: Option<String>,
}

/// Values required to persist a freshly planned workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct NewWorkflow {
    /// Service-issued identifier.
    pub workflow_id: WorkflowId,
    /// Owning company.
    pub tenant_id: TenantId,
    /// Starting subject.
    pub created_by: String,
    /// Workflow kind.
    pub workflow_type: WorkflowType,
    /// Status reported by the service.
    pub status: WorkflowStatus,
    /// User inputs supplied at start.
    pub inputs: Value,
    /// Ordered step plan.
    pub steps: Vec<WorkflowStepPlan>,
}

/// Multi-step approval-gated plan coordinated with the AI service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    workflow_id: WorkflowId,
    tenant_id: TenantId,
    created_by: String,
    workflow_type: WorkflowType,
    status: WorkflowStatus,
    current_step: u32,
    inputs: Value,
    steps: Vec<WorkflowStepPlan>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Workflow {
    /// Creates a validated workflow positioned at step 0.
    pub fn new(input: NewWorkflow, created_at: DateTime<Utc>) -> AppResult<Self> {
        let NewWorkflow {
            workflow_id,
            tenant_id,
            created_by,
            workflow_type,
            status,
            inputs,
            steps,
        } = input;

        if steps.is_empty() {
            return Err(AppError::Validation(
                "workflow plan must contain at least one step".to_owned(),
            ));
        }

        for (position, step) in steps.iter().enumerate() {
            if usize::try_from(step.step_index).ok() != Some(position) {
                return Err(AppError::Validation(format!(
                    "workflow plan step at position {position} has index {}",
                    step.step_index
                )));
            }
        }

        if status.is_terminal() {
            return Err(AppError::Validation(format!(
                "new workflow cannot start in status '{}'",
                status.as_str()
            )));
        }

        let inputs = match inputs {
            Value::Null => Value::Object(Map::new()),
            Value::Object(_) => inputs,
            _ => {
                return Err(AppError::Validation(
                    "workflow inputs must be an object".to_owned(),
                ));
            }
        };

        let created_by = NonEmptyString::new(created_by)?;

        Ok(Self {
            workflow_id,
            tenant_id,
            created_by: created_by.into(),
            workflow_type,
            status,
            current_step: 0,
            inputs,
            steps,
            created_at,
            updated_at: created_at,
        })
    }

    /// Rehydrates a persisted workflow.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn restore(
        workflow_id: WorkflowId,
        tenant_id: TenantId,
        created_by: String,
        workflow_type: WorkflowType,
        status: WorkflowStatus,
        current_step: u32,
        inputs: Value,
        steps: Vec<WorkflowStepPlan>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            workflow_id,
            tenant_id,
            created_by,
            workflow_type,
            status,
            current_step,
            inputs,
            steps,
            created_at,
            updated_at,
        }
    }

    /// Returns the service-issued identifier.
    #[must_use]
    pub fn workflow_id(&self) -> &WorkflowId {
        &self.workflow_id
    }

    /// Returns the owning company.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the starting subject.
    #[must_use]
    pub fn created_by(&self) -> &str {
        self.created_by.as_str()
    }

    /// Returns the workflow kind.
    #[must_use]
    pub fn workflow_type(&self) -> WorkflowType {
        self.workflow_type
    }

    /// Returns the overall status.
    #[must_use]
    pub fn status(&self) -> WorkflowStatus {
        self.status
    }

    /// Returns the zero-based index of the step awaiting work.
    #[must_use]
    pub fn current_step(&self) -> u32 {
        self.current_step
    }

    /// Returns start inputs.
    #[must_use]
    pub fn inputs(&self) -> &Value {
        &self.inputs
    }

    /// Returns the ordered step plan.
    #[must_use]
    pub fn steps(&self) -> &[WorkflowStepPlan] {
        &self.steps
    }

    /// Returns the planned step at `step_index`.
    #[must_use]
    pub fn step_plan(&self, step_index: u32) -> Option<&WorkflowStepPlan> {
        self.steps.iter().find(|step| step.step_index == step_index)
    }

    /// Returns creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns last update timestamp.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Fails with `workflow_not_active` once the workflow is terminal.
    pub fn ensure_active(&self) -> AppResult<()> {
        if !self.status.is_terminal() {
            return Ok(());
        }

        Err(AppError::Conflict(format!(
            "workflow '{}' is {}",
            self.workflow_id,
            self.status.as_str()
        ))
        .with_code("workflow_not_active"))
    }

    /// Fails with `workflow_step_mismatch` unless `step_index` is the pending step.
    pub fn ensure_pending_step(&self, step_index: u32) -> AppResult<()> {
        self.ensure_active()?;
        if step_index == self.current_step {
            return Ok(());
        }

        Err(AppError::Conflict(format!(
            "workflow '{}' is waiting on step {}, not step {step_index}",
            self.workflow_id, self.current_step
        ))
        .with_code("workflow_step_mismatch"))
    }

    /// Marks the workflow as in progress once a step draft exists.
    #[must_use]
    pub fn mark_step_ready(&self, updated_at: DateTime<Utc>) -> Self {
        let status = match self.status {
            WorkflowStatus::Pending => WorkflowStatus::InProgress,
            other => other,
        };

        Self {
            status,
            updated_at,
            ..self.clone()
        }
    }

    /// Moves `current_step` forward after a decided step and applies `status`.
    ///
    /// `current_step` never decreases.
    pub fn advance(
        &self,
        current_step: u32,
        status: WorkflowStatus,
        updated_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        self.ensure_active()?;
        if current_step < self.current_step {
            return Err(AppError::Validation(format!(
                "workflow '{}' cannot move back from step {} to {current_step}",
                self.workflow_id, self.current_step
            )));
        }

        Ok(Self {
            current_step,
            status,
            updated_at,
            ..self.clone()
        })
    }

    /// Cancels a non-terminal workflow.
    pub fn cancel(&self, updated_at: DateTime<Utc>) -> AppResult<Self> {
        self.ensure_active()?;

        Ok(Self {
            status: WorkflowStatus::Cancelled,
            updated_at,
            ..self.clone()
        })
    }
}

/// Decision recorded against a workflow step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDecision {
    /// Approved or rejected.
    pub approval_state: StepApprovalState,
    /// Deciding subject.
    pub decided_by: String,
    /// Decision timestamp.
    pub decided_at: DateTime<Utc>,
    /// Output the reviewer confirmed or edited.
    pub output: Value,
}

/// One approval-gated step of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    workflow_id: WorkflowId,
    step_index: u32,
    action_type: ActionType,
    name: Option<String>,
    required_inputs: Value,
    draft_output: Option<Value>,
    approval_state: StepApprovalState,
    decision: Option<StepDecision>,
    updated_at: DateTime<Utc>,
}

impl WorkflowStep {
    /// Creates a pending step from a plan entry.
    #[must_use]
    pub fn planned(workflow_id: &WorkflowId, plan: &WorkflowStepPlan, at: DateTime<Utc>) -> Self {
        Self {
            workflow_id: workflow_id.clone(),
            step_index: plan.step_index,
            action_type: plan.action_type,
            name: plan.name.clone(),
            required_inputs: Value::Object(Map::new()),
            draft_output: None,
            approval_state: StepApprovalState::Pending,
            decision: None,
            updated_at: at,
        }
    }

    /// Rehydrates a persisted step.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn restore(
        workflow_id: WorkflowId,
        step_index: u32,
        action_type: ActionType,
        name: Option<String>,
        required_inputs: Value,
        draft_output: Option<Value>,
        approval_state: StepApprovalState,
        decision: Option<StepDecision>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            workflow_id,
            step_index,
            action_type,
            name,
            required_inputs,
            draft_output,
            approval_state,
            decision,
            updated_at,
        }
    }

    /// Returns the parent workflow identifier.
    #[must_use]
    pub fn workflow_id(&self) -> &WorkflowId {
        &self.workflow_id
    }

    /// Returns the zero-based step index.
    #[must_use]
    pub fn step_index(&self) -> u32 {
        self.step_index
    }

    /// Returns the proposed action type.
    #[must_use]
    pub fn action_type(&self) -> ActionType {
        self.action_type
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the inputs the reviewer must provide.
    #[must_use]
    pub fn required_inputs(&self) -> &Value {
        &self.required_inputs
    }

    /// Returns the drafted payload, once the service produced one.
    #[must_use]
    pub fn draft_output(&self) -> Option<&Value> {
        self.draft_output.as_ref()
    }

    /// Returns the approval state.
    #[must_use]
    pub fn approval_state(&self) -> StepApprovalState {
        self.approval_state
    }

    /// Returns the recorded decision.
    #[must_use]
    pub fn decision(&self) -> Option<&StepDecision> {
        self.decision.as_ref()
    }

    /// Returns last update timestamp.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns whether approving this step requires financial approval rights.
    #[must_use]
    pub fn is_financial(&self) -> bool {
        self.action_type.is_financial()
    }

    fn ensure_pending(&self) -> AppResult<()> {
        if self.approval_state == StepApprovalState::Pending {
            return Ok(());
        }

        Err(AppError::Conflict(format!(
            "workflow '{}' step {} is already {}",
            self.workflow_id,
            self.step_index,
            self.approval_state.as_str()
        ))
        .with_code("workflow_step_already_decided"))
    }

    /// Stores a freshly drafted payload on a pending step.
    pub fn with_draft(
        &self,
        action_type: ActionType,
        required_inputs: Value,
        draft_output: Value,
        at: DateTime<Utc>,
    ) -> AppResult<Self> {
        self.ensure_pending()?;

        Ok(Self {
            action_type,
            required_inputs: match required_inputs {
                Value::Null => Value::Object(Map::new()),
                other => other,
            },
            draft_output: Some(draft_output),
            updated_at: at,
            ..self.clone()
        })
    }

    /// Records the terminal decision. A step is decided at most once.
    pub fn decide(
        &self,
        approved: bool,
        decided_by: &str,
        output: Value,
        decided_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        self.ensure_pending()?;
        let decided_by = NonEmptyString::new(decided_by)?;
        let approval_state = if approved {
            StepApprovalState::Approved
        } else {
            StepApprovalState::Rejected
        };

        Ok(Self {
            approval_state,
            decision: Some(StepDecision {
                approval_state,
                decided_by: decided_by.into(),
                decided_at,
                output,
            }),
            updated_at: decided_at,
            ..self.clone()
        })
    }
}
