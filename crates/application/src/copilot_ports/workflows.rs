use async_trait::async_trait;
use procura_core::{AppResult, TenantId};
use procura_domain::{CopilotEvent, Workflow, WorkflowId, WorkflowStatus, WorkflowStep};

/// Query inputs for listing workflows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowListQuery {
    /// Optional status filter.
    pub status: Option<WorkflowStatus>,
    /// Page size.
    pub limit: usize,
    /// Page offset.
    pub offset: usize,
}

impl Default for WorkflowListQuery {
    fn default() -> Self {
        Self {
            status: None,
            limit: 50,
            offset: 0,
        }
    }
}

/// Workflow store port.
///
/// Every write carries the events of its transition; adapters store them in
/// the same unit of work and write nothing when a guard fails.
#[async_trait]
pub trait CopilotWorkflowRepository: Send + Sync {
    /// Persists a new workflow with its planned steps. Fails with conflict on a duplicate id.
    async fn create_workflow(
        &self,
        workflow: &Workflow,
        steps: &[WorkflowStep],
        event: &CopilotEvent,
    ) -> AppResult<()>;

    /// Finds one workflow in the company scope.
    async fn find_workflow(
        &self,
        tenant_id: TenantId,
        workflow_id: &WorkflowId,
    ) -> AppResult<Option<Workflow>>;

    /// Lists workflows newest first.
    async fn list_workflows(
        &self,
        tenant_id: TenantId,
        query: WorkflowListQuery,
    ) -> AppResult<Vec<Workflow>>;

    /// Lists steps ordered by index.
    async fn list_steps(
        &self,
        tenant_id: TenantId,
        workflow_id: &WorkflowId,
    ) -> AppResult<Vec<WorkflowStep>>;

    /// Finds one step.
    async fn find_step(
        &self,
        tenant_id: TenantId,
        workflow_id: &WorkflowId,
        step_index: u32,
    ) -> AppResult<Option<WorkflowStep>>;

    /// Upserts a drafted step and the workflow status while the step is pending
    /// and the workflow still sits on that step.
    ///
    /// Returns `false` when the step was decided or the workflow moved on.
    async fn save_step_draft(
        &self,
        workflow: &Workflow,
        step: &WorkflowStep,
        event: &CopilotEvent,
    ) -> AppResult<bool>;

    /// Stores a step decision and the advanced workflow in one unit of work,
    /// guarded by `current_step = expected_current_step` and a pending step.
    ///
    /// Returns `false` when the guard fails.
    async fn apply_step_decision(
        &self,
        expected_current_step: u32,
        workflow: &Workflow,
        step: &WorkflowStep,
        events: &[CopilotEvent],
    ) -> AppResult<bool>;

    /// Stores a workflow status change guarded by `status = expected_status`.
    async fn update_workflow_status(
        &self,
        expected_status: WorkflowStatus,
        workflow: &Workflow,
        event: &CopilotEvent,
    ) -> AppResult<bool>;
}
