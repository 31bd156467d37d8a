//! Multi-step, approval-gated workflows coordinated with the AI service.
//!
//! The AI service owns the plan; this service owns the approval trail. A
//! workflow only moves past a step once that step is decided, and step
//! decisions are serialized per workflow by the decision lease plus a
//! compare-and-set on `current_step`.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use procura_core::{ActorContext, AppError, AppResult, TenantId};
use procura_domain::{
    EntityKind, EntityReference, EventFeature, FeatureKey, NewWorkflow, Workflow, WorkflowId,
    WorkflowStatus, WorkflowStep, WorkflowType,
};
use serde_json::{Value, json};
use tracing::info;

use crate::copilot_context::{company_context, invalid_service_response};
use crate::{
    CompleteWorkflowStepRequest, CopilotServiceContext, CopilotWorkflowRepository, EventRecord,
    PlanWorkflowRequest, RateLimitRule, WorkflowListQuery,
};

mod lifecycle;
mod reads;
mod steps;

/// Input for starting a workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct StartWorkflowInput {
    /// Requested workflow kind.
    pub workflow_type: WorkflowType,
    /// Start inputs forwarded to the AI service.
    pub inputs: Value,
}

/// Reviewer decision on the pending step.
#[derive(Debug, Clone, PartialEq)]
pub struct CompleteStepInput {
    /// Step the reviewer believes is pending.
    pub step_index: u32,
    /// Whether the reviewer approved.
    pub approval: bool,
    /// Reviewer-confirmed output.
    pub output: Value,
}

/// Workflow with its steps ordered by index.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowDetail {
    /// Workflow header.
    pub workflow: Workflow,
    /// Step rows.
    pub steps: Vec<WorkflowStep>,
}

/// Workflow and step after a step operation.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowStepOutcome {
    /// Workflow after the operation.
    pub workflow: Workflow,
    /// Step the operation touched.
    pub step: WorkflowStep,
}

/// Start, next, complete, cancel and reads for copilot workflows.
#[derive(Clone)]
pub struct WorkflowOrchestrationService {
    context: CopilotServiceContext,
    repository: Arc<dyn CopilotWorkflowRepository>,
    rate_limit_rule: RateLimitRule,
}

impl WorkflowOrchestrationService {
    /// Creates the workflow service.
    #[must_use]
    pub fn new(
        context: CopilotServiceContext,
        repository: Arc<dyn CopilotWorkflowRepository>,
        rate_limit_rule: RateLimitRule,
    ) -> Self {
        Self {
            context,
            repository,
            rate_limit_rule,
        }
    }

    async fn load_workflow(&self, tenant_id: TenantId, workflow_id: &WorkflowId) -> AppResult<Workflow> {
        self.repository
            .find_workflow(tenant_id, workflow_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("workflow '{workflow_id}' does not exist")))
    }

    async fn load_step(&self, workflow: &Workflow, step_index: u32) -> AppResult<WorkflowStep> {
        self.repository
            .find_step(workflow.tenant_id(), workflow.workflow_id(), step_index)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "workflow '{}' has no step {step_index}",
                    workflow.workflow_id()
                ))
            })
    }

    /// Loads a workflow of the actor's company and checks access.
    async fn accessible_workflow(
        &self,
        actor: &ActorContext,
        workflow_id: &WorkflowId,
    ) -> AppResult<Workflow> {
        let tenant_id = actor.require_company()?;
        let workflow = self.load_workflow(tenant_id, workflow_id).await?;
        self.context
            .gate
            .require_access_workflow(actor, &workflow)
            .await?;
        Ok(workflow)
    }

    async fn check_budget(&self, actor: &ActorContext, tenant_id: TenantId) -> AppResult<()> {
        self.context
            .entitlements
            .require_feature(actor, tenant_id, FeatureKey::AiWorkflowsEnabled)
            .await?;
        self.context
            .rate_limits
            .check_actor(&self.rate_limit_rule, tenant_id, actor)
            .await
    }
}

fn decision_scope(workflow: &Workflow) -> String {
    format!(
        "copilot:workflow:{}:{}",
        workflow.tenant_id(),
        workflow.workflow_id()
    )
}

fn workflow_reference(workflow: &Workflow) -> AppResult<EntityReference> {
    EntityReference::new(EntityKind::CopilotWorkflow, workflow.workflow_id().as_str())
}

/// Denormalized snapshot embedded in workflow events. Derived, never read back.
fn workflow_snapshot(workflow: &Workflow, step: Option<&WorkflowStep>) -> Value {
    json!({
        "workflow_id": workflow.workflow_id(),
        "workflow_type": workflow.workflow_type().as_str(),
        "status": workflow.status().as_str(),
        "current_step": workflow.current_step(),
        "step_index": step.map(WorkflowStep::step_index),
        "action_type": step.map(|step| step.action_type().as_str()),
    })
}

#[cfg(test)]
mod tests;
