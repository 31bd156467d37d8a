use super::*;

const WORKFLOW_PAGE_MAX: usize = 200;

impl WorkflowOrchestrationService {
    /// Returns a workflow of the actor's company with its steps.
    pub async fn get_workflow(
        &self,
        actor: &ActorContext,
        workflow_id: &WorkflowId,
    ) -> AppResult<WorkflowDetail> {
        let workflow = self.accessible_workflow(actor, workflow_id).await?;
        let steps = self
            .repository
            .list_steps(workflow.tenant_id(), workflow_id)
            .await?;

        Ok(WorkflowDetail { workflow, steps })
    }

    /// Lists workflows of the actor's company newest first.
    pub async fn list_workflows(
        &self,
        actor: &ActorContext,
        mut query: WorkflowListQuery,
    ) -> AppResult<Vec<Workflow>> {
        let tenant_id = actor.require_company()?;
        self.context.gate.require_list_workflows(actor).await?;
        query.limit = query.limit.clamp(1, WORKFLOW_PAGE_MAX);

        self.repository.list_workflows(tenant_id, query).await
    }
}
