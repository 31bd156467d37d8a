use super::*;

impl InMemoryCopilotRepository {
    async fn owned_workflow(&self, tenant_id: TenantId, workflow_id: &str) -> Option<Workflow> {
        self.workflows
            .read()
            .await
            .get(workflow_id)
            .filter(|workflow| workflow.tenant_id() == tenant_id)
            .cloned()
    }
}

#[async_trait]
impl CopilotWorkflowRepository for InMemoryCopilotRepository {
    async fn create_workflow(
        &self,
        workflow: &Workflow,
        steps: &[WorkflowStep],
        event: &CopilotEvent,
    ) -> AppResult<()> {
        let workflow_id = workflow.workflow_id().as_str().to_owned();
        let mut workflows = self.workflows.write().await;
        if workflows.contains_key(&workflow_id) {
            return Err(AppError::Conflict(format!(
                "workflow '{workflow_id}' already exists"
            )));
        }

        let mut stored_steps = self.steps.write().await;
        for step in steps {
            stored_steps.insert((workflow_id.clone(), step.step_index()), step.clone());
        }
        workflows.insert(workflow_id, workflow.clone());
        self.append_events(std::slice::from_ref(event)).await;
        Ok(())
    }

    async fn find_workflow(
        &self,
        tenant_id: TenantId,
        workflow_id: &WorkflowId,
    ) -> AppResult<Option<Workflow>> {
        Ok(self.owned_workflow(tenant_id, workflow_id.as_str()).await)
    }

    async fn list_workflows(
        &self,
        tenant_id: TenantId,
        query: WorkflowListQuery,
    ) -> AppResult<Vec<Workflow>> {
        let mut matching: Vec<Workflow> = self
            .workflows
            .read()
            .await
            .values()
            .filter(|workflow| workflow.tenant_id() == tenant_id)
            .filter(|workflow| query.status.is_none_or(|status| workflow.status() == status))
            .cloned()
            .collect();
        matching.sort_by(|left, right| right.created_at().cmp(&left.created_at()));

        Ok(page(matching, query.offset, query.limit))
    }

    async fn list_steps(
        &self,
        tenant_id: TenantId,
        workflow_id: &WorkflowId,
    ) -> AppResult<Vec<WorkflowStep>> {
        if self.owned_workflow(tenant_id, workflow_id.as_str()).await.is_none() {
            return Ok(Vec::new());
        }

        let steps = self.steps.read().await;
        Ok(steps
            .range((workflow_id.as_str().to_owned(), 0)..=(workflow_id.as_str().to_owned(), u32::MAX))
            .map(|(_, step)| step.clone())
            .collect())
    }

    async fn find_step(
        &self,
        tenant_id: TenantId,
        workflow_id: &WorkflowId,
        step_index: u32,
    ) -> AppResult<Option<WorkflowStep>> {
        if self.owned_workflow(tenant_id, workflow_id.as_str()).await.is_none() {
            return Ok(None);
        }

        Ok(self
            .steps
            .read()
            .await
            .get(&(workflow_id.as_str().to_owned(), step_index))
            .cloned())
    }

    async fn save_step_draft(
        &self,
        workflow: &Workflow,
        step: &WorkflowStep,
        event: &CopilotEvent,
    ) -> AppResult<bool> {
        let workflow_id = workflow.workflow_id().as_str().to_owned();
        let mut workflows = self.workflows.write().await;
        let mut steps = self.steps.write().await;

        let Some(stored) = workflows.get_mut(&workflow_id) else {
            return Ok(false);
        };
        let active = matches!(
            stored.status(),
            WorkflowStatus::Pending | WorkflowStatus::InProgress
        );
        if stored.tenant_id() != workflow.tenant_id()
            || stored.current_step() != step.step_index()
            || !active
        {
            return Ok(false);
        }

        let step_key = (workflow_id, step.step_index());
        let pending = steps
            .get(&step_key)
            .is_none_or(|existing| existing.approval_state() == StepApprovalState::Pending);
        if !pending {
            return Ok(false);
        }

        *stored = workflow.clone();
        steps.insert(step_key, step.clone());
        self.append_events(std::slice::from_ref(event)).await;
        Ok(true)
    }

    async fn apply_step_decision(
        &self,
        expected_current_step: u32,
        workflow: &Workflow,
        step: &WorkflowStep,
        events: &[CopilotEvent],
    ) -> AppResult<bool> {
        let workflow_id = workflow.workflow_id().as_str().to_owned();
        let mut workflows = self.workflows.write().await;
        let mut steps = self.steps.write().await;

        let Some(stored) = workflows.get_mut(&workflow_id) else {
            return Ok(false);
        };
        if stored.tenant_id() != workflow.tenant_id()
            || stored.current_step() != expected_current_step
        {
            return Ok(false);
        }

        let step_key = (workflow_id, step.step_index());
        let pending = steps
            .get(&step_key)
            .is_some_and(|existing| existing.approval_state() == StepApprovalState::Pending);
        if !pending {
            return Ok(false);
        }

        *stored = workflow.clone();
        steps.insert(step_key, step.clone());
        self.append_events(events).await;
        Ok(true)
    }

    async fn update_workflow_status(
        &self,
        expected_status: WorkflowStatus,
        workflow: &Workflow,
        event: &CopilotEvent,
    ) -> AppResult<bool> {
        let mut workflows = self.workflows.write().await;
        match workflows.get_mut(workflow.workflow_id().as_str()) {
            Some(stored)
                if stored.tenant_id() == workflow.tenant_id()
                    && stored.status() == expected_status =>
            {
                *stored = workflow.clone();
                self.append_events(std::slice::from_ref(event)).await;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
