use super::*;

impl WorkflowOrchestrationService {
    /// Plans and persists a new workflow with its planned steps.
    ///
    /// The workflow feature key and the workflows budget are checked before the
    /// AI service is called. A rejected or malformed plan records an error event
    /// and persists nothing.
    pub async fn start(
        &self,
        actor: &ActorContext,
        input: StartWorkflowInput,
    ) -> AppResult<WorkflowDetail> {
        let tenant_id = actor.require_company()?;
        let workflow_type = input.workflow_type;
        if !(input.inputs.is_object() || input.inputs.is_null()) {
            return Err(AppError::Validation(
                "workflow inputs must be an object".to_owned(),
            ));
        }

        self.context
            .gate
            .require_start_workflow(actor, workflow_type)
            .await?;
        self.check_budget(actor, tenant_id).await?;

        let request_payload = json!({
            "workflow_type": workflow_type.as_str(),
            "inputs": input.inputs,
        });
        let started = Instant::now();
        let planned = self
            .context
            .ai_client
            .plan_workflow(PlanWorkflowRequest {
                workflow_type,
                inputs: input.inputs.clone(),
                company_context: company_context(actor, tenant_id),
            })
            .await
            .and_then(|planned| {
                let workflow_id = WorkflowId::new(planned.workflow_id)
                    .map_err(|error| invalid_service_response(error.message().to_owned()))?;
                Workflow::new(
                    NewWorkflow {
                        workflow_id,
                        tenant_id,
                        created_by: actor.subject().to_owned(),
                        workflow_type,
                        status: planned.status,
                        inputs: input.inputs,
                        steps: planned.steps,
                    },
                    Utc::now(),
                )
                .map_err(|error| invalid_service_response(error.message().to_owned()))
            });
        let workflow = match planned {
            Ok(workflow) => workflow,
            Err(error) => {
                return Err(self
                    .context
                    .events
                    .record_failure(
                        tenant_id,
                        actor.subject(),
                        EventFeature::WorkflowStart,
                        request_payload,
                        error,
                        started,
                    )
                    .await);
            }
        };

        let steps: Vec<WorkflowStep> = workflow
            .steps()
            .iter()
            .map(|plan| WorkflowStep::planned(workflow.workflow_id(), plan, workflow.created_at()))
            .collect();
        let mut response = workflow_snapshot(&workflow, None);
        response["step_count"] = json!(steps.len());
        let event = EventRecord::success(EventFeature::WorkflowStart, request_payload, response, started)
            .with_entity(workflow_reference(&workflow)?)
            .into_event(tenant_id, actor.subject());
        self.repository
            .create_workflow(&workflow, &steps, &event)
            .await?;

        info!(
            workflow_id = %workflow.workflow_id(),
            workflow_type = workflow_type.as_str(),
            steps = steps.len(),
            "started copilot workflow"
        );

        Ok(WorkflowDetail { workflow, steps })
    }

    /// Cancels a non-terminal workflow.
    pub async fn cancel(&self, actor: &ActorContext, workflow_id: &WorkflowId) -> AppResult<Workflow> {
        let workflow = self.accessible_workflow(actor, workflow_id).await?;
        self.context
            .gate
            .require_cancel_workflow(actor, &workflow)
            .await?;
        workflow.ensure_active()?;

        let scope_key = decision_scope(&workflow);
        self.context
            .with_decision_lease(&scope_key, actor, "workflow_decision_in_progress", || {
                self.cancel_under_lease(actor, workflow.tenant_id(), workflow_id)
            })
            .await
    }

    async fn cancel_under_lease(
        &self,
        actor: &ActorContext,
        tenant_id: TenantId,
        workflow_id: &WorkflowId,
    ) -> AppResult<Workflow> {
        let workflow = self.load_workflow(tenant_id, workflow_id).await?;
        let started = Instant::now();
        let cancelled = workflow.cancel(Utc::now())?;
        let event = EventRecord::success(
            EventFeature::WorkflowCancelled,
            json!({ "workflow_id": workflow_id, "previous_status": workflow.status().as_str() }),
            workflow_snapshot(&cancelled, None),
            started,
        )
        .with_entity(workflow_reference(&cancelled)?)
        .into_event(tenant_id, actor.subject());
        if !self
            .repository
            .update_workflow_status(workflow.status(), &cancelled, &event)
            .await?
        {
            return Err(AppError::Conflict(format!(
                "workflow '{workflow_id}' changed while cancelling"
            ))
            .with_code("workflow_not_active"));
        }

        info!(workflow_id = %workflow_id, "cancelled copilot workflow");
        Ok(cancelled)
    }
}
