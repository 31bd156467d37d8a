use procura_domain::WorkflowStepPlan;

use crate::CompletedWorkflowStep;

use super::*;

impl WorkflowOrchestrationService {
    /// Asks the AI service to draft the step at `current_step` and stores it.
    ///
    /// Holds the same per-workflow lease as step decisions, so a redraft never
    /// replaces the draft a concurrent `complete` is deciding.
    pub async fn next(
        &self,
        actor: &ActorContext,
        workflow_id: &WorkflowId,
    ) -> AppResult<WorkflowStepOutcome> {
        let workflow = self.accessible_workflow(actor, workflow_id).await?;
        workflow.ensure_active()?;
        self.check_budget(actor, workflow.tenant_id()).await?;

        let scope_key = decision_scope(&workflow);
        self.context
            .with_decision_lease(&scope_key, actor, "workflow_decision_in_progress", || {
                self.next_under_lease(actor, workflow.tenant_id(), workflow_id)
            })
            .await
    }

    async fn next_under_lease(
        &self,
        actor: &ActorContext,
        tenant_id: TenantId,
        workflow_id: &WorkflowId,
    ) -> AppResult<WorkflowStepOutcome> {
        let workflow = self.load_workflow(tenant_id, workflow_id).await?;
        workflow.ensure_active()?;

        let step_index = workflow.current_step();
        let request_payload = json!({ "workflow_id": workflow_id, "step_index": step_index });
        let started = Instant::now();
        let drafted = match self
            .context
            .ai_client
            .next_workflow_step(workflow_id.as_str())
            .await
            .and_then(|drafted| {
                if drafted.step_index != step_index {
                    return Err(invalid_service_response(format!(
                        "AI service drafted step {} while workflow '{workflow_id}' waits on step {step_index}",
                        drafted.step_index
                    )));
                }
                Ok(drafted)
            }) {
            Ok(drafted) => drafted,
            Err(error) => {
                return Err(self
                    .context
                    .events
                    .record_failure(
                        tenant_id,
                        actor.subject(),
                        EventFeature::WorkflowStepReady,
                        request_payload,
                        error,
                        started,
                    )
                    .await);
            }
        };

        let now = Utc::now();
        let base = match self
            .repository
            .find_step(tenant_id, workflow_id, step_index)
            .await?
        {
            Some(step) => step,
            None => WorkflowStep::planned(
                workflow_id,
                &WorkflowStepPlan {
                    step_index,
                    action_type: drafted.action_type,
                    name: None,
                },
                now,
            ),
        };
        let step = base.with_draft(
            drafted.action_type,
            drafted.required_inputs,
            drafted.draft_output,
            now,
        )?;
        let ready = workflow.mark_step_ready(now);
        let event = EventRecord::success(
            EventFeature::WorkflowStepReady,
            request_payload,
            workflow_snapshot(&ready, Some(&step)),
            started,
        )
        .with_entity(workflow_reference(&ready)?)
        .into_event(tenant_id, actor.subject());
        if !self.repository.save_step_draft(&ready, &step, &event).await? {
            return Err(AppError::Conflict(format!(
                "workflow '{workflow_id}' step {step_index} was decided concurrently"
            ))
            .with_code("workflow_step_already_decided"));
        }

        Ok(WorkflowStepOutcome {
            workflow: ready,
            step,
        })
    }

    /// Decides the pending step, reports it to the AI service and advances.
    ///
    /// `step_index` must equal `current_step`; anything else is
    /// `workflow_step_mismatch` and changes nothing.
    pub async fn complete(
        &self,
        actor: &ActorContext,
        workflow_id: &WorkflowId,
        input: CompleteStepInput,
    ) -> AppResult<WorkflowStepOutcome> {
        let workflow = self.accessible_workflow(actor, workflow_id).await?;
        workflow.ensure_pending_step(input.step_index)?;
        let step = self.load_step(&workflow, input.step_index).await?;
        ensure_step_ready(&step)?;
        self.context
            .gate
            .require_approve_workflow_step(actor, &workflow, &step)
            .await?;
        self.check_budget(actor, workflow.tenant_id()).await?;

        let scope_key = decision_scope(&workflow);
        self.context
            .with_decision_lease(&scope_key, actor, "workflow_decision_in_progress", || {
                self.complete_under_lease(actor, workflow.tenant_id(), workflow_id, input)
            })
            .await
    }

    async fn complete_under_lease(
        &self,
        actor: &ActorContext,
        tenant_id: TenantId,
        workflow_id: &WorkflowId,
        input: CompleteStepInput,
    ) -> AppResult<WorkflowStepOutcome> {
        let workflow = self.load_workflow(tenant_id, workflow_id).await?;
        workflow.ensure_pending_step(input.step_index)?;
        let step = self.load_step(&workflow, input.step_index).await?;
        ensure_step_ready(&step)?;
        let decided = step.decide(
            input.approval,
            actor.subject(),
            input.output.clone(),
            Utc::now(),
        )?;

        let feature = if input.approval {
            EventFeature::WorkflowStepApproved
        } else {
            EventFeature::WorkflowStepRejected
        };
        let request_payload = json!({
            "workflow_id": workflow_id,
            "step_index": input.step_index,
            "approval": input.approval,
        });
        let started = Instant::now();
        let position = self
            .context
            .ai_client
            .complete_workflow_step(CompleteWorkflowStepRequest {
                workflow_id: workflow_id.as_str().to_owned(),
                step_index: input.step_index,
                approval: input.approval,
                output: input.output,
            })
            .await
            .and_then(|progress| next_position(input.step_index, input.approval, progress));
        let (next_step, status) = match position {
            Ok(position) => position,
            Err(error) => {
                return Err(self
                    .context
                    .events
                    .record_failure(
                        tenant_id,
                        actor.subject(),
                        feature,
                        request_payload,
                        error,
                        started,
                    )
                    .await);
            }
        };

        let advanced = workflow.advance(next_step, status, decided.updated_at())?;
        let entity = workflow_reference(&advanced)?;
        let mut events = vec![
            EventRecord::success(
                feature,
                request_payload.clone(),
                workflow_snapshot(&advanced, Some(&decided)),
                started,
            )
            .with_entity(entity.clone())
            .into_event(tenant_id, actor.subject()),
        ];
        if advanced.status() == WorkflowStatus::Completed {
            events.push(
                EventRecord::success(
                    EventFeature::WorkflowCompleted,
                    request_payload,
                    workflow_snapshot(&advanced, None),
                    started,
                )
                .with_entity(entity)
                .into_event(tenant_id, actor.subject()),
            );
        }

        if !self
            .repository
            .apply_step_decision(input.step_index, &advanced, &decided, &events)
            .await?
        {
            return Err(AppError::Conflict(format!(
                "workflow '{workflow_id}' moved past step {} concurrently",
                input.step_index
            ))
            .with_code("workflow_step_mismatch"));
        }

        info!(
            workflow_id = %workflow_id,
            step_index = input.step_index,
            approved = input.approval,
            status = advanced.status().as_str(),
            current_step = advanced.current_step(),
            "decided copilot workflow step"
        );

        Ok(WorkflowStepOutcome {
            workflow: advanced,
            step: decided,
        })
    }
}

fn ensure_step_ready(step: &WorkflowStep) -> AppResult<()> {
    if step.draft_output().is_some() {
        return Ok(());
    }

    Err(AppError::Conflict(format!(
        "workflow '{}' step {} has not been drafted yet",
        step.workflow_id(),
        step.step_index()
    ))
    .with_code("workflow_step_not_ready"))
}

/// Where the workflow sits after a decision on `step_index`.
///
/// Approval always moves forward. Rejection moves forward only when the
/// service names a later step; otherwise the workflow stays and fails unless
/// the service already reported a terminal status.
fn next_position(
    step_index: u32,
    approved: bool,
    progress: CompletedWorkflowStep,
) -> AppResult<(u32, WorkflowStatus)> {
    let started = |status: WorkflowStatus| match status {
        WorkflowStatus::Pending => WorkflowStatus::InProgress,
        other => other,
    };

    if approved {
        let next = progress
            .next_step
            .unwrap_or_else(|| step_index.saturating_add(1));
        if next <= step_index {
            return Err(invalid_service_response(format!(
                "AI service moved an approved workflow from step {step_index} back to {next}"
            )));
        }
        return Ok((next, started(progress.workflow_status)));
    }

    match progress.next_step.filter(|next| *next > step_index) {
        Some(next) => Ok((next, started(progress.workflow_status))),
        None if progress.workflow_status.is_terminal() => Ok((step_index, progress.workflow_status)),
        None => Ok((step_index, WorkflowStatus::Failed)),
    }
}
