use super::*;

impl ActionDraftService {
    /// Plans one action and stores the proposal as a new draft.
    ///
    /// Permission, entitlement and rate limit are enforced before the AI service
    /// is called. A failed or malformed reply records an error event and creates
    /// nothing.
    pub async fn plan(&self, actor: &ActorContext, input: PlanActionInput) -> AppResult<ActionDraft> {
        let tenant_id = actor.require_company()?;
        let action_type = input.action_type;

        self.context.gate.require_plan(actor, action_type).await?;
        self.context
            .entitlements
            .require_feature(actor, tenant_id, FeatureKey::AiActionsEnabled)
            .await?;
        self.context
            .rate_limits
            .check_actor(&self.rate_limit_rule, tenant_id, actor)
            .await?;

        let company_context = company_context(actor, tenant_id);
        let action_input = ActionInput::new(
            input.query,
            input.inputs,
            input.filters,
            company_context.clone(),
        )?;
        let request_payload = json!({
            "action_type": action_type.as_str(),
            "query": action_input.query,
            "inputs": action_input.inputs,
            "filters": action_input.filters,
        });

        let started = Instant::now();
        let planned = match self
            .context
            .ai_client
            .plan_action(PlanActionRequest {
                action_type,
                input: action_input.clone(),
                company_context,
            })
            .await
            .and_then(|planned| {
                if planned.action_type != action_type {
                    return Err(invalid_service_response(format!(
                        "AI service planned '{}' for a '{}' request",
                        planned.action_type.as_str(),
                        action_type.as_str()
                    )));
                }
                planned
                    .output
                    .validate()
                    .map_err(|error| invalid_service_response(error.message().to_owned()))?;
                Ok(planned)
            }) {
            Ok(planned) => planned,
            Err(error) => {
                return Err(self
                    .context
                    .events
                    .record_failure(
                        tenant_id,
                        actor.subject(),
                        EventFeature::ActionPlan,
                        request_payload,
                        error,
                        started,
                    )
                    .await);
            }
        };

        let draft = ActionDraft::new(
            NewActionDraft {
                tenant_id,
                created_by: actor.subject().to_owned(),
                action_type,
                input: action_input,
                output: planned.output,
            },
            Utc::now(),
        )?;
        let event = EventRecord::success(
            EventFeature::ActionPlan,
            request_payload,
            json!({
                "draft_id": draft.draft_id(),
                "summary": draft.output().summary,
                "confidence": draft.output().confidence,
                "needs_human_review": draft.output().needs_human_review,
            }),
            started,
        )
        .with_entity(draft_reference(draft.draft_id())?)
        .into_event(tenant_id, actor.subject());
        self.repository.create_draft(&draft, &event).await?;

        info!(
            draft_id = %draft.draft_id(),
            action_type = action_type.as_str(),
            "planned copilot action"
        );

        Ok(draft)
    }
}
