use super::*;

impl ActionDraftService {
    /// Approves a draft and converts it into domain entities exactly once.
    ///
    /// Runs under the per-draft decision lease. The approved draft, its
    /// entities and the approval event are stored in one compare-and-set on
    /// the drafted state, so a concurrent winner turns this call into
    /// `draft_already_decided` and leaves nothing behind. Conversion failures
    /// leave the draft drafted and surface `draft_payload_invalid`.
    pub async fn approve(&self, actor: &ActorContext, draft_id: ActionDraftId) -> AppResult<ApprovedDraft> {
        let draft = self.load_draft(actor, draft_id).await?;
        self.context
            .gate
            .require_approve(actor, draft.action_type())
            .await?;
        draft.ensure_drafted()?;

        let scope_key = decision_scope(&draft);
        self.context
            .with_decision_lease(&scope_key, actor, "draft_decision_in_progress", || {
                self.approve_under_lease(actor, draft_id)
            })
            .await
    }

    /// Rejects a draft with a reason. Entity stores are never touched.
    pub async fn reject(
        &self,
        actor: &ActorContext,
        draft_id: ActionDraftId,
        reason: &str,
    ) -> AppResult<ActionDraft> {
        let draft = self.load_draft(actor, draft_id).await?;
        self.context
            .gate
            .require_approve(actor, draft.action_type())
            .await?;
        draft.ensure_drafted()?;

        let scope_key = decision_scope(&draft);
        self.context
            .with_decision_lease(&scope_key, actor, "draft_decision_in_progress", || {
                self.reject_under_lease(actor, draft_id, reason)
            })
            .await
    }

    async fn approve_under_lease(
        &self,
        actor: &ActorContext,
        draft_id: ActionDraftId,
    ) -> AppResult<ApprovedDraft> {
        let draft = self.load_draft(actor, draft_id).await?;
        draft.ensure_drafted()?;

        let started = Instant::now();
        let request_payload = json!({
            "draft_id": draft_id,
            "action_type": draft.action_type().as_str(),
        });

        let prepared = match self.conversions.prepare(&draft).await {
            Ok(prepared) => prepared,
            Err(error) => {
                return Err(self
                    .context
                    .events
                    .record_failure(
                        draft.tenant_id(),
                        actor.subject(),
                        EventFeature::ActionApprove,
                        request_payload,
                        error,
                        started,
                    )
                    .await);
            }
        };

        let outcome = prepared.outcome().clone();
        let approved = draft.approve(actor.subject(), Utc::now(), outcome.primary().clone())?;
        let event = EventRecord::success(
            EventFeature::ActionApprove,
            request_payload,
            json!({
                "entities": outcome
                    .entities()
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>(),
            }),
            started,
        )
        .with_entity(outcome.primary().clone())
        .into_event(draft.tenant_id(), actor.subject());

        let saved = self
            .repository
            .save_decision(DraftDecisionWrite {
                draft: &approved,
                entities: prepared.records(),
                created_by: actor.subject(),
                event: &event,
            })
            .await?;
        if !saved {
            return Err(already_decided(draft_id));
        }

        info!(
            draft_id = %draft_id,
            entity = %outcome.primary(),
            entities = outcome.entities().len(),
            "approved copilot action draft"
        );

        Ok(ApprovedDraft {
            draft: approved,
            outcome,
        })
    }

    async fn reject_under_lease(
        &self,
        actor: &ActorContext,
        draft_id: ActionDraftId,
        reason: &str,
    ) -> AppResult<ActionDraft> {
        let draft = self.load_draft(actor, draft_id).await?;
        let started = Instant::now();
        let rejected = draft.reject(actor.subject(), Utc::now(), reason)?;
        let event = EventRecord::success(
            EventFeature::ActionReject,
            json!({
                "draft_id": draft_id,
                "action_type": draft.action_type().as_str(),
                "reason": reason.trim(),
            }),
            json!({ "status": rejected.status().as_str() }),
            started,
        )
        .with_entity(draft_reference(draft_id)?)
        .into_event(draft.tenant_id(), actor.subject());

        let saved = self
            .repository
            .save_decision(DraftDecisionWrite {
                draft: &rejected,
                entities: &[],
                created_by: actor.subject(),
                event: &event,
            })
            .await?;
        if !saved {
            return Err(already_decided(draft_id));
        }

        Ok(rejected)
    }
}

fn decision_scope(draft: &ActionDraft) -> String {
    format!("copilot:draft:{}:{}", draft.tenant_id(), draft.draft_id())
}

fn already_decided(draft_id: ActionDraftId) -> AppError {
    AppError::Conflict(format!("action draft '{draft_id}' was decided concurrently"))
        .with_code("draft_already_decided")
}
