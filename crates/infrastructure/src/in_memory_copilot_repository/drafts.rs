use super::*;

#[async_trait]
impl ActionDraftRepository for InMemoryCopilotRepository {
    async fn create_draft(&self, draft: &ActionDraft, event: &CopilotEvent) -> AppResult<()> {
        let mut drafts = self.drafts.write().await;
        if drafts.contains_key(&draft.draft_id()) {
            return Err(AppError::Conflict(format!(
                "action draft '{}' already exists",
                draft.draft_id()
            )));
        }

        drafts.insert(draft.draft_id(), draft.clone());
        self.append_events(std::slice::from_ref(event)).await;
        Ok(())
    }

    async fn find_draft(
        &self,
        tenant_id: TenantId,
        draft_id: ActionDraftId,
    ) -> AppResult<Option<ActionDraft>> {
        Ok(self
            .drafts
            .read()
            .await
            .get(&draft_id)
            .filter(|draft| draft.tenant_id() == tenant_id)
            .cloned())
    }

    async fn list_drafts(
        &self,
        tenant_id: TenantId,
        query: ActionDraftListQuery,
    ) -> AppResult<Vec<ActionDraft>> {
        let drafts = self.drafts.read().await;
        let mut matching: Vec<ActionDraft> = drafts
            .values()
            .filter(|draft| draft.tenant_id() == tenant_id)
            .filter(|draft| query.status.is_none_or(|status| draft.status() == status))
            .filter(|draft| {
                query
                    .action_type
                    .is_none_or(|action_type| draft.action_type() == action_type)
            })
            .cloned()
            .collect();
        matching.sort_by(|left, right| right.created_at().cmp(&left.created_at()));

        Ok(page(matching, query.offset, query.limit))
    }

    async fn save_decision(&self, decision: DraftDecisionWrite<'_>) -> AppResult<bool> {
        let draft = decision.draft;
        let tenant_id = draft.tenant_id();
        let mut drafts = self.drafts.write().await;
        let Some(stored) = drafts.get_mut(&draft.draft_id()) else {
            return Ok(false);
        };
        if stored.tenant_id() != tenant_id || stored.status() != ActionDraftStatus::Drafted {
            return Ok(false);
        }

        let mut records = self.records.write().await;
        if let Some(taken) = decision.entities.iter().find(|record| {
            records.contains_key(&(tenant_id, record.entity_kind, record.idempotency_key.clone()))
        }) {
            return Err(AppError::Conflict(format!(
                "{} record '{}' already exists",
                taken.entity_kind.as_str(),
                taken.idempotency_key
            )));
        }

        let created_at = Utc::now();
        for record in decision.entities {
            records.insert(
                (tenant_id, record.entity_kind, record.idempotency_key.clone()),
                StoredRecord {
                    record_id: record.record_id,
                    tenant_id,
                    entity_kind: record.entity_kind,
                    data: record.data.clone(),
                    created_at,
                },
            );
        }
        *stored = draft.clone();
        self.append_events(std::slice::from_ref(decision.event)).await;
        Ok(true)
    }

    async fn append_feedback(&self, feedback: &ActionFeedback, event: &CopilotEvent) -> AppResult<()> {
        let exists = self
            .drafts
            .read()
            .await
            .get(&feedback.draft_id())
            .is_some_and(|draft| draft.tenant_id() == feedback.tenant_id());
        if !exists {
            return Err(AppError::NotFound(format!(
                "action draft '{}' does not exist",
                feedback.draft_id()
            )));
        }

        self.feedback.write().await.push(feedback.clone());
        self.append_events(std::slice::from_ref(event)).await;
        Ok(())
    }

    async fn list_feedback(
        &self,
        tenant_id: TenantId,
        draft_id: ActionDraftId,
    ) -> AppResult<Vec<ActionFeedback>> {
        let mut matching: Vec<ActionFeedback> = self
            .feedback
            .read()
            .await
            .iter()
            .filter(|feedback| feedback.tenant_id() == tenant_id && feedback.draft_id() == draft_id)
            .cloned()
            .collect();
        matching.sort_by_key(ActionFeedback::created_at);

        Ok(matching)
    }
}
