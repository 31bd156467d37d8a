use super::*;

const DRAFT_PAGE_MAX: usize = 200;

impl ActionDraftService {
    /// Returns one draft of the actor's company.
    pub async fn get_draft(&self, actor: &ActorContext, draft_id: ActionDraftId) -> AppResult<ActionDraft> {
        self.context.gate.require_read_drafts(actor).await?;
        self.load_draft(actor, draft_id).await
    }

    /// Lists drafts of the actor's company newest first.
    pub async fn list_drafts(
        &self,
        actor: &ActorContext,
        mut query: ActionDraftListQuery,
    ) -> AppResult<Vec<ActionDraft>> {
        let tenant_id = actor.require_company()?;
        self.context.gate.require_read_drafts(actor).await?;
        query.limit = query.limit.clamp(1, DRAFT_PAGE_MAX);

        self.repository.list_drafts(tenant_id, query).await
    }

    /// Lists feedback left on a draft.
    pub async fn list_feedback(
        &self,
        actor: &ActorContext,
        draft_id: ActionDraftId,
    ) -> AppResult<Vec<ActionFeedback>> {
        let draft = self.get_draft(actor, draft_id).await?;
        self.repository
            .list_feedback(draft.tenant_id(), draft_id)
            .await
    }
}
