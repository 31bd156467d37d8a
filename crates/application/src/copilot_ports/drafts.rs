use async_trait::async_trait;
use procura_core::{AppResult, TenantId};
use procura_domain::{
    ActionDraft, ActionDraftId, ActionDraftStatus, ActionFeedback, ActionType, CopilotEvent,
};

use crate::NewEntityRecord;

/// Query inputs for listing drafts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDraftListQuery {
    /// Optional status filter.
    pub status: Option<ActionDraftStatus>,
    /// Optional action type filter.
    pub action_type: Option<ActionType>,
    /// Page size.
    pub limit: usize,
    /// Page offset.
    pub offset: usize,
}

impl Default for ActionDraftListQuery {
    fn default() -> Self {
        Self {
            status: None,
            action_type: None,
            limit: 50,
            offset: 0,
        }
    }
}

/// Everything one terminal draft decision writes.
///
/// Adapters store the draft, the entities and the event in a single unit of
/// work; nothing is written when the drafted guard fails.
#[derive(Debug, Clone, Copy)]
pub struct DraftDecisionWrite<'a> {
    /// Approved or rejected draft.
    pub draft: &'a ActionDraft,
    /// Entities materialized by an approval. Empty for rejections.
    pub entities: &'a [NewEntityRecord],
    /// Subject recorded as the entities' creator.
    pub created_by: &'a str,
    /// Success event of the decision.
    pub event: &'a CopilotEvent,
}

/// Draft store port. Drafts are never deleted.
#[async_trait]
pub trait ActionDraftRepository: Send + Sync {
    /// Persists a new draft together with its planning event.
    async fn create_draft(&self, draft: &ActionDraft, event: &CopilotEvent) -> AppResult<()>;

    /// Finds one draft in the company scope.
    async fn find_draft(
        &self,
        tenant_id: TenantId,
        draft_id: ActionDraftId,
    ) -> AppResult<Option<ActionDraft>>;

    /// Lists drafts newest first.
    async fn list_drafts(
        &self,
        tenant_id: TenantId,
        query: ActionDraftListQuery,
    ) -> AppResult<Vec<ActionDraft>>;

    /// Stores a terminal decision only while the stored draft is still drafted.
    ///
    /// Returns `false`, having written nothing, when another writer already
    /// decided the draft.
    async fn save_decision(&self, decision: DraftDecisionWrite<'_>) -> AppResult<bool>;

    /// Appends one feedback row together with its event.
    async fn append_feedback(&self, feedback: &ActionFeedback, event: &CopilotEvent) -> AppResult<()>;

    /// Lists feedback for a draft oldest first.
    async fn list_feedback(
        &self,
        tenant_id: TenantId,
        draft_id: ActionDraftId,
    ) -> AppResult<Vec<ActionFeedback>>;
}
