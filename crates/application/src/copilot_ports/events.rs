use async_trait::async_trait;
use procura_core::AppResult;
use procura_domain::{CopilotEvent, EventCount, EventQuery};

/// Append-only event log port. No update or delete exists.
#[async_trait]
pub trait CopilotEventRepository: Send + Sync {
    /// Appends one event.
    async fn append_event(&self, event: &CopilotEvent) -> AppResult<()>;

    /// Lists matching events newest first.
    async fn list_events(&self, query: &EventQuery) -> AppResult<Vec<CopilotEvent>>;

    /// Counts matching events grouped by feature and status. Paging is ignored.
    async fn summarize_events(&self, query: &EventQuery) -> AppResult<Vec<EventCount>>;
}
