use async_trait::async_trait;
use procura_core::{AppResult, TenantId};
use procura_domain::{ChatMessage, ChatThread};
use uuid::Uuid;

/// Durable conversation trail port.
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Persists a new thread.
    async fn create_thread(&self, thread: &ChatThread) -> AppResult<()>;

    /// Finds one thread in the company scope.
    async fn find_thread(&self, tenant_id: TenantId, thread_id: Uuid)
    -> AppResult<Option<ChatThread>>;

    /// Appends one message.
    async fn append_message(&self, message: &ChatMessage) -> AppResult<()>;

    /// Lists the newest `limit` messages in chronological order.
    async fn list_messages(
        &self,
        tenant_id: TenantId,
        thread_id: Uuid,
        limit: usize,
    ) -> AppResult<Vec<ChatMessage>>;
}
