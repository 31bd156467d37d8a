use super::*;

#[async_trait]
impl ChatRepository for InMemoryCopilotRepository {
    async fn create_thread(&self, thread: &ChatThread) -> AppResult<()> {
        let mut threads = self.threads.write().await;
        if threads.contains_key(&thread.thread_id) {
            return Err(AppError::Conflict(format!(
                "chat thread '{}' already exists",
                thread.thread_id
            )));
        }

        threads.insert(thread.thread_id, thread.clone());
        Ok(())
    }

    async fn find_thread(
        &self,
        tenant_id: TenantId,
        thread_id: Uuid,
    ) -> AppResult<Option<ChatThread>> {
        Ok(self
            .threads
            .read()
            .await
            .get(&thread_id)
            .filter(|thread| thread.tenant_id == tenant_id)
            .cloned())
    }

    async fn append_message(&self, message: &ChatMessage) -> AppResult<()> {
        let known = self
            .threads
            .read()
            .await
            .get(&message.thread_id)
            .is_some_and(|thread| thread.tenant_id == message.tenant_id);
        if !known {
            return Err(AppError::NotFound(format!(
                "chat thread '{}' does not exist",
                message.thread_id
            )));
        }

        self.messages.write().await.push(message.clone());
        Ok(())
    }

    async fn list_messages(
        &self,
        tenant_id: TenantId,
        thread_id: Uuid,
        limit: usize,
    ) -> AppResult<Vec<ChatMessage>> {
        let messages = self.messages.read().await;
        let mut newest: Vec<ChatMessage> = messages
            .iter()
            .rev()
            .filter(|message| message.tenant_id == tenant_id && message.thread_id == thread_id)
            .take(limit)
            .cloned()
            .collect();
        newest.reverse();

        Ok(newest)
    }
}
