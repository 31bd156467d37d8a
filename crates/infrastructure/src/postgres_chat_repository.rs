use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use procura_application::ChatRepository;
use procura_core::{AppError, AppResult, TenantId};
use procura_domain::{ChatMessage, ChatRole, ChatThread, ToolCall, ToolResult};

use crate::postgres_action_draft_repository::page_value;

/// PostgreSQL-backed chat threads and message trails.
#[derive(Clone)]
pub struct PostgresChatRepository {
    pool: PgPool,
}

impl PostgresChatRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ThreadRow {
    thread_id: Uuid,
    tenant_id: Uuid,
    created_by: String,
    title: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct MessageRow {
    message_id: Uuid,
    thread_id: Uuid,
    tenant_id: Uuid,
    role: String,
    content: String,
    tool_calls: Json<Vec<ToolCall>>,
    tool_result: Option<Json<ToolResult>>,
    actor: String,
    created_at: DateTime<Utc>,
}

impl MessageRow {
    fn into_message(self) -> AppResult<ChatMessage> {
        Ok(ChatMessage {
            message_id: self.message_id,
            thread_id: self.thread_id,
            tenant_id: TenantId::from_uuid(self.tenant_id),
            role: ChatRole::parse(self.role.as_str())?,
            content: self.content,
            tool_calls: self.tool_calls.0,
            tool_result: self.tool_result.map(|result| result.0),
            actor: self.actor,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl ChatRepository for PostgresChatRepository {
    async fn create_thread(&self, thread: &ChatThread) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO copilot_chat_threads (thread_id, tenant_id, created_by, title, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(thread.thread_id)
        .bind(thread.tenant_id.as_uuid())
        .bind(thread.created_by.as_str())
        .bind(thread.title.as_str())
        .bind(thread.created_at)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to create chat thread: {error}")))?;

        Ok(())
    }

    async fn find_thread(
        &self,
        tenant_id: TenantId,
        thread_id: Uuid,
    ) -> AppResult<Option<ChatThread>> {
        let row = sqlx::query_as::<_, ThreadRow>(
            r#"
            SELECT thread_id, tenant_id, created_by, title, created_at
            FROM copilot_chat_threads
            WHERE tenant_id = $1 AND thread_id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(thread_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find chat thread '{thread_id}': {error}"))
        })?;

        Ok(row.map(|row| ChatThread {
            thread_id: row.thread_id,
            tenant_id: TenantId::from_uuid(row.tenant_id),
            created_by: row.created_by,
            title: row.title,
            created_at: row.created_at,
        }))
    }

    async fn append_message(&self, message: &ChatMessage) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO copilot_chat_messages (
                message_id, thread_id, tenant_id, role, content,
                tool_calls, tool_result, actor, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(message.message_id)
        .bind(message.thread_id)
        .bind(message.tenant_id.as_uuid())
        .bind(message.role.as_str())
        .bind(message.content.as_str())
        .bind(Json(&message.tool_calls))
        .bind(message.tool_result.as_ref().map(Json))
        .bind(message.actor.as_str())
        .bind(message.created_at)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to append {} message to thread '{}': {error}",
                message.role.as_str(),
                message.thread_id
            ))
        })?;

        Ok(())
    }

    async fn list_messages(
        &self,
        tenant_id: TenantId,
        thread_id: Uuid,
        limit: usize,
    ) -> AppResult<Vec<ChatMessage>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT message_id, thread_id, tenant_id, role, content,
                   tool_calls, tool_result, actor, created_at
            FROM (
                SELECT *
                FROM copilot_chat_messages
                WHERE tenant_id = $1 AND thread_id = $2
                ORDER BY sequence DESC
                LIMIT $3
            ) AS newest
            ORDER BY sequence ASC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(thread_id)
        .bind(page_value(limit)?)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list messages of thread '{thread_id}': {error}"
            ))
        })?;

        rows.into_iter().map(MessageRow::into_message).collect()
    }
}
