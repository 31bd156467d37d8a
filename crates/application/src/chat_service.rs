//! Copilot conversations with bounded tool round-trips.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use procura_core::{ActorContext, AppError, AppResult, TenantId};
use procura_domain::{
    ChatMessage, ChatThread, EntityKind, EntityReference, EventFeature, FeatureKey, ToolResult,
};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::copilot_context::company_context;
use crate::{
    ChatReply, ChatRepository, ChatRequest, CopilotServiceContext, EventRecord, RateLimitRule,
    ToolBatchOutcome, ToolResolver,
};

/// Maximum tool batches resolved for one user message.
pub const MAX_TOOL_ROUNDS: u32 = 3;
/// Number of trailing messages sent to the AI service as history.
pub const CHAT_HISTORY_WINDOW: usize = 50;
const MESSAGE_PAGE_MAX: usize = 200;

/// Messages appended while answering one user message.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatExchange {
    /// Thread the exchange belongs to.
    pub thread: ChatThread,
    /// Appended messages in order: user, then assistant and tool messages.
    pub messages: Vec<ChatMessage>,
    /// Number of tool batches resolved.
    pub tool_rounds: u32,
}

impl ChatExchange {
    /// Returns the final assistant message.
    #[must_use]
    pub fn reply(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }
}

/// Thread management and message exchange with the AI service.
#[derive(Clone)]
pub struct ChatService {
    context: CopilotServiceContext,
    repository: Arc<dyn ChatRepository>,
    tools: ToolResolver,
    rate_limit_rule: RateLimitRule,
}

impl ChatService {
    /// Creates the chat service.
    #[must_use]
    pub fn new(
        context: CopilotServiceContext,
        repository: Arc<dyn ChatRepository>,
        tools: ToolResolver,
        rate_limit_rule: RateLimitRule,
    ) -> Self {
        Self {
            context,
            repository,
            tools,
            rate_limit_rule,
        }
    }

    /// Opens a new thread in the actor's company.
    pub async fn create_thread(
        &self,
        actor: &ActorContext,
        title: Option<String>,
    ) -> AppResult<ChatThread> {
        let tenant_id = self.check_access(actor).await?;
        let thread = ChatThread::new(tenant_id, actor.subject(), title, Utc::now())?;
        self.repository.create_thread(&thread).await?;

        Ok(thread)
    }

    /// Returns the newest `limit` messages of a thread in chronological order.
    pub async fn list_messages(
        &self,
        actor: &ActorContext,
        thread_id: Uuid,
        limit: usize,
    ) -> AppResult<Vec<ChatMessage>> {
        let tenant_id = actor.require_company()?;
        self.context.gate.require_chat(actor).await?;
        let thread = self.load_thread(tenant_id, thread_id).await?;

        self.repository
            .list_messages(
                thread.tenant_id,
                thread.thread_id,
                limit.clamp(1, MESSAGE_PAGE_MAX),
            )
            .await
    }

    /// Appends a user message and drives the conversation to a final reply.
    ///
    /// Each AI call records `chat_response`. Every tool batch is answered with
    /// tool messages and records `tools_resolved` or `tools_fallback`. After
    /// [`MAX_TOOL_ROUNDS`] batches further tool requests are dropped and the
    /// reply text is kept. An AI service failure propagates; messages already
    /// appended stay in the trail.
    pub async fn send_message(
        &self,
        actor: &ActorContext,
        thread_id: Uuid,
        content: &str,
    ) -> AppResult<ChatExchange> {
        let tenant_id = self.check_access(actor).await?;
        let thread = self.load_thread(tenant_id, thread_id).await?;
        self.context
            .rate_limits
            .check_actor(&self.rate_limit_rule, tenant_id, actor)
            .await?;

        let user_message = ChatMessage::user(&thread, actor.subject(), content, Utc::now())?;
        self.repository.append_message(&user_message).await?;

        let mut history = self
            .repository
            .list_messages(tenant_id, thread_id, CHAT_HISTORY_WINDOW)
            .await?;
        let mut appended = vec![user_message];
        let mut tool_results: Vec<ToolResult> = Vec::new();
        let mut tool_rounds = 0;

        loop {
            let reply = self
                .ask(actor, &thread, &history, std::mem::take(&mut tool_results), tool_rounds)
                .await?;

            if reply.tool_calls.is_empty() || tool_rounds >= MAX_TOOL_ROUNDS {
                if !reply.tool_calls.is_empty() {
                    warn!(
                        thread_id = %thread_id,
                        dropped_calls = reply.tool_calls.len(),
                        "tool round limit reached, dropping further tool calls"
                    );
                }
                let message =
                    ChatMessage::assistant(&thread, actor.subject(), reply.content, Vec::new(), Utc::now());
                self.repository.append_message(&message).await?;
                appended.push(message);
                break;
            }

            tool_rounds += 1;
            let calls = reply.tool_calls;
            let assistant = ChatMessage::assistant(
                &thread,
                actor.subject(),
                reply.content,
                calls.clone(),
                Utc::now(),
            );
            self.repository.append_message(&assistant).await?;
            history.push(assistant.clone());
            appended.push(assistant);

            let started = Instant::now();
            let outcome = self.tools.resolve_or_guide(tenant_id, &calls).await;
            let results = outcome.results();
            for result in &results {
                let message = ChatMessage::tool(&thread, actor.subject(), result.clone(), Utc::now());
                self.repository.append_message(&message).await?;
                history.push(message.clone());
                appended.push(message);
            }
            self.record_tool_batch(actor, &thread, tool_rounds, calls.len(), &outcome, started)
                .await?;
            tool_results = results;
        }

        info!(
            thread_id = %thread_id,
            tool_rounds,
            appended = appended.len(),
            "answered copilot chat message"
        );

        Ok(ChatExchange {
            thread,
            messages: appended,
            tool_rounds,
        })
    }

    async fn ask(
        &self,
        actor: &ActorContext,
        thread: &ChatThread,
        history: &[ChatMessage],
        tool_results: Vec<ToolResult>,
        round: u32,
    ) -> AppResult<ChatReply> {
        let request_payload = json!({
            "thread_id": thread.thread_id,
            "round": round,
            "history": history.len(),
            "tool_results": tool_results.len(),
        });
        let started = Instant::now();
        let reply = match self
            .context
            .ai_client
            .chat(ChatRequest {
                thread_id: thread.thread_id,
                messages: history.to_vec(),
                tool_results,
                company_context: company_context(actor, thread.tenant_id),
            })
            .await
        {
            Ok(reply) => reply,
            Err(error) => {
                return Err(self
                    .context
                    .events
                    .record_failure(
                        thread.tenant_id,
                        actor.subject(),
                        EventFeature::ChatResponse,
                        request_payload,
                        error,
                        started,
                    )
                    .await);
            }
        };

        self.context
            .events
            .record(
                thread.tenant_id,
                actor.subject(),
                EventRecord::success(
                    EventFeature::ChatResponse,
                    request_payload,
                    json!({
                        "tool_calls": reply.tool_calls.len(),
                        "content_length": reply.content.chars().count(),
                    }),
                    started,
                )
                .with_entity(thread_reference(thread)?),
            )
            .await?;

        Ok(reply)
    }

    async fn record_tool_batch(
        &self,
        actor: &ActorContext,
        thread: &ChatThread,
        round: u32,
        call_count: usize,
        outcome: &ToolBatchOutcome,
        started: Instant,
    ) -> AppResult<()> {
        let request_payload = json!({
            "thread_id": thread.thread_id,
            "round": round,
            "calls": call_count,
        });
        let record = match outcome {
            ToolBatchOutcome::Resolved(results) => EventRecord::success(
                EventFeature::ToolsResolved,
                request_payload,
                json!({
                    "results": results
                        .iter()
                        .map(|result| json!({
                            "call_id": result.call_id,
                            "tool_name": result.tool_name,
                            "status": result.status.as_str(),
                        }))
                        .collect::<Vec<_>>(),
                }),
                started,
            ),
            ToolBatchOutcome::Fallback { result, reason_code } => EventRecord::success(
                EventFeature::ToolsFallback,
                request_payload,
                json!({
                    "reason_code": reason_code,
                    "call_id": result.call_id,
                }),
                started,
            ),
        };

        self.context
            .events
            .record(
                thread.tenant_id,
                actor.subject(),
                record.with_entity(thread_reference(thread)?),
            )
            .await?;
        Ok(())
    }

    async fn check_access(&self, actor: &ActorContext) -> AppResult<TenantId> {
        let tenant_id = actor.require_company()?;
        self.context.gate.require_chat(actor).await?;
        self.context
            .entitlements
            .require_feature(actor, tenant_id, FeatureKey::AiChatEnabled)
            .await?;
        Ok(tenant_id)
    }

    async fn load_thread(&self, tenant_id: TenantId, thread_id: Uuid) -> AppResult<ChatThread> {
        self.repository
            .find_thread(tenant_id, thread_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("chat thread '{thread_id}' does not exist")))
    }
}

fn thread_reference(thread: &ChatThread) -> AppResult<EntityReference> {
    EntityReference::new(EntityKind::ChatThread, thread.thread_id.to_string())
}
