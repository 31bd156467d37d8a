use procura_application::ChatExchange;
use procura_domain::{ChatMessage, ChatThread, ToolCall, ToolResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

/// Incoming payload for opening a chat thread.
#[derive(Debug, Default, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/create-chat-thread-request.ts"
)]
pub struct CreateChatThreadRequest {
    pub title: Option<String>,
}

/// Incoming user message.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/send-chat-message-request.ts"
)]
pub struct SendChatMessageRequest {
    pub content: String,
}

/// API representation of a chat thread.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/chat-thread-response.ts"
)]
pub struct ChatThreadResponse {
    pub thread_id: String,
    pub title: String,
    pub created_by: String,
    pub created_at: String,
}

impl From<ChatThread> for ChatThreadResponse {
    fn from(value: ChatThread) -> Self {
        Self {
            thread_id: value.thread_id.to_string(),
            title: value.title,
            created_by: value.created_by,
            created_at: value.created_at.to_rfc3339(),
        }
    }
}

/// Tool call requested by the assistant.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/tool-call-response.ts"
)]
pub struct ToolCallResponse {
    pub call_id: String,
    pub tool_name: String,
    #[ts(type = "Record<string, unknown>")]
    pub arguments: Value,
}

impl From<ToolCall> for ToolCallResponse {
    fn from(value: ToolCall) -> Self {
        Self {
            call_id: value.call_id,
            tool_name: value.tool_name,
            arguments: value.arguments,
        }
    }
}

/// Result of one tool call or a guided resolution.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/tool-result-response.ts"
)]
pub struct ToolResultResponse {
    pub call_id: String,
    pub tool_name: String,
    pub status: String,
    #[ts(type = "Record<string, unknown>")]
    pub output: Value,
}

impl From<ToolResult> for ToolResultResponse {
    fn from(value: ToolResult) -> Self {
        Self {
            call_id: value.call_id,
            tool_name: value.tool_name,
            status: value.status.as_str().to_owned(),
            output: value.output,
        }
    }
}

/// API representation of a chat message.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/chat-message-response.ts"
)]
pub struct ChatMessageResponse {
    pub message_id: String,
    pub thread_id: String,
    pub role: String,
    pub content: String,
    pub tool_calls: Vec<ToolCallResponse>,
    pub tool_result: Option<ToolResultResponse>,
    pub actor: String,
    pub created_at: String,
}

impl From<ChatMessage> for ChatMessageResponse {
    fn from(value: ChatMessage) -> Self {
        Self {
            message_id: value.message_id.to_string(),
            thread_id: value.thread_id.to_string(),
            role: value.role.as_str().to_owned(),
            content: value.content,
            tool_calls: value
                .tool_calls
                .into_iter()
                .map(ToolCallResponse::from)
                .collect(),
            tool_result: value.tool_result.map(ToolResultResponse::from),
            actor: value.actor,
            created_at: value.created_at.to_rfc3339(),
        }
    }
}

/// Messages appended while answering one user message.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/chat-exchange-response.ts"
)]
pub struct ChatExchangeResponse {
    pub thread: ChatThreadResponse,
    pub messages: Vec<ChatMessageResponse>,
    pub tool_rounds: u32,
}

impl From<ChatExchange> for ChatExchangeResponse {
    fn from(value: ChatExchange) -> Self {
        Self {
            thread: ChatThreadResponse::from(value.thread),
            messages: value
                .messages
                .into_iter()
                .map(ChatMessageResponse::from)
                .collect(),
            tool_rounds: value.tool_rounds,
        }
    }
}
