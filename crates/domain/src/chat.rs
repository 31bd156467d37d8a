use chrono::{DateTime, Utc};
use procura_core::{AppError, AppResult, NonEmptyString, TenantId};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

/// Longest accepted user message in characters.
pub const CHAT_MESSAGE_MAX_LENGTH: usize = 8_000;

/// Author role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    /// End user.
    User,
    /// AI service reply, possibly carrying tool calls.
    Assistant,
    /// Tool result or guided resolution.
    Tool,
    /// System note.
    System,
}

impl ChatRole {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
            Self::System => "system",
        }
    }

    /// Parses storage value.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "tool" => Ok(Self::Tool),
            "system" => Ok(Self::System),
            _ => Err(AppError::Validation(format!("unknown chat role '{value}'"))),
        }
    }
}

/// Read-only workspace tools the AI service may call mid-conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceTool {
    /// Search requests for quotation.
    SearchRfqs,
    /// Search supplier quotes.
    SearchQuotes,
    /// Search suppliers.
    SearchSuppliers,
    /// Search purchase orders.
    SearchPurchaseOrders,
    /// Search invoices.
    SearchInvoices,
}

impl WorkspaceTool {
    /// Returns the tool name used on the wire.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SearchRfqs => "search_rfqs",
            Self::SearchQuotes => "search_quotes",
            Self::SearchSuppliers => "search_suppliers",
            Self::SearchPurchaseOrders => "search_purchase_orders",
            Self::SearchInvoices => "search_invoices",
        }
    }

    /// Parses a wire tool name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "search_rfqs" => Some(Self::SearchRfqs),
            "search_quotes" => Some(Self::SearchQuotes),
            "search_suppliers" => Some(Self::SearchSuppliers),
            "search_purchase_orders" => Some(Self::SearchPurchaseOrders),
            "search_invoices" => Some(Self::SearchInvoices),
            _ => None,
        }
    }

    /// Returns the workspace record kind this tool searches.
    #[must_use]
    pub fn record_kind(&self) -> &'static str {
        match self {
            Self::SearchRfqs => "rfq",
            Self::SearchQuotes => "quote",
            Self::SearchSuppliers => "supplier",
            Self::SearchPurchaseOrders => "purchase_order",
            Self::SearchInvoices => "invoice",
        }
    }
}

/// Tool invocation requested by the AI service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Service-assigned call identifier echoed in the result.
    pub call_id: String,
    /// Requested tool name.
    pub tool_name: String,
    /// Tool arguments.
    #[serde(default)]
    pub arguments: Value,
}

/// Result status of a single tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolResultStatus {
    /// Tool ran and returned data.
    Ok,
    /// Tool failed or is unknown.
    Error,
    /// Batch failed; output is a guided resolution.
    Fallback,
}

impl ToolResultStatus {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
            Self::Fallback => "fallback",
        }
    }
}

/// Result of one tool call returned to the AI service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Call identifier from the request.
    pub call_id: String,
    /// Tool name from the request.
    pub tool_name: String,
    /// Result status.
    pub status: ToolResultStatus,
    /// Tool output.
    pub output: Value,
}

impl ToolResult {
    /// Builds an error result for one call.
    #[must_use]
    pub fn error(call: &ToolCall, message: impl Into<String>) -> Self {
        Self {
            call_id: call.call_id.clone(),
            tool_name: call.tool_name.clone(),
            status: ToolResultStatus::Error,
            output: json!({ "error": message.into() }),
        }
    }
}

/// Optional link offered at the end of a guided resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallToAction {
    /// Button label.
    pub label: String,
    /// Relative link into the web client.
    pub href: String,
}

/// Human-readable fallback substituted when a tool batch fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidedResolution {
    /// Short heading.
    pub title: String,
    /// Explanation of what went wrong.
    pub description: String,
    /// Ordered manual steps.
    pub steps: Vec<String>,
    /// Optional next action.
    pub call_to_action: Option<CallToAction>,
}

impl GuidedResolution {
    /// Returns the fallback used when workspace tools are unavailable.
    #[must_use]
    pub fn workspace_tools_unavailable(tool_names: &[String]) -> Self {
        let subject = if tool_names.is_empty() {
            "workspace data".to_owned()
        } else {
            tool_names.join(", ")
        };

        Self {
            title: "Workspace data is temporarily unavailable".to_owned(),
            description: format!(
                "The assistant could not read {subject} right now, so this answer is based on the conversation only."
            ),
            steps: vec![
                "Open the relevant list in the workspace and apply the filters you need.".to_owned(),
                "Share the record numbers you want to discuss in this conversation.".to_owned(),
                "Ask the question again in a few minutes.".to_owned(),
            ],
            call_to_action: Some(CallToAction {
                label: "Open workspace".to_owned(),
                href: "/app".to_owned(),
            }),
        }
    }

    /// Validates that every user-facing part is populated.
    pub fn validate(&self) -> AppResult<()> {
        if self.title.trim().is_empty()
            || self.description.trim().is_empty()
            || self.steps.is_empty()
            || self.steps.iter().any(|step| step.trim().is_empty())
        {
            return Err(AppError::Validation(
                "guided resolution requires a title, description and steps".to_owned(),
            ));
        }

        Ok(())
    }

    /// Wraps this resolution as the single tool result of a failed batch.
    #[must_use]
    pub fn into_tool_result(self, call_id: impl Into<String>) -> ToolResult {
        ToolResult {
            call_id: call_id.into(),
            tool_name: "guided_resolution".to_owned(),
            status: ToolResultStatus::Fallback,
            output: json!({ "guided_resolution": self }),
        }
    }
}

/// Conversation owned by a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatThread {
    /// Thread identifier.
    pub thread_id: Uuid,
    /// Owning company.
    pub tenant_id: TenantId,
    /// Creating subject.
    pub created_by: String,
    /// Display title.
    pub title: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl ChatThread {
    /// Creates a thread with a validated title.
    pub fn new(
        tenant_id: TenantId,
        created_by: &str,
        title: Option<String>,
        created_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        let created_by = NonEmptyString::new(created_by)?;
        let title = title
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "New conversation".to_owned());

        Ok(Self {
            thread_id: Uuid::new_v4(),
            tenant_id,
            created_by: created_by.into(),
            title,
            created_at,
        })
    }
}

/// One durable entry of a conversation trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message identifier.
    pub message_id: Uuid,
    /// Parent thread.
    pub thread_id: Uuid,
    /// Owning company.
    pub tenant_id: TenantId,
    /// Author role.
    pub role: ChatRole,
    /// Text content.
    pub content: String,
    /// Tool calls requested by an assistant message.
    pub tool_calls: Vec<ToolCall>,
    /// Tool result carried by a tool message.
    pub tool_result: Option<ToolResult>,
    /// Acting subject for the request that produced this message.
    pub actor: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Creates a validated user message.
    pub fn user(thread: &ChatThread, actor: &str, content: &str, at: DateTime<Utc>) -> AppResult<Self> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("message content must not be empty".to_owned()));
        }
        if content.chars().count() > CHAT_MESSAGE_MAX_LENGTH {
            return Err(AppError::Validation(format!(
                "message content must be at most {CHAT_MESSAGE_MAX_LENGTH} characters"
            )));
        }

        Ok(Self::build(thread, ChatRole::User, actor, content.to_owned(), at))
    }

    /// Creates an assistant message, optionally carrying tool calls.
    #[must_use]
    pub fn assistant(
        thread: &ChatThread,
        actor: &str,
        content: String,
        tool_calls: Vec<ToolCall>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            tool_calls,
            ..Self::build(thread, ChatRole::Assistant, actor, content, at)
        }
    }

    /// Creates a tool message carrying one result.
    #[must_use]
    pub fn tool(thread: &ChatThread, actor: &str, result: ToolResult, at: DateTime<Utc>) -> Self {
        let content = format!("{} {}", result.tool_name, result.status.as_str());
        Self {
            tool_result: Some(result),
            ..Self::build(thread, ChatRole::Tool, actor, content, at)
        }
    }

    fn build(
        thread: &ChatThread,
        role: ChatRole,
        actor: &str,
        content: String,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            thread_id: thread.thread_id,
            tenant_id: thread.tenant_id,
            role,
            content,
            tool_calls: Vec::new(),
            tool_result: None,
            actor: actor.to_owned(),
            created_at: at,
        }
    }
}
