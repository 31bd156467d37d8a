use std::sync::Arc;
use std::time::Duration;

use procura_core::{AppError, AppResult, TenantId};
use procura_domain::{GuidedResolution, ToolCall, ToolResult, ToolResultStatus, WorkspaceTool};
use serde_json::{Value, json};
use tracing::warn;

use crate::{WorkspaceSearch, WorkspaceToolProvider};

/// Default and maximum number of records a search tool returns.
pub const TOOL_RESULT_LIMIT_DEFAULT: usize = 10;
const TOOL_RESULT_LIMIT_MAX: usize = 50;

/// Result of a tool batch as seen by the conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolBatchOutcome {
    /// Every call produced a result, in call order.
    Resolved(Vec<ToolResult>),
    /// The batch failed and was replaced by one guided resolution.
    Fallback {
        /// Synthetic tool result carrying the guided resolution.
        result: ToolResult,
        /// Code of the failure that triggered the fallback.
        reason_code: &'static str,
    },
}

impl ToolBatchOutcome {
    /// Returns the tool results to append to the trail and send back.
    #[must_use]
    pub fn results(&self) -> Vec<ToolResult> {
        match self {
            Self::Resolved(results) => results.clone(),
            Self::Fallback { result, .. } => vec![result.clone()],
        }
    }

    /// Returns whether the batch fell back to guidance.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Executes read-only workspace tool calls under a bounded timeout.
#[derive(Clone)]
pub struct ToolResolver {
    provider: Arc<dyn WorkspaceToolProvider>,
    timeout: Duration,
}

impl ToolResolver {
    /// Creates a resolver with a batch timeout.
    #[must_use]
    pub fn new(provider: Arc<dyn WorkspaceToolProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Resolves every call against company data.
    ///
    /// Unknown tools yield an error result for that call only. A provider error
    /// or the timeout fails the whole batch.
    pub async fn resolve_batch(
        &self,
        tenant_id: TenantId,
        calls: &[ToolCall],
    ) -> AppResult<Vec<ToolResult>> {
        tokio::time::timeout(self.timeout, self.run_batch(tenant_id, calls))
            .await
            .map_err(|_| {
                AppError::ServiceUnavailable(format!(
                    "tool batch exceeded {} ms",
                    self.timeout.as_millis()
                ))
                .with_code("tool_batch_timeout")
            })?
    }

    /// Resolves the batch or substitutes a guided resolution on failure.
    pub async fn resolve_or_guide(&self, tenant_id: TenantId, calls: &[ToolCall]) -> ToolBatchOutcome {
        match self.resolve_batch(tenant_id, calls).await {
            Ok(results) => ToolBatchOutcome::Resolved(results),
            Err(error) => {
                warn!(
                    tenant_id = %tenant_id,
                    calls = calls.len(),
                    error = %error,
                    "tool batch failed, returning guided resolution"
                );
                let tool_names: Vec<String> =
                    calls.iter().map(|call| call.tool_name.clone()).collect();
                let call_id = calls
                    .first()
                    .map(|call| call.call_id.clone())
                    .unwrap_or_else(|| "guided_resolution".to_owned());

                ToolBatchOutcome::Fallback {
                    result: GuidedResolution::workspace_tools_unavailable(&tool_names)
                        .into_tool_result(call_id),
                    reason_code: error.code(),
                }
            }
        }
    }

    async fn run_batch(&self, tenant_id: TenantId, calls: &[ToolCall]) -> AppResult<Vec<ToolResult>> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            let Some(tool) = WorkspaceTool::parse(&call.tool_name) else {
                results.push(ToolResult::error(
                    call,
                    format!("unknown tool '{}'", call.tool_name),
                ));
                continue;
            };

            let records = self
                .provider
                .search_records(tenant_id, search_for(tool, &call.arguments))
                .await?;
            results.push(ToolResult {
                call_id: call.call_id.clone(),
                tool_name: call.tool_name.clone(),
                status: ToolResultStatus::Ok,
                output: json!({
                    "record_kind": tool.record_kind(),
                    "count": records.len(),
                    "records": records,
                }),
            });
        }

        Ok(results)
    }
}

fn search_for(tool: WorkspaceTool, arguments: &Value) -> WorkspaceSearch {
    let text = arguments
        .get("query")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned);
    let limit = arguments
        .get("limit")
        .and_then(Value::as_u64)
        .and_then(|value| usize::try_from(value).ok())
        .unwrap_or(TOOL_RESULT_LIMIT_DEFAULT)
        .clamp(1, TOOL_RESULT_LIMIT_MAX);

    WorkspaceSearch {
        record_kind: tool.record_kind().to_owned(),
        text,
        limit,
    }
}
