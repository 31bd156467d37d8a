//! HTTP client for the remote copilot AI service.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use procura_application::{
    ChatReply, ChatRequest, CompleteWorkflowStepRequest, CompletedWorkflowStep,
    CopilotServiceClient, DraftedWorkflowStep, PlanActionRequest, PlanWorkflowRequest,
    PlannedAction, PlannedWorkflow,
};
use procura_core::{AppError, AppResult};
use procura_domain::{ActionOutput, WorkflowId};
use reqwest::Url;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

mod wire;

use wire::{
    ActionPlanBody, ChatBody, ChatReplyBody, CompleteStepBody, CompletedStepBody, NextStepBody,
    PlannedActionBody, PlannedWorkflowBody, WorkflowPlanBody,
};

/// Header carrying the shared secret on every request.
pub const COPILOT_SECRET_HEADER: &str = "X-Copilot-Service-Secret";

/// Connection settings for the AI service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopilotServiceSettings {
    /// Base URL. `None` or an unparsable URL disables the client.
    pub base_url: Option<String>,
    /// Shared secret. `None` disables the client.
    pub secret: Option<String>,
    /// Bound on every call.
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
struct Endpoint {
    base_url: Url,
    secret: String,
}

/// reqwest-backed [`CopilotServiceClient`].
#[derive(Debug, Clone)]
pub struct HttpCopilotServiceClient {
    http_client: reqwest::Client,
    endpoint: Option<Endpoint>,
    timeout: Duration,
}

impl HttpCopilotServiceClient {
    /// Creates a client. A missing or unusable URL or a missing secret leave
    /// it disabled.
    #[must_use]
    pub fn new(http_client: reqwest::Client, settings: CopilotServiceSettings) -> Self {
        let endpoint = match (settings.base_url, settings.secret) {
            (Some(base_url), Some(secret))
                if !base_url.trim().is_empty() && !secret.trim().is_empty() =>
            {
                match Url::parse(base_url.trim()) {
                    Ok(base_url) if !base_url.cannot_be_a_base() => {
                        Some(Endpoint { base_url, secret })
                    }
                    _ => {
                        warn!("copilot service URL is not a usable base URL");
                        None
                    }
                }
            }
            _ => None,
        };

        Self {
            http_client,
            endpoint,
            timeout: settings.timeout,
        }
    }

    /// Returns whether both URL and secret are configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Posts to the base URL extended by `segments`, each percent-encoded as
    /// a single path segment.
    async fn post<B, R>(&self, segments: &[&str], body: &B) -> AppResult<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned + Send,
    {
        let endpoint = self.endpoint.as_ref().ok_or_else(|| {
            AppError::ServiceUnavailable("copilot service is not configured".to_owned())
                .with_code("ai_service_disabled")
        })?;
        let url = endpoint_url(&endpoint.base_url, segments)?;
        let path = url.path();
        let started = Instant::now();

        let response = self
            .http_client
            .post(url.clone())
            .header(COPILOT_SECRET_HEADER, endpoint.secret.as_str())
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|error| transport_error(path, &error))?;

        let status = response.status();
        if !status.is_success() {
            warn!(path, status = status.as_u16(), "copilot service rejected request");
            return Err(invalid_response(format!(
                "copilot service returned status {} for {path}",
                status.as_u16()
            )));
        }

        let parsed = response.json::<R>().await.map_err(|error| {
            if error.is_timeout() {
                transport_error(path, &error)
            } else {
                invalid_response(format!("copilot service sent malformed {path} body: {error}"))
            }
        })?;
        debug!(
            path,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "copilot service call completed"
        );

        Ok(parsed)
    }
}

fn endpoint_url(base_url: &Url, segments: &[&str]) -> AppResult<Url> {
    let mut url = base_url.clone();
    url.path_segments_mut()
        .map_err(|()| {
            AppError::ServiceUnavailable("copilot service URL cannot carry a path".to_owned())
                .with_code("ai_service_disabled")
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn transport_error(path: &str, error: &reqwest::Error) -> AppError {
    if error.is_timeout() {
        warn!(path, "copilot service call timed out");
        AppError::ServiceUnavailable(format!("copilot service timed out on {path}"))
            .with_code("ai_service_timeout")
    } else {
        warn!(path, error = %error, "copilot service unreachable");
        AppError::ServiceUnavailable(format!("copilot service unreachable on {path}: {error}"))
            .with_code("ai_service_unreachable")
    }
}

fn invalid_response(message: String) -> AppError {
    AppError::ServiceUnavailable(message).with_code("ai_service_invalid_response")
}

#[async_trait]
impl CopilotServiceClient for HttpCopilotServiceClient {
    async fn plan_action(&self, request: PlanActionRequest) -> AppResult<PlannedAction> {
        let body = ActionPlanBody {
            action_type: request.action_type,
            input: &request.input,
            company_context: &request.company_context,
        };
        let planned: PlannedActionBody = self.post(&["actions", "plan"], &body).await?;
        if planned.action_type != request.action_type {
            return Err(invalid_response(format!(
                "copilot service planned '{}' for a '{}' request",
                planned.action_type.as_str(),
                request.action_type.as_str()
            )));
        }

        let output = ActionOutput {
            summary: planned.summary,
            payload: planned.payload,
            citations: planned.citations,
            warnings: planned.warnings,
            confidence: planned.confidence,
            needs_human_review: planned.needs_human_review,
        };
        output
            .validate()
            .map_err(|error| invalid_response(error.message().to_owned()))?;

        Ok(PlannedAction {
            action_type: planned.action_type,
            output,
        })
    }

    async fn plan_workflow(&self, request: PlanWorkflowRequest) -> AppResult<PlannedWorkflow> {
        let body = WorkflowPlanBody {
            workflow_type: request.workflow_type,
            inputs: &request.inputs,
            company_context: &request.company_context,
        };
        let planned: PlannedWorkflowBody = self.post(&["workflows", "plan"], &body).await?;
        WorkflowId::new(planned.workflow_id.as_str())
            .map_err(|error| invalid_response(error.message().to_owned()))?;

        Ok(PlannedWorkflow {
            workflow_id: planned.workflow_id,
            status: planned.status,
            steps: planned.steps,
        })
    }

    async fn next_workflow_step(&self, workflow_id: &str) -> AppResult<DraftedWorkflowStep> {
        let step: NextStepBody = self
            .post(&["workflows", workflow_id, "next"], &serde_json::json!({}))
            .await?;

        Ok(DraftedWorkflowStep {
            step_index: step.step_index,
            action_type: step.action_type,
            approval_state: step.approval_state,
            required_inputs: step.required_inputs,
            draft_output: step.draft_output,
        })
    }

    async fn complete_workflow_step(
        &self,
        request: CompleteWorkflowStepRequest,
    ) -> AppResult<CompletedWorkflowStep> {
        let body = CompleteStepBody {
            step_index: request.step_index,
            approval: request.approval,
            output: &request.output,
        };
        let completed: CompletedStepBody = self
            .post(&["workflows", request.workflow_id.as_str(), "complete"], &body)
            .await?;

        Ok(CompletedWorkflowStep {
            workflow_status: completed.workflow_status,
            next_step: completed.next_step,
        })
    }

    async fn chat(&self, request: ChatRequest) -> AppResult<ChatReply> {
        let body = ChatBody::from_request(&request);
        let reply: ChatReplyBody = self.post(&["chat"], &body).await?;

        Ok(ChatReply {
            content: reply.content,
            tool_calls: reply.tool_calls,
        })
    }
}
