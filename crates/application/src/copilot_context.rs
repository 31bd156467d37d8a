use std::future::Future;
use std::sync::Arc;

use procura_core::{ActorContext, AppError, AppResult, TenantId};
use serde_json::{Value, json};
use tracing::warn;
use uuid::Uuid;

use crate::{
    CopilotServiceClient, DecisionLeaseCoordinator, EntitlementService, EventRecorder,
    PermissionGate, RateLimitService,
};

/// Collaborators shared by the draft, workflow and chat services.
#[derive(Clone)]
pub struct CopilotServiceContext {
    /// Permission predicates.
    pub gate: PermissionGate,
    /// Entitlement resolution.
    pub entitlements: EntitlementService,
    /// Request budgets.
    pub rate_limits: RateLimitService,
    /// Event log writer.
    pub events: EventRecorder,
    /// Decision leases.
    pub leases: Arc<dyn DecisionLeaseCoordinator>,
    /// Remote AI service.
    pub ai_client: Arc<dyn CopilotServiceClient>,
    /// Lease duration for draft and workflow decisions.
    pub lease_seconds: u32,
}

impl CopilotServiceContext {
    /// Runs `operation` while holding the decision lease for `scope_key`.
    ///
    /// Contention fails with `busy_code`. The lease is released whatever the
    /// operation returns.
    pub(crate) async fn with_decision_lease<T, F, Fut>(
        &self,
        scope_key: &str,
        actor: &ActorContext,
        busy_code: &'static str,
        operation: F,
    ) -> AppResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let holder_id = format!("{}:{}", actor.subject(), Uuid::new_v4());
        let Some(lease) = self
            .leases
            .try_acquire_lease(scope_key, holder_id.as_str(), self.lease_seconds)
            .await?
        else {
            return Err(AppError::Conflict(format!(
                "another decision on '{scope_key}' is in progress"
            ))
            .with_code(busy_code));
        };

        let result = operation().await;

        if let Err(error) = self.leases.release_lease(&lease).await {
            warn!(scope_key, error = %error, "failed to release decision lease");
        }

        result
    }
}

/// Snapshot of who is asking, sent to the AI service and stored on drafts.
pub(crate) fn company_context(actor: &ActorContext, tenant_id: TenantId) -> Value {
    json!({
        "company_id": tenant_id,
        "subject": actor.subject(),
        "display_name": actor.display_name(),
        "persona": actor.persona(),
    })
}

/// Marks a malformed AI service reply.
pub(crate) fn invalid_service_response(message: impl Into<String>) -> AppError {
    AppError::ServiceUnavailable(message.into()).with_code("ai_service_invalid_response")
}
