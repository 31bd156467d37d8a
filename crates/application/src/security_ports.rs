use async_trait::async_trait;
use procura_core::{AppResult, TenantId};
use procura_domain::{AuditAction, FeatureKey, Permission};
use serde_json::Value;

/// Immutable audit event payload emitted by application services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    /// Tenant scope for the event.
    pub tenant_id: TenantId,
    /// Subject that performed the action.
    pub subject: String,
    /// Stable audit action identifier.
    pub action: AuditAction,
    /// Resource type label.
    pub resource_type: String,
    /// Resource identifier.
    pub resource_id: String,
    /// Optional audit detail payload.
    pub detail: Option<String>,
}

/// Port for persisting append-only audit events.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Persists one audit event.
    async fn append_event(&self, event: AuditEvent) -> AppResult<()>;
}

/// Repository port for explicit permission grants.
#[async_trait]
pub trait AuthorizationRepository: Send + Sync {
    /// Lists explicit grants for a subject in a company. Persona defaults are not included.
    async fn list_permissions_for_subject(
        &self,
        tenant_id: TenantId,
        subject: &str,
    ) -> AppResult<Vec<Permission>>;
}

/// Read-only source of company feature flags and plan fields.
#[async_trait]
pub trait EntitlementRepository: Send + Sync {
    /// Returns the raw per-company override for a feature, if stored.
    async fn find_feature_override(
        &self,
        tenant_id: TenantId,
        feature: FeatureKey,
    ) -> AppResult<Option<Value>>;

    /// Returns the raw plan field for a feature, if the company plan defines it.
    async fn find_plan_feature(
        &self,
        tenant_id: TenantId,
        feature: FeatureKey,
    ) -> AppResult<Option<Value>>;
}
