use std::sync::Arc;

use procura_core::{ActorContext, AppError, AppResult, TenantId};
use procura_domain::{AuditAction, EntitlementResolution, FeatureKey, resolve_entitlement};
use tracing::debug;

use crate::{AuditEvent, AuditRepository, EntitlementRepository};

/// Global defaults applied when neither an override nor the plan decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntitlementDefaults {
    /// Default for `ai_actions_enabled`.
    pub ai_actions_enabled: bool,
    /// Default for `ai_workflows_enabled`.
    pub ai_workflows_enabled: bool,
    /// Default for `ai_chat_enabled`.
    pub ai_chat_enabled: bool,
}

impl EntitlementDefaults {
    /// Returns the default for one feature.
    #[must_use]
    pub fn for_feature(&self, feature: FeatureKey) -> bool {
        match feature {
            FeatureKey::AiActionsEnabled => self.ai_actions_enabled,
            FeatureKey::AiWorkflowsEnabled => self.ai_workflows_enabled,
            FeatureKey::AiChatEnabled => self.ai_chat_enabled,
        }
    }
}

/// Resolves company entitlements and audits every resolution.
#[derive(Clone)]
pub struct EntitlementService {
    repository: Arc<dyn EntitlementRepository>,
    audit_repository: Arc<dyn AuditRepository>,
    defaults: EntitlementDefaults,
}

impl EntitlementService {
    /// Creates an entitlement service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn EntitlementRepository>,
        audit_repository: Arc<dyn AuditRepository>,
        defaults: EntitlementDefaults,
    ) -> Self {
        Self {
            repository,
            audit_repository,
            defaults,
        }
    }

    /// Resolves one feature and appends an `entitlement.checked` audit event.
    pub async fn resolve(
        &self,
        actor: &ActorContext,
        tenant_id: TenantId,
        feature: FeatureKey,
    ) -> AppResult<EntitlementResolution> {
        let override_value = self
            .repository
            .find_feature_override(tenant_id, feature)
            .await?;
        let plan_value = self.repository.find_plan_feature(tenant_id, feature).await?;

        let resolution = resolve_entitlement(
            feature,
            override_value.as_ref(),
            plan_value.as_ref(),
            self.defaults.for_feature(feature),
        );

        debug!(
            tenant_id = %tenant_id,
            feature = feature.as_str(),
            enabled = resolution.enabled,
            source = resolution.source.as_str(),
            "entitlement resolved"
        );

        self.audit_repository
            .append_event(AuditEvent {
                tenant_id,
                subject: actor.subject().to_owned(),
                action: AuditAction::EntitlementChecked,
                resource_type: "feature".to_owned(),
                resource_id: feature.as_str().to_owned(),
                detail: Some(
                    serde_json::json!({
                        "feature": feature.as_str(),
                        "enabled": resolution.enabled,
                        "source": resolution.source.as_str(),
                        "persona": actor.persona(),
                    })
                    .to_string(),
                ),
            })
            .await?;

        Ok(resolution)
    }

    /// Returns whether the feature is enabled for the company.
    pub async fn feature_enabled(
        &self,
        actor: &ActorContext,
        tenant_id: TenantId,
        feature: FeatureKey,
    ) -> AppResult<bool> {
        Ok(self.resolve(actor, tenant_id, feature).await?.enabled)
    }

    /// Fails with the feature's disabled code unless it is enabled.
    pub async fn require_feature(
        &self,
        actor: &ActorContext,
        tenant_id: TenantId,
        feature: FeatureKey,
    ) -> AppResult<()> {
        if self.feature_enabled(actor, tenant_id, feature).await? {
            return Ok(());
        }

        Err(AppError::EntitlementDenied(format!(
            "feature '{}' is not enabled for company '{tenant_id}'",
            feature.as_str()
        ))
        .with_code(feature.disabled_code()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use procura_core::{ActorContext, TenantId};
    use procura_domain::{AuditAction, EntitlementSource, FeatureKey};
    use serde_json::json;

    use super::{EntitlementDefaults, EntitlementService};
    use crate::test_fakes::{FakeAuditRepository, FakeEntitlementRepository};

    fn actor(tenant_id: TenantId) -> ActorContext {
        ActorContext::new("alice", "Alice", None, Some(tenant_id)).with_persona("buyer_admin")
    }

    #[tokio::test]
    async fn every_resolution_is_audited() {
        let tenant_id = TenantId::new();
        let audit = Arc::new(FakeAuditRepository::default());
        let service = EntitlementService::new(
            Arc::new(FakeEntitlementRepository::default()),
            audit.clone(),
            EntitlementDefaults::default(),
        );

        let first = service
            .feature_enabled(&actor(tenant_id), tenant_id, FeatureKey::AiActionsEnabled)
            .await;
        let second = service
            .feature_enabled(&actor(tenant_id), tenant_id, FeatureKey::AiChatEnabled)
            .await;
        assert!(matches!(first, Ok(false)));
        assert!(matches!(second, Ok(false)));

        let events = audit.events.lock().await;
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|event| event.action == AuditAction::EntitlementChecked));
    }

    #[tokio::test]
    async fn override_beats_disabled_plan() {
        let tenant_id = TenantId::new();
        let repository = FakeEntitlementRepository {
            overrides: HashMap::from([(
                (tenant_id, FeatureKey::AiWorkflowsEnabled),
                json!({"active": true}),
            )]),
            plans: HashMap::from([((tenant_id, FeatureKey::AiWorkflowsEnabled), json!(false))]),
        };
        let service = EntitlementService::new(
            Arc::new(repository),
            Arc::new(FakeAuditRepository::default()),
            EntitlementDefaults::default(),
        );

        let resolution = service
            .resolve(&actor(tenant_id), tenant_id, FeatureKey::AiWorkflowsEnabled)
            .await;
        assert!(matches!(
            resolution,
            Ok(value) if value.enabled && value.source == EntitlementSource::Override
        ));
    }

    #[tokio::test]
    async fn disabled_plan_yields_coded_denial() {
        let tenant_id = TenantId::new();
        let repository = FakeEntitlementRepository {
            overrides: HashMap::new(),
            plans: HashMap::from([((tenant_id, FeatureKey::AiWorkflowsEnabled), json!(false))]),
        };
        let service = EntitlementService::new(
            Arc::new(repository),
            Arc::new(FakeAuditRepository::default()),
            EntitlementDefaults {
                ai_workflows_enabled: true,
                ..EntitlementDefaults::default()
            },
        );

        let result = service
            .require_feature(&actor(tenant_id), tenant_id, FeatureKey::AiWorkflowsEnabled)
            .await;
        assert_eq!(
            result.err().map(|error| error.code()),
            Some("ai_workflows_disabled")
        );
    }
}
