use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

use procura_application::EntitlementRepository;
use procura_core::{AppError, AppResult, TenantId};
use procura_domain::FeatureKey;

/// PostgreSQL-backed company feature overrides and plan fields.
#[derive(Clone)]
pub struct PostgresEntitlementRepository {
    pool: PgPool,
}

impl PostgresEntitlementRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Stores or replaces a company override.
    pub async fn set_feature_override(
        &self,
        tenant_id: TenantId,
        feature: FeatureKey,
        value: Value,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO company_feature_flags (tenant_id, feature_key, value)
            VALUES ($1, $2, $3)
            ON CONFLICT (tenant_id, feature_key)
            DO UPDATE SET value = EXCLUDED.value, updated_at = now()
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(feature.as_str())
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to store feature override: {error}")))?;

        Ok(())
    }

    async fn find_value(
        &self,
        table_query: &'static str,
        tenant_id: TenantId,
        feature: FeatureKey,
    ) -> AppResult<Option<Value>> {
        sqlx::query_scalar::<_, Value>(table_query)
            .bind(tenant_id.as_uuid())
            .bind(feature.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to read entitlement '{}': {error}",
                    feature.as_str()
                ))
            })
    }
}

#[async_trait]
impl EntitlementRepository for PostgresEntitlementRepository {
    async fn find_feature_override(
        &self,
        tenant_id: TenantId,
        feature: FeatureKey,
    ) -> AppResult<Option<Value>> {
        self.find_value(
            "SELECT value FROM company_feature_flags WHERE tenant_id = $1 AND feature_key = $2",
            tenant_id,
            feature,
        )
        .await
    }

    async fn find_plan_feature(
        &self,
        tenant_id: TenantId,
        feature: FeatureKey,
    ) -> AppResult<Option<Value>> {
        self.find_value(
            "SELECT value FROM company_plan_features WHERE tenant_id = $1 AND feature_key = $2",
            tenant_id,
            feature,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use procura_application::EntitlementRepository;
    use procura_core::TenantId;
    use procura_domain::FeatureKey;
    use serde_json::json;

    use super::PostgresEntitlementRepository;
    use crate::postgres_test_support::test_pool;

    #[tokio::test]
    async fn overrides_are_replaced_and_plans_stay_separate() {
        let Some(pool) = test_pool().await else {
            return;
        };
        let repository = PostgresEntitlementRepository::new(pool);
        let tenant_id = TenantId::new();

        assert!(
            repository
                .set_feature_override(tenant_id, FeatureKey::AiChatEnabled, json!(true))
                .await
                .is_ok()
        );
        assert!(
            repository
                .set_feature_override(tenant_id, FeatureKey::AiChatEnabled, json!("off"))
                .await
                .is_ok()
        );

        let stored = repository
            .find_feature_override(tenant_id, FeatureKey::AiChatEnabled)
            .await
            .unwrap_or_default();
        assert_eq!(stored, Some(json!("off")));

        let plan = repository
            .find_plan_feature(tenant_id, FeatureKey::AiChatEnabled)
            .await
            .unwrap_or_default();
        assert_eq!(plan, None);
    }
}
