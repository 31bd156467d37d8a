use std::sync::Arc;

use procura_application::{CopilotFacade, CopilotPorts, DecisionLeaseCoordinator};
use procura_core::AppError;
use procura_infrastructure::{
    HttpCopilotServiceClient, InMemoryDecisionLeaseCoordinator, PostgresActionDraftRepository,
    PostgresAuditRepository, PostgresAuthorizationRepository, PostgresChatRepository,
    PostgresCopilotEventRepository, PostgresCopilotWorkflowRepository,
    PostgresEntitlementRepository, PostgresEntityStore, PostgresRateLimitRepository,
    RedisDecisionLeaseCoordinator,
};
use sqlx::PgPool;
use tracing::{info, warn};

use crate::api_config::ApiConfig;
use crate::state::AppState;

use super::redis::build_redis_client;

const LEASE_KEY_PREFIX: &str = "procura:copilot:lease";

pub fn build_app_state(pool: PgPool, config: &ApiConfig) -> Result<AppState, AppError> {
    let ai_client = HttpCopilotServiceClient::new(
        reqwest::Client::new(),
        config.copilot_service_settings(),
    );
    if !ai_client.is_enabled() {
        warn!("COPILOT_SERVICE_BASE_URL or COPILOT_SERVICE_SECRET unset, AI calls are disabled");
    }

    let entity_store = Arc::new(PostgresEntityStore::new(pool.clone()));
    let ports = CopilotPorts {
        audit: Arc::new(PostgresAuditRepository::new(pool.clone())),
        authorization: Arc::new(PostgresAuthorizationRepository::new(pool.clone())),
        entitlements: Arc::new(PostgresEntitlementRepository::new(pool.clone())),
        rate_limits: Arc::new(PostgresRateLimitRepository::new(pool.clone())),
        drafts: Arc::new(PostgresActionDraftRepository::new(pool.clone())),
        workflows: Arc::new(PostgresCopilotWorkflowRepository::new(pool.clone())),
        events: Arc::new(PostgresCopilotEventRepository::new(pool.clone())),
        chats: Arc::new(PostgresChatRepository::new(pool)),
        entity_store: entity_store.clone(),
        workspace_tools: entity_store,
        leases: build_lease_coordinator(config)?,
        ai_client: Arc::new(ai_client),
    };

    Ok(AppState {
        copilot: CopilotFacade::new(ports, config.copilot_settings())?,
        frontend_url: config.frontend_url.clone(),
    })
}

fn build_lease_coordinator(
    config: &ApiConfig,
) -> Result<Arc<dyn DecisionLeaseCoordinator>, AppError> {
    match config.redis_url.as_deref() {
        Some(redis_url) => {
            info!("decision leases use redis");
            Ok(Arc::new(RedisDecisionLeaseCoordinator::new(
                build_redis_client(redis_url)?,
                LEASE_KEY_PREFIX,
            )))
        }
        None => {
            info!("decision leases are held in process");
            Ok(Arc::new(InMemoryDecisionLeaseCoordinator::new()))
        }
    }
}
