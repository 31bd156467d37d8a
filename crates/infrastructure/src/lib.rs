//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod http_copilot_service_client;
mod in_memory_copilot_repository;
mod in_memory_decision_lease_coordinator;
mod postgres_action_draft_repository;
mod postgres_audit_repository;
mod postgres_authorization_repository;
mod postgres_chat_repository;
mod postgres_copilot_event_repository;
mod postgres_copilot_workflow_repository;
mod postgres_entitlement_repository;
mod postgres_entity_store;
mod postgres_rate_limit_repository;
mod redis_decision_lease_coordinator;

#[cfg(test)]
mod postgres_test_support;

pub use http_copilot_service_client::{
    COPILOT_SECRET_HEADER, CopilotServiceSettings, HttpCopilotServiceClient,
};
pub use in_memory_copilot_repository::InMemoryCopilotRepository;
pub use in_memory_decision_lease_coordinator::InMemoryDecisionLeaseCoordinator;
pub use postgres_action_draft_repository::PostgresActionDraftRepository;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_authorization_repository::PostgresAuthorizationRepository;
pub use postgres_chat_repository::PostgresChatRepository;
pub use postgres_copilot_event_repository::PostgresCopilotEventRepository;
pub use postgres_copilot_workflow_repository::PostgresCopilotWorkflowRepository;
pub use postgres_entitlement_repository::PostgresEntitlementRepository;
pub use postgres_entity_store::PostgresEntityStore;
pub use postgres_rate_limit_repository::PostgresRateLimitRepository;
pub use redis_decision_lease_coordinator::RedisDecisionLeaseCoordinator;
