use async_trait::async_trait;
use procura_core::{AppResult, TenantId};
use procura_domain::{EntityKind, EntityReference};
use serde_json::Value;
use uuid::Uuid;

/// Entity creation request produced by a converter.
///
/// The record id is assigned up front so the approved draft can reference the
/// entity before anything is written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntityRecord {
    /// Id the entity is stored under.
    pub record_id: Uuid,
    /// Entity kind to create.
    pub entity_kind: EntityKind,
    /// Key unique per company and kind.
    pub idempotency_key: String,
    /// Validated entity body.
    pub data: Value,
}

impl NewEntityRecord {
    /// Returns the reference the record will be stored under.
    pub fn reference(&self) -> AppResult<EntityReference> {
        EntityReference::new(self.entity_kind, self.record_id.to_string())
    }
}

/// Read port onto the procurement entity layer used by converters.
///
/// Entities are written by the draft decision itself, see `DraftDecisionWrite`.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Returns whether an entity exists in the company scope.
    async fn entity_exists(
        &self,
        tenant_id: TenantId,
        reference: &EntityReference,
    ) -> AppResult<bool>;
}

/// Search inputs for a workspace tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceSearch {
    /// Record kind to search, such as `rfq`.
    pub record_kind: String,
    /// Optional case-insensitive text match.
    pub text: Option<String>,
    /// Maximum number of results.
    pub limit: usize,
}

/// Read-only workspace data used by chat tools.
#[async_trait]
pub trait WorkspaceToolProvider: Send + Sync {
    /// Searches records of one kind in the company scope.
    async fn search_records(
        &self,
        tenant_id: TenantId,
        search: WorkspaceSearch,
    ) -> AppResult<Vec<Value>>;
}
