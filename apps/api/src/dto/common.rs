use procura_domain::EntityReference;
use serde::Serialize;
use ts_rs::TS;

/// Health response payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/health-response.ts"
)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Typed reference to a procurement entity.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/entity-reference-response.ts"
)]
pub struct EntityReferenceResponse {
    pub entity_kind: String,
    pub entity_id: String,
}

impl From<&EntityReference> for EntityReferenceResponse {
    fn from(value: &EntityReference) -> Self {
        Self {
            entity_kind: value.entity_kind().as_str().to_owned(),
            entity_id: value.entity_id().to_owned(),
        }
    }
}
