//! Static dispatch from action type to the converter that materializes an
//! approved draft.
//!
//! Converters validate the whole payload before returning anything. The registry
//! turns the prepared bodies into records with fixed ids and idempotency keys
//! derived from the draft id; the draft decision writes them in its own unit of
//! work, so a failed validation or a lost decision never leaves entities behind.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use procura_core::{AppError, AppResult, TenantId};
use procura_domain::{ActionDraft, ActionDraftId, ActionType, EntityKind, EntityReference};
use serde_json::Value;
use uuid::Uuid;

use crate::{EntityStore, NewEntityRecord};

mod converters;
mod schemas;

pub use converters::default_converters;

/// Inputs available to a converter.
pub struct ConversionContext<'a> {
    /// Owning company.
    pub tenant_id: TenantId,
    /// Draft being converted.
    pub draft_id: ActionDraftId,
    /// Draft payload.
    pub payload: &'a Value,
    /// Read access to existing entities.
    pub entity_store: &'a dyn EntityStore,
}

/// Validated entity body produced by a converter.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedEntity {
    /// Kind to create.
    pub entity_kind: EntityKind,
    /// Entity body.
    pub data: Value,
}

/// Turns one action type's payload into entities.
#[async_trait]
pub trait ActionConverter: Send + Sync {
    /// Action type handled by this converter.
    fn action_type(&self) -> ActionType;

    /// Validates the payload and prepares entities, primary first. Must not write.
    async fn prepare(&self, context: &ConversionContext<'_>) -> AppResult<Vec<PreparedEntity>>;
}

/// Entities produced by one conversion, primary first. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutcome {
    entities: Vec<EntityReference>,
}

impl ConversionOutcome {
    /// Wraps a non-empty reference list.
    pub fn new(entities: Vec<EntityReference>) -> AppResult<Self> {
        if entities.is_empty() {
            return Err(AppError::Internal(
                "conversion produced no entities".to_owned(),
            ));
        }

        Ok(Self { entities })
    }

    /// Returns the primary entity.
    #[must_use]
    pub fn primary(&self) -> &EntityReference {
        &self.entities[0]
    }

    /// Returns every produced entity.
    #[must_use]
    pub fn entities(&self) -> &[EntityReference] {
        &self.entities
    }
}

/// Records to write for one approval, with the references they will carry.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedConversion {
    records: Vec<NewEntityRecord>,
    outcome: ConversionOutcome,
}

impl PreparedConversion {
    /// Returns the records in creation order.
    #[must_use]
    pub fn records(&self) -> &[NewEntityRecord] {
        &self.records
    }

    /// Returns the references the records will be stored under.
    #[must_use]
    pub fn outcome(&self) -> &ConversionOutcome {
        &self.outcome
    }
}

/// Registry with exactly one converter per action type.
#[derive(Clone)]
pub struct ConversionRegistry {
    converters: HashMap<ActionType, Arc<dyn ActionConverter>>,
    entity_store: Arc<dyn EntityStore>,
}

impl ConversionRegistry {
    /// Builds a registry, failing unless every action type has exactly one converter.
    pub fn new(
        entity_store: Arc<dyn EntityStore>,
        converters: Vec<Arc<dyn ActionConverter>>,
    ) -> AppResult<Self> {
        let mut by_type: HashMap<ActionType, Arc<dyn ActionConverter>> = HashMap::new();
        for converter in converters {
            let action_type = converter.action_type();
            if by_type.insert(action_type, converter).is_some() {
                return Err(AppError::Internal(format!(
                    "duplicate converter registered for action type '{}'",
                    action_type.as_str()
                )));
            }
        }

        let missing: Vec<&str> = ActionType::all()
            .iter()
            .filter(|action_type| !by_type.contains_key(action_type))
            .map(ActionType::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(AppError::Internal(format!(
                "no converter registered for action types: {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            converters: by_type,
            entity_store,
        })
    }

    /// Builds a registry with the built-in converters.
    pub fn with_default_converters(entity_store: Arc<dyn EntityStore>) -> AppResult<Self> {
        Self::new(entity_store, default_converters())
    }

    /// Prepares the entities of an approved draft without writing them.
    ///
    /// Validation failures carry `draft_payload_invalid`.
    pub async fn prepare(&self, draft: &ActionDraft) -> AppResult<PreparedConversion> {
        let converter = self.converters.get(&draft.action_type()).ok_or_else(|| {
            AppError::Internal(format!(
                "no converter registered for action type '{}'",
                draft.action_type().as_str()
            ))
        })?;

        let context = ConversionContext {
            tenant_id: draft.tenant_id(),
            draft_id: draft.draft_id(),
            payload: &draft.output().payload,
            entity_store: self.entity_store.as_ref(),
        };

        let prepared = converter.prepare(&context).await.map_err(|error| {
            if matches!(error.category(), AppError::Validation(_)) {
                error.with_code("draft_payload_invalid")
            } else {
                error
            }
        })?;
        if prepared.is_empty() {
            return Err(AppError::Internal(format!(
                "converter for '{}' prepared no entities",
                draft.action_type().as_str()
            )));
        }

        let records = prepared
            .into_iter()
            .enumerate()
            .map(|(position, entity)| NewEntityRecord {
                record_id: Uuid::new_v4(),
                entity_kind: entity.entity_kind,
                idempotency_key: format!("action_draft:{}:{position}", draft.draft_id()),
                data: entity.data,
            })
            .collect::<Vec<_>>();
        let references = records
            .iter()
            .map(NewEntityRecord::reference)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PreparedConversion {
            records,
            outcome: ConversionOutcome::new(references)?,
        })
    }
}
