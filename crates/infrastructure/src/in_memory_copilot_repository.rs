use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use procura_application::{
    ActionDraftListQuery, ActionDraftRepository, ChatRepository, CopilotEventRepository,
    CopilotWorkflowRepository, DraftDecisionWrite, EntityStore, WorkflowListQuery,
    WorkspaceSearch, WorkspaceToolProvider,
};
use procura_core::{AppError, AppResult, TenantId};
use procura_domain::{
    ActionDraft, ActionDraftId, ActionDraftStatus, ActionFeedback, ChatMessage, ChatThread,
    CopilotEvent, EntityKind, EntityReference, EventCount, EventQuery, StepApprovalState,
    Workflow, WorkflowId, WorkflowStatus, WorkflowStep,
};
use serde_json::{Value, json};
use tokio::sync::RwLock;
use uuid::Uuid;

mod chat;
mod drafts;
mod entities;
mod events;
mod workflows;

#[derive(Debug, Clone)]
struct StoredRecord {
    record_id: Uuid,
    tenant_id: TenantId,
    entity_kind: EntityKind,
    data: Value,
    created_at: chrono::DateTime<Utc>,
}

/// In-memory copilot storage for local development and tests.
///
/// Implements every storage port of the engine with the same tenant scoping
/// and compare-and-set semantics as the PostgreSQL adapters. Transition writes
/// hold their state locks while appending events, so readers never see one
/// without the other.
#[derive(Debug, Default)]
pub struct InMemoryCopilotRepository {
    drafts: RwLock<HashMap<ActionDraftId, ActionDraft>>,
    feedback: RwLock<Vec<ActionFeedback>>,
    workflows: RwLock<HashMap<String, Workflow>>,
    steps: RwLock<BTreeMap<(String, u32), WorkflowStep>>,
    events: RwLock<Vec<CopilotEvent>>,
    threads: RwLock<HashMap<Uuid, ChatThread>>,
    messages: RwLock<Vec<ChatMessage>>,
    records: RwLock<HashMap<(TenantId, EntityKind, String), StoredRecord>>,
}

impl InMemoryCopilotRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn page<T>(items: Vec<T>, offset: usize, limit: usize) -> Vec<T> {
    items.into_iter().skip(offset).take(limit).collect()
}
