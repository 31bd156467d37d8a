//! In-process fakes shared by the application service tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use procura_core::{AppError, AppResult, TenantId};
use procura_domain::{
    ActionDraft, ActionDraftId, ActionDraftStatus, ActionFeedback, ChatMessage, ChatThread,
    CopilotEvent, EntityReference, EventCount, EventQuery, FeatureKey, Permission,
    StepApprovalState, Workflow, WorkflowId, WorkflowStatus, WorkflowStep,
};
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    ActionDraftListQuery, ActionDraftRepository, AttemptInfo, AuditEvent, AuditRepository,
    AuthorizationRepository, ChatReply, ChatRepository, ChatRequest, CompleteWorkflowStepRequest,
    CompletedWorkflowStep, CopilotEventRepository, CopilotServiceClient, CopilotServiceContext,
    CopilotWorkflowRepository, DecisionLease, DecisionLeaseCoordinator, DraftDecisionWrite,
    DraftedWorkflowStep, EntitlementDefaults, EntitlementRepository, EntitlementService, EntityStore, EventRecorder,
    NewEntityRecord, PermissionGate, PlanActionRequest, PlanWorkflowRequest, PlannedAction,
    PlannedWorkflow, RateLimitRepository, RateLimitService, WorkflowListQuery, WorkspaceSearch,
    WorkspaceToolProvider,
};

#[derive(Default)]
pub(crate) struct FakeAuditRepository {
    pub(crate) events: Mutex<Vec<AuditEvent>>,
}

#[async_trait]
impl AuditRepository for FakeAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        self.events.lock().await.push(event);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeAuthorizationRepository {
    pub(crate) grants: HashMap<(TenantId, String), Vec<Permission>>,
    pub(crate) fail: bool,
}

impl FakeAuthorizationRepository {
    pub(crate) fn granting(tenant_id: TenantId, subject: &str, permissions: &[Permission]) -> Self {
        Self {
            grants: HashMap::from([((tenant_id, subject.to_owned()), permissions.to_vec())]),
            fail: false,
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            grants: HashMap::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl AuthorizationRepository for FakeAuthorizationRepository {
    async fn list_permissions_for_subject(
        &self,
        tenant_id: TenantId,
        subject: &str,
    ) -> AppResult<Vec<Permission>> {
        if self.fail {
            return Err(AppError::Internal("grant store offline".to_owned()));
        }

        Ok(self
            .grants
            .get(&(tenant_id, subject.to_owned()))
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub(crate) struct FakeEntitlementRepository {
    pub(crate) overrides: HashMap<(TenantId, FeatureKey), Value>,
    pub(crate) plans: HashMap<(TenantId, FeatureKey), Value>,
}

#[async_trait]
impl EntitlementRepository for FakeEntitlementRepository {
    async fn find_feature_override(
        &self,
        tenant_id: TenantId,
        feature: FeatureKey,
    ) -> AppResult<Option<Value>> {
        Ok(self.overrides.get(&(tenant_id, feature)).cloned())
    }

    async fn find_plan_feature(
        &self,
        tenant_id: TenantId,
        feature: FeatureKey,
    ) -> AppResult<Option<Value>> {
        Ok(self.plans.get(&(tenant_id, feature)).cloned())
    }
}

#[derive(Default)]
pub(crate) struct FakeRateLimitRepository {
    attempts: Mutex<HashMap<String, (i32, DateTime<Utc>)>>,
}

impl FakeRateLimitRepository {
    pub(crate) async fn keys(&self) -> Vec<String> {
        self.attempts.lock().await.keys().cloned().collect()
    }
}

#[async_trait]
impl RateLimitRepository for FakeRateLimitRepository {
    async fn record_attempt(
        &self,
        key: &str,
        _window_duration_seconds: i64,
    ) -> AppResult<AttemptInfo> {
        let mut attempts = self.attempts.lock().await;
        let entry = attempts.entry(key.to_owned()).or_insert((0, Utc::now()));
        entry.0 += 1;

        Ok(AttemptInfo {
            attempt_count: entry.0,
            window_started_at: entry.1,
        })
    }

    async fn cleanup_expired(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let mut attempts = self.attempts.lock().await;
        let initial = attempts.len();
        attempts.retain(|_, (_, started_at)| *started_at >= before);
        Ok(u64::try_from(initial - attempts.len()).unwrap_or(u64::MAX))
    }
}

#[derive(Default)]
pub(crate) struct FakeEventRepository {
    pub(crate) events: Mutex<Vec<CopilotEvent>>,
}

#[async_trait]
impl CopilotEventRepository for FakeEventRepository {
    async fn append_event(&self, event: &CopilotEvent) -> AppResult<()> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }

    async fn list_events(&self, query: &EventQuery) -> AppResult<Vec<CopilotEvent>> {
        let events = self.events.lock().await;
        Ok(events
            .iter()
            .rev()
            .filter(|event| query.matches(event))
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn summarize_events(&self, query: &EventQuery) -> AppResult<Vec<EventCount>> {
        let events = self.events.lock().await;
        let mut counts: Vec<EventCount> = Vec::new();
        for event in events.iter().filter(|event| query.matches(event)) {
            match counts
                .iter_mut()
                .find(|count| count.feature == event.feature && count.status == event.status)
            {
                Some(count) => count.count += 1,
                None => counts.push(EventCount {
                    feature: event.feature,
                    status: event.status,
                    count: 1,
                }),
            }
        }

        Ok(counts)
    }
}

#[derive(Default)]
pub(crate) struct FakeLeaseCoordinator {
    held: Mutex<HashMap<String, String>>,
    pub(crate) released: Mutex<Vec<String>>,
}

impl FakeLeaseCoordinator {
    /// Marks a scope as owned by someone else.
    pub(crate) async fn hold(&self, scope_key: &str) {
        self.held
            .lock()
            .await
            .insert(scope_key.to_owned(), "other-holder".to_owned());
    }

    pub(crate) async fn held_scopes(&self) -> Vec<String> {
        self.held.lock().await.keys().cloned().collect()
    }
}

#[async_trait]
impl DecisionLeaseCoordinator for FakeLeaseCoordinator {
    async fn try_acquire_lease(
        &self,
        scope_key: &str,
        holder_id: &str,
        _lease_seconds: u32,
    ) -> AppResult<Option<DecisionLease>> {
        let mut held = self.held.lock().await;
        if held.contains_key(scope_key) {
            return Ok(None);
        }

        let token = Uuid::new_v4().to_string();
        held.insert(scope_key.to_owned(), token.clone());
        Ok(Some(DecisionLease {
            scope_key: scope_key.to_owned(),
            token,
            holder_id: holder_id.to_owned(),
        }))
    }

    async fn release_lease(&self, lease: &DecisionLease) -> AppResult<()> {
        let mut held = self.held.lock().await;
        if held.get(&lease.scope_key) == Some(&lease.token) {
            held.remove(&lease.scope_key);
        }
        self.released.lock().await.push(lease.scope_key.clone());
        Ok(())
    }
}

fn offline_store() -> AppError {
    AppError::Internal("copilot store offline".to_owned())
}

/// Draft store sharing the event log and entity store of the harness.
///
/// `fail_writes` fails every transition write before anything is stored;
/// `lose_decisions` makes the drafted guard fail as if another writer won.
#[derive(Default)]
pub(crate) struct FakeDraftRepository {
    pub(crate) drafts: Mutex<HashMap<ActionDraftId, ActionDraft>>,
    pub(crate) feedback: Mutex<Vec<ActionFeedback>>,
    pub(crate) events: Arc<FakeEventRepository>,
    pub(crate) store: Arc<FakeEntityStore>,
    pub(crate) fail_writes: AtomicBool,
    pub(crate) lose_decisions: AtomicBool,
}

impl FakeDraftRepository {
    pub(crate) fn sharing(events: Arc<FakeEventRepository>, store: Arc<FakeEntityStore>) -> Self {
        Self {
            events,
            store,
            ..Self::default()
        }
    }

    fn check_writable(&self) -> AppResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(offline_store());
        }
        Ok(())
    }
}

#[async_trait]
impl ActionDraftRepository for FakeDraftRepository {
    async fn create_draft(&self, draft: &ActionDraft, event: &CopilotEvent) -> AppResult<()> {
        self.check_writable()?;
        self.drafts
            .lock()
            .await
            .insert(draft.draft_id(), draft.clone());
        self.events.events.lock().await.push(event.clone());
        Ok(())
    }

    async fn find_draft(
        &self,
        tenant_id: TenantId,
        draft_id: ActionDraftId,
    ) -> AppResult<Option<ActionDraft>> {
        Ok(self
            .drafts
            .lock()
            .await
            .get(&draft_id)
            .filter(|draft| draft.tenant_id() == tenant_id)
            .cloned())
    }

    async fn list_drafts(
        &self,
        tenant_id: TenantId,
        query: ActionDraftListQuery,
    ) -> AppResult<Vec<ActionDraft>> {
        let drafts = self.drafts.lock().await;
        let mut matching: Vec<ActionDraft> = drafts
            .values()
            .filter(|draft| draft.tenant_id() == tenant_id)
            .filter(|draft| query.status.is_none_or(|status| draft.status() == status))
            .filter(|draft| {
                query
                    .action_type
                    .is_none_or(|action_type| draft.action_type() == action_type)
            })
            .cloned()
            .collect();
        matching.sort_by_key(|draft| std::cmp::Reverse(draft.created_at()));

        Ok(matching
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect())
    }

    async fn save_decision(&self, decision: DraftDecisionWrite<'_>) -> AppResult<bool> {
        self.check_writable()?;
        let draft = decision.draft;
        let mut drafts = self.drafts.lock().await;
        match drafts.get(&draft.draft_id()) {
            Some(stored)
                if stored.status() == ActionDraftStatus::Drafted
                    && !self.lose_decisions.load(Ordering::SeqCst) => {}
            Some(_) => return Ok(false),
            None => {
                return Err(AppError::NotFound(format!(
                    "action draft '{}' does not exist",
                    draft.draft_id()
                )));
            }
        }

        self.store
            .insert(draft.tenant_id(), decision.entities)
            .await?;
        drafts.insert(draft.draft_id(), draft.clone());
        self.events.events.lock().await.push(decision.event.clone());
        Ok(true)
    }

    async fn append_feedback(&self, feedback: &ActionFeedback, event: &CopilotEvent) -> AppResult<()> {
        self.check_writable()?;
        self.feedback.lock().await.push(feedback.clone());
        self.events.events.lock().await.push(event.clone());
        Ok(())
    }

    async fn list_feedback(
        &self,
        tenant_id: TenantId,
        draft_id: ActionDraftId,
    ) -> AppResult<Vec<ActionFeedback>> {
        Ok(self
            .feedback
            .lock()
            .await
            .iter()
            .filter(|feedback| feedback.tenant_id() == tenant_id && feedback.draft_id() == draft_id)
            .cloned()
            .collect())
    }
}

/// Workflow store sharing the event log of the harness.
#[derive(Default)]
pub(crate) struct FakeWorkflowRepository {
    pub(crate) workflows: Mutex<HashMap<(TenantId, String), Workflow>>,
    pub(crate) steps: Mutex<HashMap<(TenantId, String, u32), WorkflowStep>>,
    pub(crate) events: Arc<FakeEventRepository>,
    pub(crate) fail_writes: AtomicBool,
}

impl FakeWorkflowRepository {
    pub(crate) fn sharing(events: Arc<FakeEventRepository>) -> Self {
        Self {
            events,
            ..Self::default()
        }
    }

    fn check_writable(&self) -> AppResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(offline_store());
        }
        Ok(())
    }

    async fn append_events(&self, events: &[CopilotEvent]) {
        self.events.events.lock().await.extend_from_slice(events);
    }

    pub(crate) async fn stored_workflow(&self, tenant_id: TenantId, workflow_id: &str) -> Option<Workflow> {
        self.workflows
            .lock()
            .await
            .get(&(tenant_id, workflow_id.to_owned()))
            .cloned()
    }

    pub(crate) async fn stored_step(
        &self,
        tenant_id: TenantId,
        workflow_id: &str,
        step_index: u32,
    ) -> Option<WorkflowStep> {
        self.steps
            .lock()
            .await
            .get(&(tenant_id, workflow_id.to_owned(), step_index))
            .cloned()
    }
}

#[async_trait]
impl CopilotWorkflowRepository for FakeWorkflowRepository {
    async fn create_workflow(
        &self,
        workflow: &Workflow,
        steps: &[WorkflowStep],
        event: &CopilotEvent,
    ) -> AppResult<()> {
        self.check_writable()?;
        let key = (workflow.tenant_id(), workflow.workflow_id().as_str().to_owned());
        let mut workflows = self.workflows.lock().await;
        if workflows.contains_key(&key) {
            return Err(AppError::Conflict(format!(
                "workflow '{}' already exists",
                workflow.workflow_id()
            )));
        }
        workflows.insert(key, workflow.clone());

        let mut stored_steps = self.steps.lock().await;
        for step in steps {
            stored_steps.insert(
                (
                    workflow.tenant_id(),
                    workflow.workflow_id().as_str().to_owned(),
                    step.step_index(),
                ),
                step.clone(),
            );
        }
        self.append_events(std::slice::from_ref(event)).await;
        Ok(())
    }

    async fn find_workflow(
        &self,
        tenant_id: TenantId,
        workflow_id: &WorkflowId,
    ) -> AppResult<Option<Workflow>> {
        Ok(self.stored_workflow(tenant_id, workflow_id.as_str()).await)
    }

    async fn list_workflows(
        &self,
        tenant_id: TenantId,
        query: WorkflowListQuery,
    ) -> AppResult<Vec<Workflow>> {
        let workflows = self.workflows.lock().await;
        let mut matching: Vec<Workflow> = workflows
            .values()
            .filter(|workflow| workflow.tenant_id() == tenant_id)
            .filter(|workflow| query.status.is_none_or(|status| workflow.status() == status))
            .cloned()
            .collect();
        matching.sort_by_key(|workflow| std::cmp::Reverse(workflow.created_at()));

        Ok(matching
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect())
    }

    async fn list_steps(
        &self,
        tenant_id: TenantId,
        workflow_id: &WorkflowId,
    ) -> AppResult<Vec<WorkflowStep>> {
        let steps = self.steps.lock().await;
        let mut matching: Vec<WorkflowStep> = steps
            .iter()
            .filter(|((stored_tenant, stored_id, _), _)| {
                *stored_tenant == tenant_id && stored_id == workflow_id.as_str()
            })
            .map(|(_, step)| step.clone())
            .collect();
        matching.sort_by_key(WorkflowStep::step_index);
        Ok(matching)
    }

    async fn find_step(
        &self,
        tenant_id: TenantId,
        workflow_id: &WorkflowId,
        step_index: u32,
    ) -> AppResult<Option<WorkflowStep>> {
        Ok(self
            .stored_step(tenant_id, workflow_id.as_str(), step_index)
            .await)
    }

    async fn save_step_draft(
        &self,
        workflow: &Workflow,
        step: &WorkflowStep,
        event: &CopilotEvent,
    ) -> AppResult<bool> {
        self.check_writable()?;
        let key = (workflow.tenant_id(), workflow.workflow_id().as_str().to_owned());
        let step_key = (key.0, key.1.clone(), step.step_index());
        let mut workflows = self.workflows.lock().await;
        let mut steps = self.steps.lock().await;

        let on_step = workflows
            .get(&key)
            .is_some_and(|stored| stored.current_step() == step.step_index());
        let pending = steps
            .get(&step_key)
            .is_none_or(|stored| stored.approval_state() == StepApprovalState::Pending);
        if !on_step || !pending {
            return Ok(false);
        }

        workflows.insert(key, workflow.clone());
        steps.insert(step_key, step.clone());
        self.append_events(std::slice::from_ref(event)).await;
        Ok(true)
    }

    async fn apply_step_decision(
        &self,
        expected_current_step: u32,
        workflow: &Workflow,
        step: &WorkflowStep,
        events: &[CopilotEvent],
    ) -> AppResult<bool> {
        self.check_writable()?;
        let key = (workflow.tenant_id(), workflow.workflow_id().as_str().to_owned());
        let step_key = (key.0, key.1.clone(), step.step_index());
        let mut workflows = self.workflows.lock().await;
        let mut steps = self.steps.lock().await;

        let on_step = workflows
            .get(&key)
            .is_some_and(|stored| stored.current_step() == expected_current_step);
        let pending = steps
            .get(&step_key)
            .is_some_and(|stored| stored.approval_state() == StepApprovalState::Pending);
        if !on_step || !pending {
            return Ok(false);
        }

        workflows.insert(key, workflow.clone());
        steps.insert(step_key, step.clone());
        self.append_events(events).await;
        Ok(true)
    }

    async fn update_workflow_status(
        &self,
        expected_status: WorkflowStatus,
        workflow: &Workflow,
        event: &CopilotEvent,
    ) -> AppResult<bool> {
        self.check_writable()?;
        let key = (workflow.tenant_id(), workflow.workflow_id().as_str().to_owned());
        let mut workflows = self.workflows.lock().await;
        match workflows.get(&key) {
            Some(stored) if stored.status() == expected_status => {
                workflows.insert(key, workflow.clone());
                self.append_events(std::slice::from_ref(event)).await;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[derive(Default)]
pub(crate) struct FakeChatRepository {
    pub(crate) threads: Mutex<Vec<ChatThread>>,
    pub(crate) messages: Mutex<Vec<ChatMessage>>,
}

#[async_trait]
impl ChatRepository for FakeChatRepository {
    async fn create_thread(&self, thread: &ChatThread) -> AppResult<()> {
        self.threads.lock().await.push(thread.clone());
        Ok(())
    }

    async fn find_thread(
        &self,
        tenant_id: TenantId,
        thread_id: Uuid,
    ) -> AppResult<Option<ChatThread>> {
        Ok(self
            .threads
            .lock()
            .await
            .iter()
            .find(|thread| thread.tenant_id == tenant_id && thread.thread_id == thread_id)
            .cloned())
    }

    async fn append_message(&self, message: &ChatMessage) -> AppResult<()> {
        self.messages.lock().await.push(message.clone());
        Ok(())
    }

    async fn list_messages(
        &self,
        tenant_id: TenantId,
        thread_id: Uuid,
        limit: usize,
    ) -> AppResult<Vec<ChatMessage>> {
        let messages = self.messages.lock().await;
        let matching: Vec<ChatMessage> = messages
            .iter()
            .filter(|message| message.tenant_id == tenant_id && message.thread_id == thread_id)
            .cloned()
            .collect();
        let skip = matching.len().saturating_sub(limit);
        Ok(matching.into_iter().skip(skip).collect())
    }
}

/// Entity store holding the records written by draft decisions.
#[derive(Default)]
pub(crate) struct FakeEntityStore {
    pub(crate) created: Mutex<HashMap<(TenantId, String), (EntityReference, Value)>>,
    pub(crate) existing: Mutex<HashSet<(TenantId, String)>>,
}

impl FakeEntityStore {
    pub(crate) async fn seed(&self, tenant_id: TenantId, reference: &EntityReference) {
        self.existing
            .lock()
            .await
            .insert((tenant_id, reference.to_string()));
    }

    pub(crate) async fn created_count(&self) -> usize {
        self.created.lock().await.len()
    }

    /// Inserts every record or none; a repeated idempotency key is a conflict.
    pub(crate) async fn insert(&self, tenant_id: TenantId, records: &[NewEntityRecord]) -> AppResult<()> {
        let references = records
            .iter()
            .map(NewEntityRecord::reference)
            .collect::<AppResult<Vec<_>>>()?;
        let mut created = self.created.lock().await;
        let mut existing = self.existing.lock().await;
        if records
            .iter()
            .any(|record| created.contains_key(&(tenant_id, record.idempotency_key.clone())))
        {
            return Err(AppError::Conflict("entity already created".to_owned()));
        }

        for (record, reference) in records.iter().zip(references) {
            existing.insert((tenant_id, reference.to_string()));
            created.insert(
                (tenant_id, record.idempotency_key.clone()),
                (reference, record.data.clone()),
            );
        }
        Ok(())
    }
}

#[async_trait]
impl EntityStore for FakeEntityStore {
    async fn entity_exists(
        &self,
        tenant_id: TenantId,
        reference: &EntityReference,
    ) -> AppResult<bool> {
        Ok(self
            .existing
            .lock()
            .await
            .contains(&(tenant_id, reference.to_string())))
    }
}

#[derive(Default)]
pub(crate) struct FakeToolProvider {
    pub(crate) records: Vec<Value>,
    pub(crate) fail: bool,
    pub(crate) delay: Option<Duration>,
    pub(crate) searches: Mutex<Vec<WorkspaceSearch>>,
}

#[async_trait]
impl WorkspaceToolProvider for FakeToolProvider {
    async fn search_records(
        &self,
        _tenant_id: TenantId,
        search: WorkspaceSearch,
    ) -> AppResult<Vec<Value>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(AppError::Internal("workspace index offline".to_owned()));
        }

        let limit = search.limit;
        self.searches.lock().await.push(search);
        Ok(self.records.iter().take(limit).cloned().collect())
    }
}

/// AI client answering from per-operation queues. An empty queue is an outage.
#[derive(Default)]
pub(crate) struct FakeCopilotClient {
    pub(crate) planned_actions: Mutex<VecDeque<AppResult<PlannedAction>>>,
    pub(crate) planned_workflows: Mutex<VecDeque<AppResult<PlannedWorkflow>>>,
    pub(crate) drafted_steps: Mutex<VecDeque<AppResult<DraftedWorkflowStep>>>,
    pub(crate) completed_steps: Mutex<VecDeque<AppResult<CompletedWorkflowStep>>>,
    pub(crate) chat_replies: Mutex<VecDeque<AppResult<ChatReply>>>,
    pub(crate) calls: Mutex<Vec<&'static str>>,
    pub(crate) completions: Mutex<Vec<CompleteWorkflowStepRequest>>,
    pub(crate) chat_requests: Mutex<Vec<ChatRequest>>,
}

impl FakeCopilotClient {
    pub(crate) async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

fn unscripted(operation: &str) -> AppError {
    AppError::ServiceUnavailable(format!("no scripted reply for {operation}"))
        .with_code("ai_service_unreachable")
}

#[async_trait]
impl CopilotServiceClient for FakeCopilotClient {
    async fn plan_action(&self, _request: PlanActionRequest) -> AppResult<PlannedAction> {
        self.calls.lock().await.push("plan_action");
        self.planned_actions
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(unscripted("plan_action")))
    }

    async fn plan_workflow(&self, _request: PlanWorkflowRequest) -> AppResult<PlannedWorkflow> {
        self.calls.lock().await.push("plan_workflow");
        self.planned_workflows
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(unscripted("plan_workflow")))
    }

    async fn next_workflow_step(&self, _workflow_id: &str) -> AppResult<DraftedWorkflowStep> {
        self.calls.lock().await.push("next_workflow_step");
        self.drafted_steps
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(unscripted("next_workflow_step")))
    }

    async fn complete_workflow_step(
        &self,
        request: CompleteWorkflowStepRequest,
    ) -> AppResult<CompletedWorkflowStep> {
        self.calls.lock().await.push("complete_workflow_step");
        self.completions.lock().await.push(request);
        self.completed_steps
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(unscripted("complete_workflow_step")))
    }

    async fn chat(&self, request: ChatRequest) -> AppResult<ChatReply> {
        self.calls.lock().await.push("chat");
        self.chat_requests.lock().await.push(request);
        self.chat_replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(unscripted("chat")))
    }
}

/// Every fake a copilot service needs, wired with all features enabled.
pub(crate) struct CopilotFakes {
    pub(crate) audit: Arc<FakeAuditRepository>,
    pub(crate) authorization: Arc<FakeAuthorizationRepository>,
    pub(crate) entitlements: Arc<FakeEntitlementRepository>,
    pub(crate) rate_limits: Arc<FakeRateLimitRepository>,
    pub(crate) events: Arc<FakeEventRepository>,
    pub(crate) leases: Arc<FakeLeaseCoordinator>,
    pub(crate) client: Arc<FakeCopilotClient>,
}

impl CopilotFakes {
    pub(crate) fn new() -> Self {
        Self::with_authorization(FakeAuthorizationRepository::default())
    }

    pub(crate) fn with_authorization(authorization: FakeAuthorizationRepository) -> Self {
        Self {
            audit: Arc::new(FakeAuditRepository::default()),
            authorization: Arc::new(authorization),
            entitlements: Arc::new(FakeEntitlementRepository::default()),
            rate_limits: Arc::new(FakeRateLimitRepository::default()),
            events: Arc::new(FakeEventRepository::default()),
            leases: Arc::new(FakeLeaseCoordinator::default()),
            client: Arc::new(FakeCopilotClient::default()),
        }
    }

    pub(crate) fn context(&self) -> CopilotServiceContext {
        self.context_with_defaults(EntitlementDefaults {
            ai_actions_enabled: true,
            ai_workflows_enabled: true,
            ai_chat_enabled: true,
        })
    }

    pub(crate) fn context_with_defaults(&self, defaults: EntitlementDefaults) -> CopilotServiceContext {
        CopilotServiceContext {
            gate: PermissionGate::new(self.authorization.clone(), self.audit.clone()),
            entitlements: EntitlementService::new(
                self.entitlements.clone(),
                self.audit.clone(),
                defaults,
            ),
            rate_limits: RateLimitService::new(self.rate_limits.clone()),
            events: EventRecorder::new(self.events.clone()),
            leases: self.leases.clone(),
            ai_client: self.client.clone(),
            lease_seconds: 30,
        }
    }

    pub(crate) async fn recorded_events(&self) -> Vec<CopilotEvent> {
        self.events.events.lock().await.clone()
    }
}
