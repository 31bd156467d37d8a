use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use procura_core::{ActorContext, TenantId};
use procura_domain::{
    ActionType, EventFeature, EventStatus, FeatureKey, StepApprovalState, WorkflowId,
    WorkflowStatus, WorkflowStepPlan, WorkflowType,
};
use serde_json::json;

use super::{CompleteStepInput, StartWorkflowInput, WorkflowOrchestrationService};
use crate::test_fakes::{CopilotFakes, FakeEntitlementRepository, FakeWorkflowRepository};
use crate::{
    CompletedWorkflowStep, CopilotRateLimits, DraftedWorkflowStep, EntitlementDefaults,
    PlannedWorkflow, WorkflowListQuery,
};

struct Harness {
    fakes: CopilotFakes,
    workflows: Arc<FakeWorkflowRepository>,
    service: WorkflowOrchestrationService,
}

fn harness_from(fakes: CopilotFakes, defaults: EntitlementDefaults) -> Harness {
    let workflows = Arc::new(FakeWorkflowRepository::sharing(fakes.events.clone()));
    let service = WorkflowOrchestrationService::new(
        fakes.context_with_defaults(defaults),
        workflows.clone(),
        CopilotRateLimits::per_minute(30).workflows,
    );

    Harness {
        fakes,
        workflows,
        service,
    }
}

fn harness() -> Harness {
    harness_from(
        CopilotFakes::new(),
        EntitlementDefaults {
            ai_actions_enabled: true,
            ai_workflows_enabled: true,
            ai_chat_enabled: true,
        },
    )
}

fn actor(tenant_id: TenantId, subject: &str, persona: &str) -> ActorContext {
    ActorContext::new(subject, subject, None, Some(tenant_id)).with_persona(persona)
}

fn workflow_id(value: &str) -> WorkflowId {
    WorkflowId::new(value).unwrap_or_else(|_| unreachable!())
}

async fn script_plan(harness: &Harness, id: &str, steps: &[ActionType]) {
    harness
        .fakes
        .client
        .planned_workflows
        .lock()
        .await
        .push_back(Ok(PlannedWorkflow {
            workflow_id: id.to_owned(),
            status: WorkflowStatus::Pending,
            steps: steps
                .iter()
                .enumerate()
                .map(|(position, action_type)| WorkflowStepPlan {
                    step_index: u32::try_from(position).unwrap_or(u32::MAX),
                    action_type: *action_type,
                    name: None,
                })
                .collect(),
        }));
}

async fn script_draft(harness: &Harness, step_index: u32, action_type: ActionType) {
    harness
        .fakes
        .client
        .drafted_steps
        .lock()
        .await
        .push_back(Ok(DraftedWorkflowStep {
            step_index,
            action_type,
            approval_state: StepApprovalState::Pending,
            required_inputs: json!({"budget": "number"}),
            draft_output: json!({"summary": "drafted"}),
        }));
}

async fn script_completion(harness: &Harness, status: WorkflowStatus, next_step: Option<u32>) {
    harness
        .fakes
        .client
        .completed_steps
        .lock()
        .await
        .push_back(Ok(CompletedWorkflowStep {
            workflow_status: status,
            next_step,
        }));
}

async fn started_procurement(harness: &Harness, admin: &ActorContext) -> WorkflowId {
    script_plan(harness, "wf-proc-1", &[ActionType::RfqDraft, ActionType::PoDraft]).await;
    let started = harness
        .service
        .start(
            admin,
            StartWorkflowInput {
                workflow_type: WorkflowType::Procurement,
                inputs: json!({"category": "bearings"}),
            },
        )
        .await;
    assert!(started.is_ok());
    workflow_id("wf-proc-1")
}

fn approve(step_index: u32) -> CompleteStepInput {
    CompleteStepInput {
        step_index,
        approval: true,
        output: json!({"confirmed": true}),
    }
}

#[tokio::test]
async fn procurement_step_zero_is_approved_and_advances() {
    let harness = harness();
    let tenant_id = TenantId::new();
    let admin = actor(tenant_id, "alice", "buyer_admin");
    let id = started_procurement(&harness, &admin).await;

    script_draft(&harness, 0, ActionType::RfqDraft).await;
    let ready = harness.service.next(&admin, &id).await;
    assert!(matches!(
        ready,
        Ok(ref outcome) if outcome.workflow.status() == WorkflowStatus::InProgress
            && outcome.step.draft_output().is_some()
    ));

    script_completion(&harness, WorkflowStatus::InProgress, Some(1)).await;
    let completed = harness.service.complete(&admin, &id, approve(0)).await;
    assert!(completed.is_ok());

    let workflow = harness.workflows.stored_workflow(tenant_id, "wf-proc-1").await;
    assert_eq!(workflow.map(|workflow| workflow.current_step()), Some(1));
    let step = harness.workflows.stored_step(tenant_id, "wf-proc-1", 0).await;
    assert_eq!(
        step.map(|step| step.approval_state()),
        Some(StepApprovalState::Approved)
    );

    let features: Vec<EventFeature> = harness
        .fakes
        .recorded_events()
        .await
        .iter()
        .map(|event| event.feature)
        .collect();
    assert_eq!(
        features,
        vec![
            EventFeature::WorkflowStart,
            EventFeature::WorkflowStepReady,
            EventFeature::WorkflowStepApproved,
        ]
    );
}

#[tokio::test]
async fn step_ready_event_carries_snapshot() {
    let harness = harness();
    let admin = actor(TenantId::new(), "alice", "buyer_admin");
    let id = started_procurement(&harness, &admin).await;
    script_draft(&harness, 0, ActionType::RfqDraft).await;

    let ready = harness.service.next(&admin, &id).await;
    assert!(ready.is_ok());

    let events = harness.fakes.recorded_events().await;
    let snapshot = events
        .iter()
        .find(|event| event.feature == EventFeature::WorkflowStepReady)
        .and_then(|event| event.response.clone())
        .unwrap_or_default();
    assert_eq!(
        snapshot,
        json!({
            "workflow_id": "wf-proc-1",
            "workflow_type": "procurement",
            "status": "in_progress",
            "current_step": 0,
            "step_index": 0,
            "action_type": "rfq_draft",
        })
    );
}

#[tokio::test]
async fn last_approval_completes_workflow() {
    let harness = harness();
    let tenant_id = TenantId::new();
    let admin = actor(tenant_id, "alice", "buyer_admin");
    let id = started_procurement(&harness, &admin).await;

    for step_index in 0..2 {
        script_draft(&harness, step_index, ActionType::RfqDraft).await;
        assert!(harness.service.next(&admin, &id).await.is_ok());
        let status = if step_index == 1 {
            WorkflowStatus::Completed
        } else {
            WorkflowStatus::InProgress
        };
        script_completion(&harness, status, None).await;
        assert!(harness.service.complete(&admin, &id, approve(step_index)).await.is_ok());
    }

    let workflow = harness.workflows.stored_workflow(tenant_id, "wf-proc-1").await;
    assert_eq!(
        workflow.map(|workflow| workflow.status()),
        Some(WorkflowStatus::Completed)
    );
    let last = harness.fakes.recorded_events().await.pop();
    assert_eq!(last.map(|event| event.feature), Some(EventFeature::WorkflowCompleted));

    let after = harness.service.next(&admin, &id).await;
    assert_eq!(after.err().map(|error| error.code()), Some("workflow_not_active"));
}

#[tokio::test]
async fn disabled_workflows_block_start_without_ai_call() {
    let tenant_id = TenantId::new();
    let fakes = CopilotFakes::new();
    let harness = harness_from(
        CopilotFakes {
            entitlements: Arc::new(FakeEntitlementRepository {
                overrides: HashMap::new(),
                plans: HashMap::from([(
                    (tenant_id, FeatureKey::AiWorkflowsEnabled),
                    json!(false),
                )]),
            }),
            ..fakes
        },
        EntitlementDefaults {
            ai_workflows_enabled: true,
            ..EntitlementDefaults::default()
        },
    );
    let admin = actor(tenant_id, "alice", "buyer_admin");

    let result = harness
        .service
        .start(
            &admin,
            StartWorkflowInput {
                workflow_type: WorkflowType::Procurement,
                inputs: json!({}),
            },
        )
        .await;

    assert_eq!(result.err().map(|error| error.code()), Some("ai_workflows_disabled"));
    assert_eq!(harness.fakes.client.call_count().await, 0);
    assert!(harness.workflows.workflows.lock().await.is_empty());
}

#[tokio::test]
async fn stale_step_index_is_rejected_without_changes() {
    let harness = harness();
    let tenant_id = TenantId::new();
    let admin = actor(tenant_id, "alice", "buyer_admin");
    let id = started_procurement(&harness, &admin).await;
    script_draft(&harness, 0, ActionType::RfqDraft).await;
    assert!(harness.service.next(&admin, &id).await.is_ok());

    let result = harness.service.complete(&admin, &id, approve(1)).await;

    assert_eq!(result.err().map(|error| error.code()), Some("workflow_step_mismatch"));
    let workflow = harness.workflows.stored_workflow(tenant_id, "wf-proc-1").await;
    assert_eq!(workflow.map(|workflow| workflow.current_step()), Some(0));
    assert!(harness.fakes.client.completions.lock().await.is_empty());
}

#[tokio::test]
async fn undrafted_step_cannot_be_completed() {
    let harness = harness();
    let admin = actor(TenantId::new(), "alice", "buyer_admin");
    let id = started_procurement(&harness, &admin).await;

    let result = harness.service.complete(&admin, &id, approve(0)).await;

    assert_eq!(result.err().map(|error| error.code()), Some("workflow_step_not_ready"));
}

#[tokio::test]
async fn rejection_without_next_step_fails_workflow() {
    let harness = harness();
    let tenant_id = TenantId::new();
    let admin = actor(tenant_id, "alice", "buyer_admin");
    let id = started_procurement(&harness, &admin).await;
    script_draft(&harness, 0, ActionType::RfqDraft).await;
    assert!(harness.service.next(&admin, &id).await.is_ok());
    script_completion(&harness, WorkflowStatus::InProgress, None).await;

    let result = harness
        .service
        .complete(
            &admin,
            &id,
            CompleteStepInput {
                step_index: 0,
                approval: false,
                output: json!({"reason": "budget frozen"}),
            },
        )
        .await;

    assert!(matches!(
        result,
        Ok(ref outcome) if outcome.workflow.status() == WorkflowStatus::Failed
            && outcome.workflow.current_step() == 0
            && outcome.step.approval_state() == StepApprovalState::Rejected
    ));
    let completions = harness.fakes.client.completions.lock().await;
    assert_eq!(completions.len(), 1);
    assert!(!completions[0].approval);
}

#[tokio::test]
async fn ai_failure_on_complete_leaves_step_pending() {
    let harness = harness();
    let tenant_id = TenantId::new();
    let admin = actor(tenant_id, "alice", "buyer_admin");
    let id = started_procurement(&harness, &admin).await;
    script_draft(&harness, 0, ActionType::RfqDraft).await;
    assert!(harness.service.next(&admin, &id).await.is_ok());

    let result = harness.service.complete(&admin, &id, approve(0)).await;

    assert_eq!(result.err().map(|error| error.code()), Some("ai_service_unreachable"));
    let step = harness.workflows.stored_step(tenant_id, "wf-proc-1", 0).await;
    assert_eq!(
        step.map(|step| step.approval_state()),
        Some(StepApprovalState::Pending)
    );
    let last = harness.fakes.recorded_events().await.pop();
    assert!(matches!(
        last,
        Some(ref event) if event.feature == EventFeature::WorkflowStepApproved
            && event.status == EventStatus::Error
    ));
    assert!(harness.fakes.leases.held_scopes().await.is_empty());
}

#[tokio::test]
async fn failed_decision_write_leaves_step_pending_without_event() {
    let harness = harness();
    let tenant_id = TenantId::new();
    let admin = actor(tenant_id, "alice", "buyer_admin");
    let id = started_procurement(&harness, &admin).await;
    script_draft(&harness, 0, ActionType::RfqDraft).await;
    assert!(harness.service.next(&admin, &id).await.is_ok());
    script_completion(&harness, WorkflowStatus::InProgress, Some(1)).await;
    harness.workflows.fail_writes.store(true, Ordering::SeqCst);

    let result = harness.service.complete(&admin, &id, approve(0)).await;

    assert!(result.is_err());
    let step = harness.workflows.stored_step(tenant_id, "wf-proc-1", 0).await;
    assert_eq!(
        step.map(|step| step.approval_state()),
        Some(StepApprovalState::Pending)
    );
    let workflow = harness.workflows.stored_workflow(tenant_id, "wf-proc-1").await;
    assert_eq!(workflow.map(|workflow| workflow.current_step()), Some(0));
    let features: Vec<EventFeature> = harness
        .fakes
        .recorded_events()
        .await
        .iter()
        .map(|event| event.feature)
        .collect();
    assert_eq!(
        features,
        vec![EventFeature::WorkflowStart, EventFeature::WorkflowStepReady]
    );

    let cancelled = harness.service.cancel(&admin, &id).await;
    assert!(cancelled.is_err());
    let workflow = harness.workflows.stored_workflow(tenant_id, "wf-proc-1").await;
    assert_eq!(
        workflow.map(|workflow| workflow.status()),
        Some(WorkflowStatus::InProgress)
    );
    assert_eq!(harness.fakes.recorded_events().await.len(), 2);
}

#[tokio::test]
async fn redraft_waits_for_the_workflow_decision_lease() {
    let harness = harness();
    let tenant_id = TenantId::new();
    let admin = actor(tenant_id, "alice", "buyer_admin");
    let id = started_procurement(&harness, &admin).await;
    script_draft(&harness, 0, ActionType::RfqDraft).await;
    assert!(harness.service.next(&admin, &id).await.is_ok());
    let drafted = harness
        .workflows
        .stored_step(tenant_id, "wf-proc-1", 0)
        .await
        .and_then(|step| step.draft_output().cloned());
    harness
        .fakes
        .leases
        .hold(&format!("copilot:workflow:{tenant_id}:wf-proc-1"))
        .await;
    let calls_before = harness.fakes.client.call_count().await;

    let result = harness.service.next(&admin, &id).await;

    assert_eq!(
        result.err().map(|error| error.code()),
        Some("workflow_decision_in_progress")
    );
    assert_eq!(harness.fakes.client.call_count().await, calls_before);
    let stored = harness
        .workflows
        .stored_step(tenant_id, "wf-proc-1", 0)
        .await
        .and_then(|step| step.draft_output().cloned());
    assert_eq!(stored, drafted);
}

#[tokio::test]
async fn next_reply_for_wrong_index_is_invalid() {
    let harness = harness();
    let tenant_id = TenantId::new();
    let admin = actor(tenant_id, "alice", "buyer_admin");
    let id = started_procurement(&harness, &admin).await;
    script_draft(&harness, 3, ActionType::PoDraft).await;

    let result = harness.service.next(&admin, &id).await;

    assert_eq!(
        result.err().map(|error| error.code()),
        Some("ai_service_invalid_response")
    );
    let step = harness.workflows.stored_step(tenant_id, "wf-proc-1", 0).await;
    assert!(matches!(step, Some(ref value) if value.draft_output().is_none()));
}

#[tokio::test]
async fn financial_step_needs_financial_approver() {
    let harness = harness();
    let tenant_id = TenantId::new();
    let finance = actor(tenant_id, "fiona", "finance");
    let admin = actor(tenant_id, "alice", "buyer_admin");
    script_plan(&harness, "wf-pay-1", &[ActionType::ApproveInvoice]).await;
    let started = harness
        .service
        .start(
            &finance,
            StartWorkflowInput {
                workflow_type: WorkflowType::InvoicePayment,
                inputs: json!({"invoice_id": "inv-1"}),
            },
        )
        .await;
    assert!(started.is_ok());
    let id = workflow_id("wf-pay-1");
    script_draft(&harness, 0, ActionType::ApproveInvoice).await;
    assert!(harness.service.next(&admin, &id).await.is_ok());

    let denied = harness.service.complete(&admin, &id, approve(0)).await;
    assert_eq!(
        denied.err().map(|error| error.code()),
        Some("workflow_approval_forbidden")
    );

    script_completion(&harness, WorkflowStatus::Completed, None).await;
    let approved = harness.service.complete(&finance, &id, approve(0)).await;
    assert!(matches!(
        approved,
        Ok(ref outcome) if outcome.workflow.status() == WorkflowStatus::Completed
    ));
}

#[tokio::test]
async fn cancelled_workflow_rejects_further_steps() {
    let harness = harness();
    let tenant_id = TenantId::new();
    let admin = actor(tenant_id, "alice", "buyer_admin");
    let requester = actor(tenant_id, "rob", "buyer_requester");
    let id = started_procurement(&harness, &admin).await;

    let denied = harness.service.cancel(&requester, &id).await;
    assert_eq!(
        denied.err().map(|error| error.code()),
        Some("workflow_approval_forbidden")
    );

    let cancelled = harness.service.cancel(&admin, &id).await;
    assert!(matches!(cancelled, Ok(ref value) if value.status() == WorkflowStatus::Cancelled));

    let next = harness.service.next(&admin, &id).await;
    assert_eq!(next.err().map(|error| error.code()), Some("workflow_not_active"));
    let last = harness.fakes.recorded_events().await.pop();
    assert_eq!(last.map(|event| event.feature), Some(EventFeature::WorkflowCancelled));
}

#[tokio::test]
async fn reads_are_scoped_to_company() {
    let harness = harness();
    let admin = actor(TenantId::new(), "alice", "buyer_admin");
    let outsider = actor(TenantId::new(), "oscar", "buyer_admin");
    let id = started_procurement(&harness, &admin).await;

    let detail = harness.service.get_workflow(&admin, &id).await;
    assert!(matches!(detail, Ok(ref value) if value.steps.len() == 2));

    let hidden = harness.service.get_workflow(&outsider, &id).await;
    assert_eq!(hidden.err().map(|error| error.code()), Some("not_found"));

    let listed = harness
        .service
        .list_workflows(&outsider, WorkflowListQuery::default())
        .await;
    assert!(matches!(listed, Ok(ref values) if values.is_empty()));
}
