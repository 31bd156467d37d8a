use chrono::Utc;
use procura_application::{CopilotEventRepository, CopilotWorkflowRepository, WorkflowListQuery};
use procura_core::{AppError, TenantId};
use procura_domain::{
    ActionType, EventFeature, EventQuery, NewWorkflow, StepApprovalState, Workflow, WorkflowId,
    WorkflowStatus, WorkflowStep, WorkflowStepPlan, WorkflowType,
};
use serde_json::json;
use uuid::Uuid;

use super::PostgresCopilotWorkflowRepository;
use crate::PostgresCopilotEventRepository;
use crate::postgres_test_support::{test_event, test_pool};

fn planned_workflow(tenant_id: TenantId) -> (Workflow, Vec<WorkflowStep>) {
    let workflow = Workflow::new(
        NewWorkflow {
            workflow_id: WorkflowId::new(format!("wf-{}", Uuid::new_v4()))
                .unwrap_or_else(|_| unreachable!()),
            tenant_id,
            created_by: "buyer-1".to_owned(),
            workflow_type: WorkflowType::Procurement,
            status: WorkflowStatus::Pending,
            inputs: json!({"category": "bearings"}),
            steps: vec![
                WorkflowStepPlan {
                    step_index: 0,
                    action_type: ActionType::RfqDraft,
                    name: Some("Request quotes".to_owned()),
                },
                WorkflowStepPlan {
                    step_index: 1,
                    action_type: ActionType::PoDraft,
                    name: None,
                },
            ],
        },
        Utc::now(),
    )
    .unwrap_or_else(|_| unreachable!());
    let steps = workflow
        .steps()
        .iter()
        .map(|plan| WorkflowStep::planned(workflow.workflow_id(), plan, workflow.created_at()))
        .collect();

    (workflow, steps)
}

#[tokio::test]
async fn step_decision_is_guarded_by_current_step() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresCopilotWorkflowRepository::new(pool.clone());
    let tenant_id = TenantId::new();
    let (workflow, steps) = planned_workflow(tenant_id);
    let started = test_event(tenant_id, EventFeature::WorkflowStart);
    assert!(repository.create_workflow(&workflow, &steps, &started).await.is_ok());

    let now = Utc::now();
    let ready = workflow.mark_step_ready(now);
    let drafted = steps[0]
        .with_draft(ActionType::RfqDraft, json!({}), json!({"title": "Bearings"}), now)
        .unwrap_or_else(|_| unreachable!());
    let step_ready = test_event(tenant_id, EventFeature::WorkflowStepReady);
    assert!(matches!(
        repository.save_step_draft(&ready, &drafted, &step_ready).await,
        Ok(true)
    ));

    let decided = drafted
        .decide(true, "approver-1", json!({"title": "Bearings"}), now)
        .unwrap_or_else(|_| unreachable!());
    let advanced = ready
        .advance(1, WorkflowStatus::InProgress, now)
        .unwrap_or_else(|_| unreachable!());
    let approved = [test_event(tenant_id, EventFeature::WorkflowStepApproved)];
    assert!(matches!(
        repository.apply_step_decision(0, &advanced, &decided, &approved).await,
        Ok(true)
    ));
    let replayed = [test_event(tenant_id, EventFeature::WorkflowStepApproved)];
    assert!(matches!(
        repository.apply_step_decision(0, &advanced, &decided, &replayed).await,
        Ok(false)
    ));
    let recorded = PostgresCopilotEventRepository::new(pool)
        .list_events(&EventQuery {
            tenant_id: Some(tenant_id),
            limit: 10,
            ..EventQuery::default()
        })
        .await
        .unwrap_or_default();
    assert_eq!(recorded.len(), 3);

    let stored = repository
        .find_workflow(tenant_id, workflow.workflow_id())
        .await
        .unwrap_or_default()
        .unwrap_or_else(|| unreachable!());
    assert_eq!(stored.current_step(), 1);
    assert_eq!(stored.status(), WorkflowStatus::InProgress);
    assert_eq!(stored.steps().len(), 2);

    let stored_steps = repository
        .list_steps(tenant_id, workflow.workflow_id())
        .await
        .unwrap_or_default();
    assert_eq!(stored_steps[0].approval_state(), StepApprovalState::Approved);
    assert_eq!(
        stored_steps[0].decision().map(|decision| decision.decided_by.as_str()),
        Some("approver-1")
    );
    assert_eq!(stored_steps[1].approval_state(), StepApprovalState::Pending);

    // A decided step can no longer be redrafted.
    let redraft = test_event(tenant_id, EventFeature::WorkflowStepReady);
    assert!(matches!(
        repository.save_step_draft(&advanced, &drafted, &redraft).await,
        Ok(false)
    ));
}

#[tokio::test]
async fn failed_event_insert_rolls_back_the_step_decision() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresCopilotWorkflowRepository::new(pool);
    let tenant_id = TenantId::new();
    let (workflow, steps) = planned_workflow(tenant_id);
    let started = test_event(tenant_id, EventFeature::WorkflowStart);
    assert!(repository.create_workflow(&workflow, &steps, &started).await.is_ok());

    let now = Utc::now();
    let ready = workflow.mark_step_ready(now);
    let drafted = steps[0]
        .with_draft(ActionType::RfqDraft, json!({}), json!({"title": "Bearings"}), now)
        .unwrap_or_else(|_| unreachable!());
    let step_ready = test_event(tenant_id, EventFeature::WorkflowStepReady);
    assert!(matches!(
        repository.save_step_draft(&ready, &drafted, &step_ready).await,
        Ok(true)
    ));

    let decided = drafted
        .decide(true, "approver-1", json!({}), now)
        .unwrap_or_else(|_| unreachable!());
    let advanced = ready
        .advance(1, WorkflowStatus::InProgress, now)
        .unwrap_or_else(|_| unreachable!());
    let mut duplicate = test_event(tenant_id, EventFeature::WorkflowStepApproved);
    duplicate.event_id = started.event_id;

    let result = repository
        .apply_step_decision(0, &advanced, &decided, &[duplicate])
        .await;

    assert!(result.is_err());
    let stored = repository
        .find_workflow(tenant_id, workflow.workflow_id())
        .await
        .unwrap_or_default()
        .map(|stored| stored.current_step());
    assert_eq!(stored, Some(0));
    let step = repository
        .find_step(tenant_id, workflow.workflow_id(), 0)
        .await
        .unwrap_or_default()
        .map(|step| step.approval_state());
    assert_eq!(step, Some(StepApprovalState::Pending));
}

#[tokio::test]
async fn duplicate_ids_conflict_and_cancel_is_compare_and_set() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresCopilotWorkflowRepository::new(pool);
    let tenant_id = TenantId::new();
    let (workflow, steps) = planned_workflow(tenant_id);
    let started = test_event(tenant_id, EventFeature::WorkflowStart);
    assert!(repository.create_workflow(&workflow, &steps, &started).await.is_ok());
    let restarted = test_event(tenant_id, EventFeature::WorkflowStart);
    assert!(matches!(
        repository.create_workflow(&workflow, &steps, &restarted).await,
        Err(AppError::Conflict(_))
    ));

    let cancelled = workflow.cancel(Utc::now()).unwrap_or_else(|_| unreachable!());
    let cancel_event = test_event(tenant_id, EventFeature::WorkflowCancelled);
    assert!(matches!(
        repository
            .update_workflow_status(WorkflowStatus::Pending, &cancelled, &cancel_event)
            .await,
        Ok(true)
    ));
    let second_cancel = test_event(tenant_id, EventFeature::WorkflowCancelled);
    assert!(matches!(
        repository
            .update_workflow_status(WorkflowStatus::Pending, &cancelled, &second_cancel)
            .await,
        Ok(false)
    ));

    let cancelled_only = repository
        .list_workflows(
            tenant_id,
            WorkflowListQuery {
                status: Some(WorkflowStatus::Cancelled),
                ..WorkflowListQuery::default()
            },
        )
        .await
        .unwrap_or_default();
    assert_eq!(cancelled_only.len(), 1);
    assert!(
        repository
            .list_workflows(TenantId::new(), WorkflowListQuery::default())
            .await
            .unwrap_or_default()
            .is_empty()
    );
}
