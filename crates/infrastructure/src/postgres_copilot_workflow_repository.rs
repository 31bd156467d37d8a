//! PostgreSQL-backed workflow and step store.
//!
//! Every write that moves a workflow is a compare-and-set on `current_step` or
//! `status`, and step decisions only touch rows still `pending`. Callers learn
//! about a lost race from a `false` return, never from a partial write. The
//! copilot events of a transition are inserted in the same transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};

use procura_application::{CopilotWorkflowRepository, WorkflowListQuery};
use procura_core::{AppError, AppResult, TenantId};
use procura_domain::{
    ActionType, CopilotEvent, StepApprovalState, StepDecision, Workflow, WorkflowId,
    WorkflowStatus, WorkflowStep, WorkflowStepPlan, WorkflowType,
};

use crate::postgres_action_draft_repository::page_value;
use crate::postgres_copilot_event_repository::insert_event;

mod steps;

/// PostgreSQL implementation of the copilot workflow store.
#[derive(Clone)]
pub struct PostgresCopilotWorkflowRepository {
    pool: PgPool,
}

impl PostgresCopilotWorkflowRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> AppResult<Transaction<'_, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|error| AppError::Internal(format!("failed to open workflow transaction: {error}")))
    }
}

#[derive(Debug, FromRow)]
struct WorkflowRow {
    workflow_id: String,
    tenant_id: uuid::Uuid,
    created_by: String,
    workflow_type: String,
    status: String,
    current_step: i32,
    inputs: Value,
    step_plan: Json<Vec<WorkflowStepPlan>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl WorkflowRow {
    fn into_workflow(self) -> AppResult<Workflow> {
        Ok(Workflow::restore(
            WorkflowId::new(self.workflow_id)?,
            TenantId::from_uuid(self.tenant_id),
            self.created_by,
            WorkflowType::parse(self.workflow_type.as_str())?,
            WorkflowStatus::parse(self.status.as_str())?,
            stored_index(self.current_step)?,
            self.inputs,
            self.step_plan.0,
            self.created_at,
            self.updated_at,
        ))
    }
}

#[derive(Debug, FromRow)]
struct StepRow {
    workflow_id: String,
    step_index: i32,
    action_type: String,
    name: Option<String>,
    required_inputs: Value,
    draft_output: Option<Value>,
    approval_state: String,
    decided_by: Option<String>,
    decided_at: Option<DateTime<Utc>>,
    decision_output: Option<Value>,
    updated_at: DateTime<Utc>,
}

impl StepRow {
    fn into_step(self) -> AppResult<WorkflowStep> {
        let approval_state = StepApprovalState::parse(self.approval_state.as_str())?;
        let decision = match (approval_state, self.decided_by, self.decided_at) {
            (StepApprovalState::Pending, _, _) => None,
            (_, Some(decided_by), Some(decided_at)) => Some(StepDecision {
                approval_state,
                decided_by,
                decided_at,
                output: self.decision_output.unwrap_or(Value::Null),
            }),
            _ => {
                return Err(AppError::Internal(format!(
                    "workflow '{}' step {} is {} without a decider",
                    self.workflow_id,
                    self.step_index,
                    approval_state.as_str()
                )));
            }
        };

        Ok(WorkflowStep::restore(
            WorkflowId::new(self.workflow_id)?,
            stored_index(self.step_index)?,
            self.action_type.parse::<ActionType>()?,
            self.name,
            self.required_inputs,
            self.draft_output,
            approval_state,
            decision,
            self.updated_at,
        ))
    }
}

const WORKFLOW_COLUMNS: &str = "workflow_id, tenant_id, created_by, workflow_type, status, \
     current_step, inputs, step_plan, created_at, updated_at";
const STEP_COLUMNS: &str = "workflow_id, step_index, action_type, name, required_inputs, \
     draft_output, approval_state, decided_by, decided_at, decision_output, updated_at";

fn stored_index(value: i32) -> AppResult<u32> {
    u32::try_from(value)
        .map_err(|error| AppError::Internal(format!("negative stored step index {value}: {error}")))
}

fn index_value(value: u32) -> AppResult<i32> {
    i32::try_from(value)
        .map_err(|error| AppError::Validation(format!("step index {value} is out of range: {error}")))
}

fn database_error(context: &str) -> impl FnOnce(sqlx::Error) -> AppError + '_ {
    move |error| AppError::Internal(format!("failed to {context}: {error}"))
}

#[async_trait]
impl CopilotWorkflowRepository for PostgresCopilotWorkflowRepository {
    async fn create_workflow(
        &self,
        workflow: &Workflow,
        steps: &[WorkflowStep],
        event: &CopilotEvent,
    ) -> AppResult<()> {
        let mut transaction = self.begin().await?;
        let inserted = sqlx::query(
            r#"
            INSERT INTO copilot_workflows (
                workflow_id, tenant_id, created_by, workflow_type, status,
                current_step, inputs, step_plan, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (workflow_id) DO NOTHING
            "#,
        )
        .bind(workflow.workflow_id().as_str())
        .bind(workflow.tenant_id().as_uuid())
        .bind(workflow.created_by())
        .bind(workflow.workflow_type().as_str())
        .bind(workflow.status().as_str())
        .bind(index_value(workflow.current_step())?)
        .bind(workflow.inputs())
        .bind(Json(workflow.steps()))
        .bind(workflow.created_at())
        .bind(workflow.updated_at())
        .execute(&mut *transaction)
        .await
        .map_err(database_error("create copilot workflow"))?;

        if inserted.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "workflow '{}' already exists",
                workflow.workflow_id()
            )));
        }

        for step in steps {
            steps::insert_step(&mut transaction, workflow.tenant_id(), step).await?;
        }
        insert_event(&mut *transaction, event).await?;

        transaction
            .commit()
            .await
            .map_err(database_error("commit copilot workflow"))
    }

    async fn find_workflow(
        &self,
        tenant_id: TenantId,
        workflow_id: &WorkflowId,
    ) -> AppResult<Option<Workflow>> {
        let row = sqlx::query_as::<_, WorkflowRow>(&format!(
            "SELECT {WORKFLOW_COLUMNS} FROM copilot_workflows WHERE tenant_id = $1 AND workflow_id = $2"
        ))
        .bind(tenant_id.as_uuid())
        .bind(workflow_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error("find copilot workflow"))?;

        row.map(WorkflowRow::into_workflow).transpose()
    }

    async fn list_workflows(
        &self,
        tenant_id: TenantId,
        query: WorkflowListQuery,
    ) -> AppResult<Vec<Workflow>> {
        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!(
            "SELECT {WORKFLOW_COLUMNS} FROM copilot_workflows WHERE tenant_id = "
        ));
        builder.push_bind(tenant_id.as_uuid());
        if let Some(status) = query.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        builder
            .push(" ORDER BY created_at DESC, workflow_id LIMIT ")
            .push_bind(page_value(query.limit)?)
            .push(" OFFSET ")
            .push_bind(page_value(query.offset)?);

        let rows = builder
            .build_query_as::<WorkflowRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(database_error("list copilot workflows"))?;

        rows.into_iter().map(WorkflowRow::into_workflow).collect()
    }

    async fn list_steps(
        &self,
        tenant_id: TenantId,
        workflow_id: &WorkflowId,
    ) -> AppResult<Vec<WorkflowStep>> {
        let rows = sqlx::query_as::<_, StepRow>(&format!(
            "SELECT {STEP_COLUMNS} FROM copilot_workflow_steps \
             WHERE tenant_id = $1 AND workflow_id = $2 ORDER BY step_index"
        ))
        .bind(tenant_id.as_uuid())
        .bind(workflow_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(database_error("list copilot workflow steps"))?;

        rows.into_iter().map(StepRow::into_step).collect()
    }

    async fn find_step(
        &self,
        tenant_id: TenantId,
        workflow_id: &WorkflowId,
        step_index: u32,
    ) -> AppResult<Option<WorkflowStep>> {
        let row = sqlx::query_as::<_, StepRow>(&format!(
            "SELECT {STEP_COLUMNS} FROM copilot_workflow_steps \
             WHERE tenant_id = $1 AND workflow_id = $2 AND step_index = $3"
        ))
        .bind(tenant_id.as_uuid())
        .bind(workflow_id.as_str())
        .bind(index_value(step_index)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error("find copilot workflow step"))?;

        row.map(StepRow::into_step).transpose()
    }

    async fn save_step_draft(
        &self,
        workflow: &Workflow,
        step: &WorkflowStep,
        event: &CopilotEvent,
    ) -> AppResult<bool> {
        let mut transaction = self.begin().await?;
        let moved = sqlx::query(
            r#"
            UPDATE copilot_workflows
            SET status = $3, updated_at = $4
            WHERE tenant_id = $1
              AND workflow_id = $2
              AND current_step = $5
              AND status IN ('pending', 'in_progress')
            "#,
        )
        .bind(workflow.tenant_id().as_uuid())
        .bind(workflow.workflow_id().as_str())
        .bind(workflow.status().as_str())
        .bind(workflow.updated_at())
        .bind(index_value(step.step_index())?)
        .execute(&mut *transaction)
        .await
        .map_err(database_error("mark workflow step ready"))?;

        if moved.rows_affected() != 1
            || !steps::upsert_pending_draft(&mut transaction, workflow.tenant_id(), step).await?
        {
            return Ok(false);
        }
        insert_event(&mut *transaction, event).await?;

        transaction
            .commit()
            .await
            .map_err(database_error("commit workflow step draft"))?;
        Ok(true)
    }

    async fn apply_step_decision(
        &self,
        expected_current_step: u32,
        workflow: &Workflow,
        step: &WorkflowStep,
        events: &[CopilotEvent],
    ) -> AppResult<bool> {
        let mut transaction = self.begin().await?;
        let advanced = sqlx::query(
            r#"
            UPDATE copilot_workflows
            SET status = $3, current_step = $4, updated_at = $5
            WHERE tenant_id = $1 AND workflow_id = $2 AND current_step = $6
            "#,
        )
        .bind(workflow.tenant_id().as_uuid())
        .bind(workflow.workflow_id().as_str())
        .bind(workflow.status().as_str())
        .bind(index_value(workflow.current_step())?)
        .bind(workflow.updated_at())
        .bind(index_value(expected_current_step)?)
        .execute(&mut *transaction)
        .await
        .map_err(database_error("advance copilot workflow"))?;

        if advanced.rows_affected() != 1
            || !steps::record_decision(&mut transaction, workflow.tenant_id(), step).await?
        {
            return Ok(false);
        }
        for event in events {
            insert_event(&mut *transaction, event).await?;
        }

        transaction
            .commit()
            .await
            .map_err(database_error("commit workflow step decision"))?;
        Ok(true)
    }

    async fn update_workflow_status(
        &self,
        expected_status: WorkflowStatus,
        workflow: &Workflow,
        event: &CopilotEvent,
    ) -> AppResult<bool> {
        let mut transaction = self.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE copilot_workflows
            SET status = $3, updated_at = $4
            WHERE tenant_id = $1 AND workflow_id = $2 AND status = $5
            "#,
        )
        .bind(workflow.tenant_id().as_uuid())
        .bind(workflow.workflow_id().as_str())
        .bind(workflow.status().as_str())
        .bind(workflow.updated_at())
        .bind(expected_status.as_str())
        .execute(&mut *transaction)
        .await
        .map_err(database_error("update copilot workflow status"))?;
        if result.rows_affected() != 1 {
            return Ok(false);
        }

        insert_event(&mut *transaction, event).await?;
        transaction
            .commit()
            .await
            .map_err(database_error("commit copilot workflow status"))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests;
