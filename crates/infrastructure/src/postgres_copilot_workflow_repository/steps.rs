use super::*;

pub(super) async fn insert_step(
    transaction: &mut Transaction<'_, Postgres>,
    tenant_id: TenantId,
    step: &WorkflowStep,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO copilot_workflow_steps (
            workflow_id, step_index, tenant_id, action_type, name,
            required_inputs, draft_output, approval_state, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(step.workflow_id().as_str())
    .bind(index_value(step.step_index())?)
    .bind(tenant_id.as_uuid())
    .bind(step.action_type().as_str())
    .bind(step.name())
    .bind(step.required_inputs())
    .bind(step.draft_output())
    .bind(step.approval_state().as_str())
    .bind(step.updated_at())
    .execute(&mut **transaction)
    .await
    .map_err(database_error("insert copilot workflow step"))?;

    Ok(())
}

/// Upserts a drafted step unless it was already decided.
pub(super) async fn upsert_pending_draft(
    transaction: &mut Transaction<'_, Postgres>,
    tenant_id: TenantId,
    step: &WorkflowStep,
) -> AppResult<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO copilot_workflow_steps (
            workflow_id, step_index, tenant_id, action_type, name,
            required_inputs, draft_output, approval_state, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', $8)
        ON CONFLICT (workflow_id, step_index) DO UPDATE
        SET action_type = EXCLUDED.action_type,
            required_inputs = EXCLUDED.required_inputs,
            draft_output = EXCLUDED.draft_output,
            updated_at = EXCLUDED.updated_at
        WHERE copilot_workflow_steps.approval_state = 'pending'
        "#,
    )
    .bind(step.workflow_id().as_str())
    .bind(index_value(step.step_index())?)
    .bind(tenant_id.as_uuid())
    .bind(step.action_type().as_str())
    .bind(step.name())
    .bind(step.required_inputs())
    .bind(step.draft_output())
    .bind(step.updated_at())
    .execute(&mut **transaction)
    .await
    .map_err(database_error("store copilot workflow step draft"))?;

    Ok(result.rows_affected() == 1)
}

/// Stores the decision of a still-pending step.
pub(super) async fn record_decision(
    transaction: &mut Transaction<'_, Postgres>,
    tenant_id: TenantId,
    step: &WorkflowStep,
) -> AppResult<bool> {
    let Some(decision) = step.decision() else {
        return Err(AppError::Internal(format!(
            "workflow '{}' step {} has no decision to store",
            step.workflow_id(),
            step.step_index()
        )));
    };

    let result = sqlx::query(
        r#"
        UPDATE copilot_workflow_steps
        SET approval_state = $4,
            decided_by = $5,
            decided_at = $6,
            decision_output = $7,
            updated_at = $8
        WHERE tenant_id = $1
          AND workflow_id = $2
          AND step_index = $3
          AND approval_state = 'pending'
        "#,
    )
    .bind(tenant_id.as_uuid())
    .bind(step.workflow_id().as_str())
    .bind(index_value(step.step_index())?)
    .bind(decision.approval_state.as_str())
    .bind(decision.decided_by.as_str())
    .bind(decision.decided_at)
    .bind(&decision.output)
    .bind(step.updated_at())
    .execute(&mut **transaction)
    .await
    .map_err(database_error("store copilot workflow step decision"))?;

    Ok(result.rows_affected() == 1)
}
