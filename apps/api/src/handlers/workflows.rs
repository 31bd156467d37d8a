use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use procura_application::WorkflowListQuery;
use procura_core::{ActorContext, AppResult};
use procura_domain::{WorkflowId, WorkflowStatus};
use serde::Deserialize;

use crate::dto::{
    CompleteCopilotWorkflowStepRequest, StartCopilotWorkflowRequest, WorkflowDetailResponse,
    WorkflowResponse, WorkflowStepOutcomeResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WorkflowListQueryRequest {
    pub status: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl WorkflowListQueryRequest {
    fn into_query(self) -> AppResult<WorkflowListQuery> {
        let defaults = WorkflowListQuery::default();
        Ok(WorkflowListQuery {
            status: self
                .status
                .as_deref()
                .map(WorkflowStatus::parse)
                .transpose()?,
            limit: self.limit.unwrap_or(defaults.limit),
            offset: self.offset.unwrap_or(defaults.offset),
        })
    }
}

pub async fn start_workflow_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Json(payload): Json<StartCopilotWorkflowRequest>,
) -> ApiResult<(StatusCode, Json<WorkflowDetailResponse>)> {
    let detail = state
        .copilot
        .workflows()
        .start(&actor, payload.try_into()?)
        .await?;

    Ok((StatusCode::CREATED, Json(WorkflowDetailResponse::from(detail))))
}

pub async fn list_workflows_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Query(query): Query<WorkflowListQueryRequest>,
) -> ApiResult<Json<Vec<WorkflowResponse>>> {
    let workflows = state
        .copilot
        .workflows()
        .list_workflows(&actor, query.into_query()?)
        .await?
        .into_iter()
        .map(WorkflowResponse::from)
        .collect();

    Ok(Json(workflows))
}

pub async fn get_workflow_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(workflow_id): Path<String>,
) -> ApiResult<Json<WorkflowDetailResponse>> {
    let detail = state
        .copilot
        .workflows()
        .get_workflow(&actor, &WorkflowId::new(workflow_id)?)
        .await?;

    Ok(Json(WorkflowDetailResponse::from(detail)))
}

pub async fn next_step_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(workflow_id): Path<String>,
) -> ApiResult<Json<WorkflowStepOutcomeResponse>> {
    let outcome = state
        .copilot
        .workflows()
        .next(&actor, &WorkflowId::new(workflow_id)?)
        .await?;

    Ok(Json(WorkflowStepOutcomeResponse::from(outcome)))
}

pub async fn complete_step_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(workflow_id): Path<String>,
    Json(payload): Json<CompleteCopilotWorkflowStepRequest>,
) -> ApiResult<Json<WorkflowStepOutcomeResponse>> {
    let outcome = state
        .copilot
        .workflows()
        .complete(&actor, &WorkflowId::new(workflow_id)?, payload.into())
        .await?;

    Ok(Json(WorkflowStepOutcomeResponse::from(outcome)))
}

pub async fn cancel_workflow_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(workflow_id): Path<String>,
) -> ApiResult<Json<WorkflowResponse>> {
    let workflow = state
        .copilot
        .workflows()
        .cancel(&actor, &WorkflowId::new(workflow_id)?)
        .await?;

    Ok(Json(WorkflowResponse::from(workflow)))
}
