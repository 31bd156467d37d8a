use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use procura_application::ActionDraftListQuery;
use procura_core::{ActorContext, AppResult};
use procura_domain::{ActionDraftId, ActionDraftStatus, ActionType};
use serde::Deserialize;

use crate::dto::{
    ActionDraftResponse, ActionFeedbackResponse, ApproveActionResponse, PlanCopilotActionRequest,
    RejectActionRequest, SubmitActionFeedbackRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ActionDraftListQueryRequest {
    pub status: Option<String>,
    pub action_type: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ActionDraftListQueryRequest {
    fn into_query(self) -> AppResult<ActionDraftListQuery> {
        let defaults = ActionDraftListQuery::default();
        Ok(ActionDraftListQuery {
            status: self
                .status
                .as_deref()
                .map(ActionDraftStatus::parse)
                .transpose()?,
            action_type: self
                .action_type
                .as_deref()
                .map(str::parse::<ActionType>)
                .transpose()?,
            limit: self.limit.unwrap_or(defaults.limit),
            offset: self.offset.unwrap_or(defaults.offset),
        })
    }
}

pub async fn plan_action_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Json(payload): Json<PlanCopilotActionRequest>,
) -> ApiResult<(StatusCode, Json<ActionDraftResponse>)> {
    let draft = state
        .copilot
        .actions()
        .plan(&actor, payload.try_into()?)
        .await?;

    Ok((StatusCode::CREATED, Json(ActionDraftResponse::from(draft))))
}

pub async fn list_drafts_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Query(query): Query<ActionDraftListQueryRequest>,
) -> ApiResult<Json<Vec<ActionDraftResponse>>> {
    let drafts = state
        .copilot
        .actions()
        .list_drafts(&actor, query.into_query()?)
        .await?
        .into_iter()
        .map(ActionDraftResponse::from)
        .collect();

    Ok(Json(drafts))
}

pub async fn get_draft_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(draft_id): Path<String>,
) -> ApiResult<Json<ActionDraftResponse>> {
    let draft = state
        .copilot
        .actions()
        .get_draft(&actor, ActionDraftId::parse(&draft_id)?)
        .await?;

    Ok(Json(ActionDraftResponse::from(draft)))
}

pub async fn approve_draft_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(draft_id): Path<String>,
) -> ApiResult<Json<ApproveActionResponse>> {
    let approved = state
        .copilot
        .actions()
        .approve(&actor, ActionDraftId::parse(&draft_id)?)
        .await?;

    Ok(Json(ApproveActionResponse::from(approved)))
}

pub async fn reject_draft_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(draft_id): Path<String>,
    Json(payload): Json<RejectActionRequest>,
) -> ApiResult<Json<ActionDraftResponse>> {
    let draft = state
        .copilot
        .actions()
        .reject(&actor, ActionDraftId::parse(&draft_id)?, &payload.reason)
        .await?;

    Ok(Json(ActionDraftResponse::from(draft)))
}

pub async fn submit_feedback_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(draft_id): Path<String>,
    Json(payload): Json<SubmitActionFeedbackRequest>,
) -> ApiResult<(StatusCode, Json<ActionFeedbackResponse>)> {
    let feedback = state
        .copilot
        .actions()
        .feedback(
            &actor,
            ActionDraftId::parse(&draft_id)?,
            payload.rating,
            payload.comment,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ActionFeedbackResponse::from(feedback))))
}

pub async fn list_feedback_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(draft_id): Path<String>,
) -> ApiResult<Json<Vec<ActionFeedbackResponse>>> {
    let feedback = state
        .copilot
        .actions()
        .list_feedback(&actor, ActionDraftId::parse(&draft_id)?)
        .await?
        .into_iter()
        .map(ActionFeedbackResponse::from)
        .collect();

    Ok(Json(feedback))
}
