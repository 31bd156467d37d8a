use axum::Json;
use axum::extract::{Extension, Query, State};
use procura_core::ActorContext;

use crate::dto::{CopilotEventResponse, EventCountResponse, EventListQueryRequest};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_events_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Query(query): Query<EventListQueryRequest>,
) -> ApiResult<Json<Vec<CopilotEventResponse>>> {
    let events = state
        .copilot
        .events()
        .list_events(&actor, query.try_into()?)
        .await?
        .into_iter()
        .map(CopilotEventResponse::from)
        .collect();

    Ok(Json(events))
}

pub async fn summarize_events_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Query(query): Query<EventListQueryRequest>,
) -> ApiResult<Json<Vec<EventCountResponse>>> {
    let counts = state
        .copilot
        .events()
        .summarize_events(&actor, query.try_into()?)
        .await?
        .into_iter()
        .map(EventCountResponse::from)
        .collect();

    Ok(Json(counts))
}
