use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use procura_core::{ActorContext, AppError, AppResult};
use serde::Deserialize;
use uuid::Uuid;

use crate::dto::{
    ChatExchangeResponse, ChatMessageResponse, ChatThreadResponse, CreateChatThreadRequest,
    SendChatMessageRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

const MESSAGE_PAGE_DEFAULT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct ChatMessageListQueryRequest {
    pub limit: Option<usize>,
}

pub async fn create_thread_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Json(payload): Json<CreateChatThreadRequest>,
) -> ApiResult<(StatusCode, Json<ChatThreadResponse>)> {
    let thread = state
        .copilot
        .chat()
        .create_thread(&actor, payload.title)
        .await?;

    Ok((StatusCode::CREATED, Json(ChatThreadResponse::from(thread))))
}

pub async fn list_messages_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(thread_id): Path<String>,
    Query(query): Query<ChatMessageListQueryRequest>,
) -> ApiResult<Json<Vec<ChatMessageResponse>>> {
    let messages = state
        .copilot
        .chat()
        .list_messages(
            &actor,
            parse_thread_id(&thread_id)?,
            query.limit.unwrap_or(MESSAGE_PAGE_DEFAULT),
        )
        .await?
        .into_iter()
        .map(ChatMessageResponse::from)
        .collect();

    Ok(Json(messages))
}

pub async fn send_message_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    Path(thread_id): Path<String>,
    Json(payload): Json<SendChatMessageRequest>,
) -> ApiResult<Json<ChatExchangeResponse>> {
    let exchange = state
        .copilot
        .chat()
        .send_message(&actor, parse_thread_id(&thread_id)?, &payload.content)
        .await?;

    Ok(Json(ChatExchangeResponse::from(exchange)))
}

fn parse_thread_id(value: &str) -> AppResult<Uuid> {
    Uuid::parse_str(value.trim())
        .map_err(|error| AppError::Validation(format!("invalid thread id '{value}': {error}")))
}
