use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use procura_core::AppError;
use tower_http::trace::TraceLayer;
use tower_sessions::SessionManagerLayer;
use tower_sessions_sqlx_store::PostgresStore;

use crate::state::AppState;
use crate::{handlers, middleware};

mod cors;

pub fn build_router(
    app_state: AppState,
    session_layer: SessionManagerLayer<PostgresStore>,
) -> Result<Router, AppError> {
    let cors_layer = cors::build_cors_layer(&app_state.frontend_url)?;

    Ok(Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(copilot_routes())
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_same_origin_for_mutations,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .layer(session_layer)
        .with_state(app_state))
}

fn copilot_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/copilot/actions",
            get(handlers::actions::list_drafts_handler)
                .post(handlers::actions::plan_action_handler),
        )
        .route(
            "/api/copilot/actions/{draft_id}",
            get(handlers::actions::get_draft_handler),
        )
        .route(
            "/api/copilot/actions/{draft_id}/approve",
            post(handlers::actions::approve_draft_handler),
        )
        .route(
            "/api/copilot/actions/{draft_id}/reject",
            post(handlers::actions::reject_draft_handler),
        )
        .route(
            "/api/copilot/actions/{draft_id}/feedback",
            get(handlers::actions::list_feedback_handler)
                .post(handlers::actions::submit_feedback_handler),
        )
        .route(
            "/api/copilot/workflows",
            get(handlers::workflows::list_workflows_handler)
                .post(handlers::workflows::start_workflow_handler),
        )
        .route(
            "/api/copilot/workflows/{workflow_id}",
            get(handlers::workflows::get_workflow_handler),
        )
        .route(
            "/api/copilot/workflows/{workflow_id}/next",
            post(handlers::workflows::next_step_handler),
        )
        .route(
            "/api/copilot/workflows/{workflow_id}/complete",
            post(handlers::workflows::complete_step_handler),
        )
        .route(
            "/api/copilot/workflows/{workflow_id}/cancel",
            post(handlers::workflows::cancel_workflow_handler),
        )
        .route(
            "/api/copilot/chat/threads",
            post(handlers::chat::create_thread_handler),
        )
        .route(
            "/api/copilot/chat/threads/{thread_id}/messages",
            get(handlers::chat::list_messages_handler).post(handlers::chat::send_message_handler),
        )
        .route("/api/copilot/events", get(handlers::events::list_events_handler))
        .route(
            "/api/copilot/events/summary",
            get(handlers::events::summarize_events_handler),
        )
        .route_layer(from_fn(middleware::require_actor))
}
