use procura_core::AppError;
use sqlx::PgPool;
use tower_sessions::cookie::SameSite;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::api_config::ApiConfig;

const SESSION_TABLE: &str = "copilot_sessions";
const SESSION_COOKIE: &str = "procura_copilot";

/// Session layer carrying the actor context written by the sign-in layer.
pub async fn build_postgres_session_layer(
    pool: PgPool,
    config: &ApiConfig,
) -> Result<SessionManagerLayer<PostgresStore>, AppError> {
    let store = PostgresStore::new(pool)
        .with_table_name(SESSION_TABLE)
        .map_err(|error| AppError::Validation(format!("invalid session table name: {error}")))?;

    store.migrate().await.map_err(|error| {
        AppError::Internal(format!("failed to prepare '{SESSION_TABLE}': {error}"))
    })?;

    Ok(SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE)
        .with_secure(config.cookie_secure)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_expiry(Expiry::OnInactivity(Duration::minutes(
            config.session_idle_minutes,
        ))))
}
