use std::time::Instant;

use procura_application::EventRecord;
use procura_core::TenantId;
use procura_domain::{CopilotEvent, EventFeature};
use serde_json::json;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Connects and migrates when `DATABASE_URL` is set; tests skip otherwise.
pub(crate) async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(4)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run copilot migrations in test: {error}");
    }

    Some(pool)
}

/// Success event handed to transition writes in adapter tests.
pub(crate) fn test_event(tenant_id: TenantId, feature: EventFeature) -> CopilotEvent {
    EventRecord::success(feature, json!({}), json!({}), Instant::now()).into_event(tenant_id, "tester")
}
