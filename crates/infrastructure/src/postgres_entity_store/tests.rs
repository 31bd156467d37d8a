use procura_application::{EntityStore, NewEntityRecord, WorkspaceSearch, WorkspaceToolProvider};
use procura_core::TenantId;
use procura_domain::{EntityKind, EntityReference};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use super::{PostgresEntityStore, insert_records};
use crate::postgres_test_support::test_pool;

fn rfq(key: &str, title: &str) -> NewEntityRecord {
    NewEntityRecord {
        record_id: Uuid::new_v4(),
        entity_kind: EntityKind::Rfq,
        idempotency_key: key.to_owned(),
        data: json!({"title": title}),
    }
}

async fn insert_committed(
    pool: &PgPool,
    tenant_id: TenantId,
    records: &[NewEntityRecord],
) -> bool {
    let Ok(mut transaction) = pool.begin().await else {
        return false;
    };
    if insert_records(&mut *transaction, tenant_id, "buyer-1", records)
        .await
        .is_err()
    {
        return false;
    }
    transaction.commit().await.is_ok()
}

#[tokio::test]
async fn repeated_keys_are_refused_and_lookups_stay_in_company() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = PostgresEntityStore::new(pool.clone());
    let tenant_id = TenantId::new();
    let first = rfq("draft-1:rfq", "Bearings");
    let reference = first.reference().unwrap_or_else(|_| unreachable!());

    assert!(insert_committed(&pool, tenant_id, &[first]).await);
    let replay = rfq("draft-1:rfq", "Ignored");
    let replay_reference = replay.reference().unwrap_or_else(|_| unreachable!());
    assert!(!insert_committed(&pool, tenant_id, &[replay]).await);

    assert!(store.entity_exists(tenant_id, &reference).await.unwrap_or(false));
    assert!(!store.entity_exists(tenant_id, &replay_reference).await.unwrap_or(true));
    assert!(!store.entity_exists(TenantId::new(), &reference).await.unwrap_or(true));

    let malformed = EntityReference::new(EntityKind::Rfq, "rfq-7").unwrap_or_else(|_| unreachable!());
    assert!(!store.entity_exists(tenant_id, &malformed).await.unwrap_or(true));
}

#[tokio::test]
async fn search_matches_text_within_company_and_kind() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = PostgresEntityStore::new(pool.clone());
    let tenant_id = TenantId::new();
    assert!(
        insert_committed(
            &pool,
            tenant_id,
            &[rfq("a", "Bearings Q3"), rfq("b", "Pallets")],
        )
        .await
    );

    let found = store
        .search_records(
            tenant_id,
            WorkspaceSearch {
                record_kind: "rfq".to_owned(),
                text: Some("bearings".to_owned()),
                limit: 10,
            },
        )
        .await
        .unwrap_or_default();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["data"]["title"], json!("Bearings Q3"));
    assert_eq!(found[0]["kind"], json!("rfq"));

    let other_company = store
        .search_records(
            TenantId::new(),
            WorkspaceSearch {
                record_kind: "rfq".to_owned(),
                text: None,
                limit: 10,
            },
        )
        .await
        .unwrap_or_default();
    assert!(other_company.is_empty());
}
