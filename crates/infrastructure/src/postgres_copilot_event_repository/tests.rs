use chrono::{Duration, Utc};
use procura_application::CopilotEventRepository;
use procura_core::TenantId;
use procura_domain::{
    CopilotEvent, EntityKind, EntityReference, EventCount, EventFeature, EventQuery, EventStatus,
};
use serde_json::json;
use uuid::Uuid;

use super::PostgresCopilotEventRepository;
use crate::postgres_test_support::test_pool;

fn event(tenant_id: TenantId, feature: EventFeature, status: EventStatus, minutes_ago: i64) -> CopilotEvent {
    CopilotEvent {
        event_id: Uuid::new_v4(),
        tenant_id,
        actor: "buyer-1".to_owned(),
        feature,
        status,
        request: json!({"action_type": "rfq_draft"}),
        response: (status == EventStatus::Success).then(|| json!({"draft_id": "d-1"})),
        latency_ms: 42,
        entity: EntityReference::new(EntityKind::ActionDraft, "d-1").ok(),
        occurred_at: Utc::now() - Duration::minutes(minutes_ago),
    }
}

#[tokio::test]
async fn events_are_filtered_and_summarized_per_company() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresCopilotEventRepository::new(pool);
    let tenant_id = TenantId::new();
    for stored in [
        event(tenant_id, EventFeature::ActionPlan, EventStatus::Success, 3),
        event(tenant_id, EventFeature::ActionPlan, EventStatus::Error, 2),
        event(tenant_id, EventFeature::ActionApprove, EventStatus::Success, 1),
        event(TenantId::new(), EventFeature::ActionPlan, EventStatus::Success, 1),
    ] {
        assert!(repository.append_event(&stored).await.is_ok());
    }

    let query = EventQuery {
        tenant_id: Some(tenant_id),
        limit: 10,
        ..EventQuery::default()
    };
    let listed = repository.list_events(&query).await.unwrap_or_default();
    let features: Vec<EventFeature> = listed.iter().map(|event| event.feature).collect();
    assert_eq!(
        features,
        vec![EventFeature::ActionApprove, EventFeature::ActionPlan, EventFeature::ActionPlan]
    );
    assert_eq!(listed[0].entity.as_ref().map(EntityReference::entity_id), Some("d-1"));

    let errors = repository
        .list_events(&EventQuery {
            status: Some(EventStatus::Error),
            ..query.clone()
        })
        .await
        .unwrap_or_default();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].response.is_none());

    let summary = repository.summarize_events(&query).await.unwrap_or_default();
    assert!(summary.contains(&EventCount {
        feature: EventFeature::ActionPlan,
        status: EventStatus::Success,
        count: 1,
    }));
    assert_eq!(summary.iter().map(|row| row.count).sum::<u64>(), 3);
}
