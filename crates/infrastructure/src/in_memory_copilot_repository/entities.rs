use super::*;

#[async_trait]
impl EntityStore for InMemoryCopilotRepository {
    async fn entity_exists(
        &self,
        tenant_id: TenantId,
        reference: &EntityReference,
    ) -> AppResult<bool> {
        Ok(self.records.read().await.values().any(|record| {
            record.tenant_id == tenant_id
                && record.entity_kind == reference.entity_kind()
                && record.record_id.to_string() == reference.entity_id()
        }))
    }
}

#[async_trait]
impl WorkspaceToolProvider for InMemoryCopilotRepository {
    async fn search_records(
        &self,
        tenant_id: TenantId,
        search: WorkspaceSearch,
    ) -> AppResult<Vec<Value>> {
        let needle = search.text.as_deref().map(str::to_lowercase);
        let records = self.records.read().await;
        let mut matching: Vec<&StoredRecord> = records
            .values()
            .filter(|record| {
                record.tenant_id == tenant_id && record.entity_kind.as_str() == search.record_kind
            })
            .filter(|record| {
                needle
                    .as_deref()
                    .is_none_or(|needle| record.data.to_string().to_lowercase().contains(needle))
            })
            .collect();
        matching.sort_by(|left, right| right.created_at.cmp(&left.created_at));

        Ok(matching
            .into_iter()
            .take(search.limit)
            .map(|record| {
                json!({
                    "id": record.record_id,
                    "kind": record.entity_kind.as_str(),
                    "data": record.data,
                    "created_at": record.created_at,
                })
            })
            .collect())
    }
}
