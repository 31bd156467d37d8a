use super::*;

impl InMemoryCopilotRepository {
    /// Appends events while the caller still holds its state locks.
    pub(super) async fn append_events(&self, events: &[CopilotEvent]) {
        self.events.write().await.extend_from_slice(events);
    }
}

#[async_trait]
impl CopilotEventRepository for InMemoryCopilotRepository {
    async fn append_event(&self, event: &CopilotEvent) -> AppResult<()> {
        self.append_events(std::slice::from_ref(event)).await;
        Ok(())
    }

    async fn list_events(&self, query: &EventQuery) -> AppResult<Vec<CopilotEvent>> {
        let mut matching: Vec<CopilotEvent> = self
            .events
            .read()
            .await
            .iter()
            .filter(|event| query.matches(event))
            .cloned()
            .collect();
        matching.sort_by(|left, right| right.occurred_at.cmp(&left.occurred_at));

        Ok(page(matching, query.offset, query.limit))
    }

    async fn summarize_events(&self, query: &EventQuery) -> AppResult<Vec<EventCount>> {
        let mut counts: BTreeMap<(&'static str, &'static str), EventCount> = BTreeMap::new();
        for event in self.events.read().await.iter().filter(|event| query.matches(event)) {
            counts
                .entry((event.feature.as_str(), event.status.as_str()))
                .or_insert_with(|| EventCount {
                    feature: event.feature,
                    status: event.status,
                    count: 0,
                })
                .count += 1;
        }

        Ok(counts.into_values().collect())
    }
}
