use super::*;

impl ActionDraftService {
    /// Appends a rating to a draft in any state. The draft itself never changes.
    pub async fn feedback(
        &self,
        actor: &ActorContext,
        draft_id: ActionDraftId,
        rating: i32,
        comment: Option<String>,
    ) -> AppResult<ActionFeedback> {
        let draft = self.load_draft(actor, draft_id).await?;
        self.context
            .gate
            .require_feedback(actor, draft.action_type())
            .await?;

        let started = Instant::now();
        let feedback = ActionFeedback::new(
            draft.tenant_id(),
            draft_id,
            rating,
            comment,
            actor.subject(),
            Utc::now(),
        )?;
        let event = EventRecord::success(
            EventFeature::ActionFeedback,
            json!({
                "draft_id": draft_id,
                "rating": feedback.rating().value(),
                "has_comment": feedback.comment().is_some(),
            }),
            json!({ "feedback_id": feedback.feedback_id() }),
            started,
        )
        .with_entity(draft_reference(draft_id)?)
        .into_event(draft.tenant_id(), actor.subject());
        self.repository.append_feedback(&feedback, &event).await?;

        Ok(feedback)
    }
}
