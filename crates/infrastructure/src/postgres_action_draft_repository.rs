use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use procura_application::{ActionDraftListQuery, ActionDraftRepository, DraftDecisionWrite};
use procura_core::{AppError, AppResult, NonEmptyString, TenantId};
use procura_domain::{
    ActionDraft, ActionDraftId, ActionDraftStatus, ActionFeedback, ActionInput, ActionOutput,
    ActionType, CopilotEvent, DraftDecision, EntityKind, EntityReference, FeedbackRating,
};

use crate::postgres_copilot_event_repository::insert_event;
use crate::postgres_entity_store::insert_records;

/// PostgreSQL-backed draft and feedback store.
///
/// Every write commits together with its copilot event; approvals also insert
/// their procurement records in the same transaction.
#[derive(Clone)]
pub struct PostgresActionDraftRepository {
    pool: PgPool,
}

impl PostgresActionDraftRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct DraftRow {
    draft_id: Uuid,
    tenant_id: Uuid,
    created_by: String,
    action_type: String,
    input: Json<ActionInput>,
    output: Json<ActionOutput>,
    status: String,
    decided_by: Option<String>,
    decided_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
    entity_kind: Option<String>,
    entity_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl DraftRow {
    fn into_draft(self) -> AppResult<ActionDraft> {
        let draft_id = ActionDraftId::from_uuid(self.draft_id);
        let corrupt = |field: &str| {
            AppError::Internal(format!("draft '{draft_id}' is {} without {field}", self.status))
        };

        let decision = match ActionDraftStatus::parse(self.status.as_str())? {
            ActionDraftStatus::Drafted => DraftDecision::Drafted,
            ActionDraftStatus::Approved => {
                let kind = self.entity_kind.as_deref().ok_or_else(|| corrupt("entity_kind"))?;
                let entity_id = self.entity_id.clone().ok_or_else(|| corrupt("entity_id"))?;
                DraftDecision::Approved {
                    approved_by: self.decided_by.clone().ok_or_else(|| corrupt("decided_by"))?,
                    approved_at: self.decided_at.ok_or_else(|| corrupt("decided_at"))?,
                    entity: EntityReference::new(kind.parse::<EntityKind>()?, entity_id)?,
                }
            }
            ActionDraftStatus::Rejected => DraftDecision::Rejected {
                rejected_by: self.decided_by.clone().ok_or_else(|| corrupt("decided_by"))?,
                rejected_at: self.decided_at.ok_or_else(|| corrupt("decided_at"))?,
                reason: NonEmptyString::new(
                    self.rejection_reason
                        .clone()
                        .ok_or_else(|| corrupt("rejection_reason"))?,
                )?,
            },
        };

        Ok(ActionDraft::restore(
            draft_id,
            TenantId::from_uuid(self.tenant_id),
            self.created_by,
            self.action_type.parse::<ActionType>()?,
            self.input.0,
            self.output.0,
            decision,
            self.created_at,
        ))
    }
}

/// Column values describing a draft decision.
struct DecisionColumns<'a> {
    decided_by: Option<&'a str>,
    decided_at: Option<DateTime<Utc>>,
    rejection_reason: Option<&'a str>,
    entity_kind: Option<&'static str>,
    entity_id: Option<&'a str>,
}

fn decision_columns(decision: &DraftDecision) -> DecisionColumns<'_> {
    match decision {
        DraftDecision::Drafted => DecisionColumns {
            decided_by: None,
            decided_at: None,
            rejection_reason: None,
            entity_kind: None,
            entity_id: None,
        },
        DraftDecision::Approved {
            approved_by,
            approved_at,
            entity,
        } => DecisionColumns {
            decided_by: Some(approved_by.as_str()),
            decided_at: Some(*approved_at),
            rejection_reason: None,
            entity_kind: Some(entity.entity_kind().as_str()),
            entity_id: Some(entity.entity_id()),
        },
        DraftDecision::Rejected {
            rejected_by,
            rejected_at,
            reason,
        } => DecisionColumns {
            decided_by: Some(rejected_by.as_str()),
            decided_at: Some(*rejected_at),
            rejection_reason: Some(reason.as_str()),
            entity_kind: None,
            entity_id: None,
        },
    }
}

#[derive(Debug, FromRow)]
struct FeedbackRow {
    feedback_id: Uuid,
    tenant_id: Uuid,
    draft_id: Uuid,
    rating: i32,
    comment: Option<String>,
    created_by: String,
    created_at: DateTime<Utc>,
}

const DRAFT_COLUMNS: &str = "draft_id, tenant_id, created_by, action_type, input, output, status, \
     decided_by, decided_at, rejection_reason, entity_kind, entity_id, created_at";

fn database_error(context: &str) -> impl FnOnce(sqlx::Error) -> AppError + '_ {
    move |error| AppError::Internal(format!("failed to {context}: {error}"))
}

#[async_trait]
impl ActionDraftRepository for PostgresActionDraftRepository {
    async fn create_draft(&self, draft: &ActionDraft, event: &CopilotEvent) -> AppResult<()> {
        let columns = decision_columns(draft.decision());
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(database_error("start draft transaction"))?;
        sqlx::query(
            r#"
            INSERT INTO copilot_action_drafts (
                draft_id, tenant_id, created_by, action_type, input, output, status,
                decided_by, decided_at, rejection_reason, entity_kind, entity_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(draft.draft_id().as_uuid())
        .bind(draft.tenant_id().as_uuid())
        .bind(draft.created_by())
        .bind(draft.action_type().as_str())
        .bind(Json(draft.input()))
        .bind(Json(draft.output()))
        .bind(draft.status().as_str())
        .bind(columns.decided_by)
        .bind(columns.decided_at)
        .bind(columns.rejection_reason)
        .bind(columns.entity_kind)
        .bind(columns.entity_id)
        .bind(draft.created_at())
        .execute(&mut *transaction)
        .await
        .map_err(database_error("create action draft"))?;

        insert_event(&mut *transaction, event).await?;
        transaction
            .commit()
            .await
            .map_err(database_error("commit draft transaction"))
    }

    async fn find_draft(
        &self,
        tenant_id: TenantId,
        draft_id: ActionDraftId,
    ) -> AppResult<Option<ActionDraft>> {
        let row = sqlx::query_as::<_, DraftRow>(&format!(
            "SELECT {DRAFT_COLUMNS} FROM copilot_action_drafts WHERE tenant_id = $1 AND draft_id = $2"
        ))
        .bind(tenant_id.as_uuid())
        .bind(draft_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error("find action draft"))?;

        row.map(DraftRow::into_draft).transpose()
    }

    async fn list_drafts(
        &self,
        tenant_id: TenantId,
        query: ActionDraftListQuery,
    ) -> AppResult<Vec<ActionDraft>> {
        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!(
            "SELECT {DRAFT_COLUMNS} FROM copilot_action_drafts WHERE tenant_id = "
        ));
        builder.push_bind(tenant_id.as_uuid());
        if let Some(status) = query.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(action_type) = query.action_type {
            builder.push(" AND action_type = ").push_bind(action_type.as_str());
        }
        builder
            .push(" ORDER BY created_at DESC, draft_id LIMIT ")
            .push_bind(page_value(query.limit)?)
            .push(" OFFSET ")
            .push_bind(page_value(query.offset)?);

        let rows = builder
            .build_query_as::<DraftRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(database_error("list action drafts"))?;

        rows.into_iter().map(DraftRow::into_draft).collect()
    }

    async fn save_decision(&self, decision: DraftDecisionWrite<'_>) -> AppResult<bool> {
        let draft = decision.draft;
        let columns = decision_columns(draft.decision());
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(database_error("start decision transaction"))?;
        let result = sqlx::query(
            r#"
            UPDATE copilot_action_drafts
            SET status = $3,
                decided_by = $4,
                decided_at = $5,
                rejection_reason = $6,
                entity_kind = $7,
                entity_id = $8
            WHERE tenant_id = $1 AND draft_id = $2 AND status = 'drafted'
            "#,
        )
        .bind(draft.tenant_id().as_uuid())
        .bind(draft.draft_id().as_uuid())
        .bind(draft.status().as_str())
        .bind(columns.decided_by)
        .bind(columns.decided_at)
        .bind(columns.rejection_reason)
        .bind(columns.entity_kind)
        .bind(columns.entity_id)
        .execute(&mut *transaction)
        .await
        .map_err(database_error("store draft decision"))?;
        if result.rows_affected() != 1 {
            return Ok(false);
        }

        insert_records(
            &mut *transaction,
            draft.tenant_id(),
            decision.created_by,
            decision.entities,
        )
        .await?;
        insert_event(&mut *transaction, decision.event).await?;
        transaction
            .commit()
            .await
            .map_err(database_error("commit decision transaction"))?;

        Ok(true)
    }

    async fn append_feedback(&self, feedback: &ActionFeedback, event: &CopilotEvent) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(database_error("start feedback transaction"))?;
        sqlx::query(
            r#"
            INSERT INTO copilot_action_feedback (
                feedback_id, tenant_id, draft_id, rating, comment, created_by, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(feedback.feedback_id())
        .bind(feedback.tenant_id().as_uuid())
        .bind(feedback.draft_id().as_uuid())
        .bind(feedback.rating().value())
        .bind(feedback.comment())
        .bind(feedback.created_by())
        .bind(feedback.created_at())
        .execute(&mut *transaction)
        .await
        .map_err(database_error("append draft feedback"))?;

        insert_event(&mut *transaction, event).await?;
        transaction
            .commit()
            .await
            .map_err(database_error("commit feedback transaction"))
    }

    async fn list_feedback(
        &self,
        tenant_id: TenantId,
        draft_id: ActionDraftId,
    ) -> AppResult<Vec<ActionFeedback>> {
        let rows = sqlx::query_as::<_, FeedbackRow>(
            r#"
            SELECT feedback_id, tenant_id, draft_id, rating, comment, created_by, created_at
            FROM copilot_action_feedback
            WHERE tenant_id = $1 AND draft_id = $2
            ORDER BY created_at, feedback_id
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(draft_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(database_error("list draft feedback"))?;

        rows.into_iter()
            .map(|row| {
                Ok(ActionFeedback::restore(
                    row.feedback_id,
                    TenantId::from_uuid(row.tenant_id),
                    ActionDraftId::from_uuid(row.draft_id),
                    FeedbackRating::new(row.rating)?,
                    row.comment,
                    row.created_by,
                    row.created_at,
                ))
            })
            .collect()
    }
}

/// Converts a page bound into a SQL integer.
pub(crate) fn page_value(value: usize) -> AppResult<i64> {
    i64::try_from(value)
        .map_err(|error| AppError::Validation(format!("invalid page value {value}: {error}")))
}
