use chrono::{DateTime, Utc};
use procura_core::{AppError, AppResult, NonEmptyString, TenantId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::action::ActionDraftId;

/// Lowest accepted rating.
pub const FEEDBACK_RATING_MIN: i32 = 1;
/// Highest accepted rating.
pub const FEEDBACK_RATING_MAX: i32 = 5;
/// Longest accepted comment in characters.
pub const FEEDBACK_COMMENT_MAX_LENGTH: usize = 2_000;

/// Rating in the closed range `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct FeedbackRating(u8);

impl FeedbackRating {
    /// Creates a validated rating.
    pub fn new(value: i32) -> AppResult<Self> {
        if !(FEEDBACK_RATING_MIN..=FEEDBACK_RATING_MAX).contains(&value) {
            return Err(AppError::Validation(format!(
                "rating must be between {FEEDBACK_RATING_MIN} and {FEEDBACK_RATING_MAX}, got {value}"
            ))
            .with_code("invalid_rating"));
        }

        let value = u8::try_from(value)
            .map_err(|error| AppError::Validation(format!("invalid rating: {error}")))?;
        Ok(Self(value))
    }

    /// Returns the numeric rating.
    #[must_use]
    pub fn value(&self) -> i32 {
        i32::from(self.0)
    }
}

impl TryFrom<i32> for FeedbackRating {
    type Error = AppError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FeedbackRating> for i32 {
    fn from(value: FeedbackRating) -> Self {
        value.value()
    }
}

/// Append-only rating attached to an action draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionFeedback {
    feedback_id: Uuid,
    tenant_id: TenantId,
    draft_id: ActionDraftId,
    rating: FeedbackRating,
    comment: Option<String>,
    created_by: String,
    created_at: DateTime<Utc>,
}

impl ActionFeedback {
    /// Creates validated feedback for a draft.
    pub fn new(
        tenant_id: TenantId,
        draft_id: ActionDraftId,
        rating: i32,
        comment: Option<String>,
        created_by: &str,
        created_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        let rating = FeedbackRating::new(rating)?;
        let comment = normalize_comment(comment)?;
        let created_by = NonEmptyString::new(created_by)?;

        Ok(Self {
            feedback_id: Uuid::new_v4(),
            tenant_id,
            draft_id,
            rating,
            comment,
            created_by: created_by.into(),
            created_at,
        })
    }

    /// Rehydrates persisted feedback.
    #[must_use]
    pub fn restore(
        feedback_id: Uuid,
        tenant_id: TenantId,
        draft_id: ActionDraftId,
        rating: FeedbackRating,
        comment: Option<String>,
        created_by: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            feedback_id,
            tenant_id,
            draft_id,
            rating,
            comment,
            created_by,
            created_at,
        }
    }

    /// Returns the feedback identifier.
    #[must_use]
    pub fn feedback_id(&self) -> Uuid {
        self.feedback_id
    }

    /// Returns the owning company.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the rated draft.
    #[must_use]
    pub fn draft_id(&self) -> ActionDraftId {
        self.draft_id
    }

    /// Returns the rating.
    #[must_use]
    pub fn rating(&self) -> FeedbackRating {
        self.rating
    }

    /// Returns the optional comment.
    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Returns the rating subject.
    #[must_use]
    pub fn created_by(&self) -> &str {
        self.created_by.as_str()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

fn normalize_comment(comment: Option<String>) -> AppResult<Option<String>> {
    let Some(comment) = comment else {
        return Ok(None);
    };

    let trimmed = comment.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    if trimmed.chars().count() > FEEDBACK_COMMENT_MAX_LENGTH {
        return Err(AppError::Validation(format!(
            "feedback comment must be at most {FEEDBACK_COMMENT_MAX_LENGTH} characters"
        )));
    }

    Ok(Some(trimmed.to_owned()))
}
