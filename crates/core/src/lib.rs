//! Shared primitives for all Rust crates in Procura.

#![forbid(unsafe_code)]

/// Actor context primitives shared across services.
pub mod auth;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use auth::ActorContext;

/// Result type used across Procura crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Company (tenant) identifier used as the partition key for every persisted resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(Uuid);

impl TenantId {
    /// Creates a random tenant identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a tenant identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TenantId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for TenantId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// User is not authenticated.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but blocked by authorization policy.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Company plan or feature flags do not include the requested feature.
    #[error("entitlement denied: {0}")]
    EntitlementDenied(String),

    /// Request budget for the actor or company is exhausted.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// External collaborator is disabled, unreachable, or timed out.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Any category above tagged with a stable machine-readable code.
    #[error("{inner}")]
    Coded {
        /// Stable code clients branch on.
        code: &'static str,
        /// Underlying categorized error.
        inner: Box<AppError>,
    },
}

impl AppError {
    /// Attaches a stable machine-readable code, replacing any previous one.
    #[must_use]
    pub fn with_code(self, code: &'static str) -> Self {
        match self {
            Self::Coded { inner, .. } => Self::Coded { code, inner },
            other => Self::Coded {
                code,
                inner: Box::new(other),
            },
        }
    }

    /// Returns the attached code or the category default.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_failed",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Unauthorized(_) => "unauthenticated",
            Self::Forbidden(_) => "permission_denied",
            Self::EntitlementDenied(_) => "entitlement_denied",
            Self::RateLimited(_) => "rate_limited",
            Self::ServiceUnavailable(_) => "service_unavailable",
            Self::Internal(_) => "internal_error",
            Self::Coded { code, .. } => code,
        }
    }

    /// Returns the categorized error with any code wrapper removed.
    #[must_use]
    pub fn category(&self) -> &Self {
        match self {
            Self::Coded { inner, .. } => inner.category(),
            other => other,
        }
    }

    /// Returns the human-readable message without the category prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self.category() {
            Self::Validation(message)
            | Self::NotFound(message)
            | Self::Conflict(message)
            | Self::Unauthorized(message)
            | Self::Forbidden(message)
            | Self::EntitlementDenied(message)
            | Self::RateLimited(message)
            | Self::ServiceUnavailable(message)
            | Self::Internal(message) => message.as_str(),
            Self::Coded { .. } => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AppError, NonEmptyString, TenantId};

    #[test]
    fn non_empty_string_rejects_whitespace() {
        let result = NonEmptyString::new("   ");
        assert!(result.is_err());
    }

    #[test]
    fn tenant_id_formats_as_uuid() {
        let tenant_id = TenantId::new();
        assert_eq!(tenant_id.to_string().len(), 36);
    }

    #[test]
    fn coded_error_keeps_category_and_message() {
        let error = AppError::EntitlementDenied("workflows are off".to_owned())
            .with_code("ai_workflows_disabled");

        assert_eq!(error.code(), "ai_workflows_disabled");
        assert!(matches!(error.category(), AppError::EntitlementDenied(_)));
        assert_eq!(error.message(), "workflows are off");
        assert_eq!(error.to_string(), "entitlement denied: workflows are off");
    }

    #[test]
    fn recoding_replaces_previous_code() {
        let error = AppError::Conflict("taken".to_owned())
            .with_code("first")
            .with_code("second");

        assert_eq!(error.code(), "second");
        assert!(matches!(error.category(), AppError::Conflict(_)));
    }

    #[test]
    fn uncoded_errors_use_category_defaults() {
        assert_eq!(
            AppError::Forbidden("no".to_owned()).code(),
            "permission_denied"
        );
        assert_eq!(
            AppError::ServiceUnavailable("down".to_owned()).code(),
            "service_unavailable"
        );
    }
}
