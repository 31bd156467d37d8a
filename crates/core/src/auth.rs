use serde::{Deserialize, Serialize};

use crate::{AppError, AppResult, TenantId};

/// Explicit actor passed into every permission and entitlement decision.
///
/// The HTTP boundary builds this from the authenticated session; services never
/// read the active persona or company from ambient state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorContext {
    subject: String,
    display_name: String,
    email: Option<String>,
    company_id: Option<TenantId>,
    persona: Option<String>,
    #[serde(default)]
    platform_admin: bool,
}

impl ActorContext {
    /// Creates an actor scoped to one company.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        display_name: impl Into<String>,
        email: Option<String>,
        company_id: Option<TenantId>,
    ) -> Self {
        Self {
            subject: subject.into(),
            display_name: display_name.into(),
            email,
            company_id,
            persona: None,
            platform_admin: false,
        }
    }

    /// Sets the active persona (company role key such as `buyer_admin`).
    #[must_use]
    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = Some(persona.into());
        self
    }

    /// Marks the actor as a platform administrator.
    #[must_use]
    pub fn with_platform_admin(mut self, platform_admin: bool) -> Self {
        self.platform_admin = platform_admin;
        self
    }

    /// Returns the stable subject claim from the identity provider.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.subject.as_str()
    }

    /// Returns the display name for the current user.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the email, if the provider returned one.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns the active company, if any.
    #[must_use]
    pub fn company_id(&self) -> Option<TenantId> {
        self.company_id
    }

    /// Returns the active persona key.
    #[must_use]
    pub fn persona(&self) -> Option<&str> {
        self.persona.as_deref()
    }

    /// Returns whether the actor bypasses company-level policy.
    #[must_use]
    pub fn is_platform_admin(&self) -> bool {
        self.platform_admin
    }

    /// Returns the active company or a coded forbidden error.
    pub fn require_company(&self) -> AppResult<TenantId> {
        self.company_id.ok_or_else(|| {
            AppError::Forbidden(format!(
                "subject '{}' has no active company context",
                self.subject
            ))
            .with_code("company_context_missing")
        })
    }
}
