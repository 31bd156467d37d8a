/// Configuration for a rate limit rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitRule {
    /// Category name such as `copilot_actions`.
    pub category: String,
    /// Maximum number of attempts allowed in the window.
    pub max_attempts: i32,
    /// Window duration in seconds.
    pub window_seconds: i64,
}

impl RateLimitRule {
    /// Creates a new rate limit rule.
    #[must_use]
    pub fn new(category: impl Into<String>, max_attempts: i32, window_seconds: i64) -> Self {
        Self {
            category: category.into(),
            max_attempts,
            window_seconds,
        }
    }
}

/// Per-subsystem budgets applied to each actor within a company.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopilotRateLimits {
    /// Budget for action planning.
    pub actions: RateLimitRule,
    /// Budget for workflow start, next and complete.
    pub workflows: RateLimitRule,
    /// Budget for chat messages.
    pub chat: RateLimitRule,
}

impl CopilotRateLimits {
    /// Applies the same per-minute budget to every subsystem.
    #[must_use]
    pub fn per_minute(max_attempts: i32) -> Self {
        Self {
            actions: RateLimitRule::new("copilot_actions", max_attempts, 60),
            workflows: RateLimitRule::new("copilot_workflows", max_attempts, 60),
            chat: RateLimitRule::new("copilot_chat", max_attempts, 60),
        }
    }
}
