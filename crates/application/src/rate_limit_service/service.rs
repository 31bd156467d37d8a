use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use procura_core::{ActorContext, AppError, AppResult, TenantId};

use super::config::RateLimitRule;
use super::ports::RateLimitRepository;

/// Application service for rate limiting.
#[derive(Clone)]
pub struct RateLimitService {
    repository: Arc<dyn RateLimitRepository>,
}

impl RateLimitService {
    /// Creates a new rate limit service.
    #[must_use]
    pub fn new(repository: Arc<dyn RateLimitRepository>) -> Self {
        Self { repository }
    }

    /// Records the attempt and fails with `rate_limited` once the rule's budget
    /// for `key` is exhausted.
    pub async fn check_rate_limit(&self, rule: &RateLimitRule, key: &str) -> AppResult<()> {
        let composite_key = format!("{}:{key}", rule.category);
        let info = self
            .repository
            .record_attempt(&composite_key, rule.window_seconds)
            .await?;

        if info.attempt_count > rule.max_attempts {
            info!(
                key = composite_key.as_str(),
                attempts = info.attempt_count,
                window_started_at = %info.window_started_at,
                "copilot rate limit exceeded"
            );
            return Err(AppError::RateLimited(
                "too many copilot requests, please try again later".to_owned(),
            )
            .with_code("rate_limited"));
        }

        Ok(())
    }

    /// Checks the actor's budget within one company.
    pub async fn check_actor(
        &self,
        rule: &RateLimitRule,
        tenant_id: TenantId,
        actor: &ActorContext,
    ) -> AppResult<()> {
        let key = format!("{tenant_id}:{}", actor.subject());
        self.check_rate_limit(rule, key.as_str()).await
    }

    /// Removes expired rate limit entries.
    pub async fn cleanup(&self) -> AppResult<u64> {
        let cutoff = Utc::now() - chrono::Duration::hours(24);
        self.repository.cleanup_expired(cutoff).await
    }
}
