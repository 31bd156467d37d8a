//! Process-local decision leases for single-instance deployments.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use procura_application::{DecisionLease, DecisionLeaseCoordinator};
use procura_core::{AppError, AppResult};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Rejects blank scopes, blank holders and zero durations.
pub(crate) fn validate_lease_request(
    scope_key: &str,
    holder_id: &str,
    lease_seconds: u32,
) -> AppResult<()> {
    if scope_key.trim().is_empty() {
        return Err(AppError::Validation(
            "decision lease scope_key must not be empty".to_owned(),
        ));
    }
    if holder_id.trim().is_empty() {
        return Err(AppError::Validation(
            "decision lease holder_id must not be empty".to_owned(),
        ));
    }
    if lease_seconds == 0 {
        return Err(AppError::Validation(
            "decision lease_seconds must be greater than zero".to_owned(),
        ));
    }

    Ok(())
}

#[derive(Debug)]
struct HeldLease {
    token: String,
    expires_at: Instant,
}

/// In-process lease table. Expired leases are taken over on the next acquire.
#[derive(Debug, Default)]
pub struct InMemoryDecisionLeaseCoordinator {
    leases: Mutex<HashMap<String, HeldLease>>,
}

impl InMemoryDecisionLeaseCoordinator {
    /// Creates an empty lease table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DecisionLeaseCoordinator for InMemoryDecisionLeaseCoordinator {
    async fn try_acquire_lease(
        &self,
        scope_key: &str,
        holder_id: &str,
        lease_seconds: u32,
    ) -> AppResult<Option<DecisionLease>> {
        validate_lease_request(scope_key, holder_id, lease_seconds)?;

        let now = Instant::now();
        let mut leases = self.leases.lock().await;
        if leases
            .get(scope_key)
            .is_some_and(|held| held.expires_at > now)
        {
            return Ok(None);
        }

        let token = format!("{holder_id}:{}", Uuid::new_v4());
        leases.insert(
            scope_key.to_owned(),
            HeldLease {
                token: token.clone(),
                expires_at: now + Duration::from_secs(u64::from(lease_seconds)),
            },
        );

        Ok(Some(DecisionLease {
            scope_key: scope_key.to_owned(),
            token,
            holder_id: holder_id.to_owned(),
        }))
    }

    async fn release_lease(&self, lease: &DecisionLease) -> AppResult<()> {
        let mut leases = self.leases.lock().await;
        if leases
            .get(lease.scope_key.as_str())
            .is_some_and(|held| held.token == lease.token)
        {
            leases.remove(lease.scope_key.as_str());
        }

        Ok(())
    }
}
