use async_trait::async_trait;
use procura_core::AppResult;

/// Exclusive decision lease over one draft or workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionLease {
    /// Coordination scope key.
    pub scope_key: String,
    /// Lease token used for safe release.
    pub token: String,
    /// Lease holder identity.
    pub holder_id: String,
}

/// Mutual-exclusion port guarding draft decisions and workflow step advancement.
#[async_trait]
pub trait DecisionLeaseCoordinator: Send + Sync {
    /// Attempts to acquire the lease. Returns `None` while another holder owns it.
    async fn try_acquire_lease(
        &self,
        scope_key: &str,
        holder_id: &str,
        lease_seconds: u32,
    ) -> AppResult<Option<DecisionLease>>;

    /// Releases a lease using token compare-and-delete semantics.
    async fn release_lease(&self, lease: &DecisionLease) -> AppResult<()>;
}
