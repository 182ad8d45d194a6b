//! Identity key resolver.
//!
//! Maps platform-specific user IDs onto canonical identities, creating an
//! identity the first time a platform ID is seen. Resolution is idempotent
//! and backed by a process-local memo so hot paths skip the store.

use std::time::Duration;

use dashmap::DashMap;
use pronouns_types::error::StoreError;
use pronouns_types::identity::{IdentityId, PlatformId, PlatformLink};

use crate::repository::identity::IdentityRepository;
use crate::retry::{RetryPolicy, retry_transient, with_timeout};

/// Resolves platform IDs to identities.
pub struct IdentityResolver<R: IdentityRepository> {
    repo: R,
    memo: DashMap<PlatformId, IdentityId>,
    timeout: Duration,
    retry: RetryPolicy,
}

impl<R: IdentityRepository> IdentityResolver<R> {
    pub fn new(repo: R, timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            repo,
            memo: DashMap::new(),
            timeout,
            retry,
        }
    }

    /// Resolve a platform ID, creating its identity on first sight.
    ///
    /// Only fails on storage errors.
    #[tracing::instrument(skip_all, fields(platform_id = %platform_id))]
    pub async fn resolve(&self, platform_id: &PlatformId) -> Result<IdentityId, StoreError> {
        if let Some(identity) = self.cached(platform_id) {
            return Ok(identity);
        }

        // The same candidate is reused across attempts, so an attempt that
        // committed before timing out is picked up by the next one.
        let candidate = IdentityId::new();
        let identity = retry_transient(&self.retry, "resolve", || {
            with_timeout(
                self.timeout,
                "resolve",
                self.repo.find_or_create(platform_id, candidate),
            )
        })
        .await?;

        if identity == candidate {
            tracing::info!(identity = %identity, "created identity");
        }
        self.memo.insert(platform_id.clone(), identity);
        Ok(identity)
    }

    /// Memoised identity for a platform ID, without touching the store.
    pub fn cached(&self, platform_id: &PlatformId) -> Option<IdentityId> {
        self.memo.get(platform_id).map(|entry| *entry.value())
    }

    /// Look up a platform ID without creating an identity.
    pub async fn find(&self, platform_id: &PlatformId) -> Result<Option<IdentityId>, StoreError> {
        if let Some(identity) = self.cached(platform_id) {
            return Ok(Some(identity));
        }
        let found = retry_transient(&self.retry, "find_identity", || {
            with_timeout(self.timeout, "find_identity", self.repo.find(platform_id))
        })
        .await?;
        if let Some(identity) = found {
            self.memo.insert(platform_id.clone(), identity);
        }
        Ok(found)
    }

    /// Re-point a platform ID at an existing identity. Last link wins.
    ///
    /// Records are not merged: whatever the previous identity had stays
    /// with it.
    #[tracing::instrument(skip_all, fields(platform_id = %platform_id, identity = %identity))]
    pub async fn link(&self, platform_id: &PlatformId, identity: &IdentityId) -> Result<(), StoreError> {
        let exists = retry_transient(&self.retry, "identity_exists", || {
            with_timeout(self.timeout, "identity_exists", self.repo.exists(identity))
        })
        .await?;
        if !exists {
            return Err(StoreError::NotFound);
        }

        retry_transient(&self.retry, "link", || {
            with_timeout(self.timeout, "link", self.repo.link(platform_id, identity))
        })
        .await?;

        if let Some(previous) = self.memo.insert(platform_id.clone(), *identity) {
            if previous != *identity {
                tracing::info!(previous = %previous, "platform id re-linked");
            }
        }
        Ok(())
    }

    /// Platform IDs mapped to an identity.
    pub async fn links(&self, identity: &IdentityId) -> Result<Vec<PlatformLink>, StoreError> {
        retry_transient(&self.retry, "links", || {
            with_timeout(self.timeout, "links", self.repo.links(identity))
        })
        .await
    }
}
