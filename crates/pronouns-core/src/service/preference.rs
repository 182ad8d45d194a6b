//! Preference service: the store fronted by the cache.
//!
//! Reads go cache-first and repopulate on a miss. Every successful write
//! invalidates the identity's cache entry before returning, so a caller that
//! observed a write never reads the pre-write value back from the cache.
//!
//! Each store call is bounded by a timeout and transient failures are
//! retried with backoff. A write whose acknowledgement was lost to a timeout
//! is recognised on retry instead of being reported as a conflict. A `StorageCorrupt` error is logged at error level;
//! nothing attempts to repair it.

use std::sync::Arc;
use std::time::Duration;

use pronouns_types::error::StoreError;
use pronouns_types::identity::IdentityId;
use pronouns_types::record::{FrontEnd, PreferenceRecord, PreferenceRevision};

use crate::cache::{CacheLookup, PreferenceCache};
use crate::repository::preference::PreferenceRepository;
use crate::retry::{RetryPolicy, retry_transient, with_timeout};

/// Cache-fronted access to preference records.
pub struct PreferenceService<P: PreferenceRepository> {
    repo: P,
    cache: Arc<PreferenceCache>,
    timeout: Duration,
    retry: RetryPolicy,
}

impl<P: PreferenceRepository> PreferenceService<P> {
    pub fn new(repo: P, cache: Arc<PreferenceCache>, timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            repo,
            cache,
            timeout,
            retry,
        }
    }

    pub fn cache(&self) -> &Arc<PreferenceCache> {
        &self.cache
    }

    pub fn repository(&self) -> &P {
        &self.repo
    }

    /// Log fatal storage errors where the operator will see them.
    fn observe<T>(&self, identity: &IdentityId, result: Result<T, StoreError>) -> Result<T, StoreError> {
        if let Err(StoreError::StorageCorrupt(reason)) = &result {
            tracing::error!(identity = %identity, %reason, "preference storage is corrupt");
        }
        result
    }

    async fn fetch(&self, identity: &IdentityId) -> Result<PreferenceRecord, StoreError> {
        let result = retry_transient(&self.retry, "get", || {
            with_timeout(self.timeout, "get", self.repo.get(identity))
        })
        .await;
        self.observe(identity, result)
    }

    /// Cache-only lookup. Never touches the store.
    pub fn get_cached(&self, identity: &IdentityId) -> CacheLookup {
        self.cache.get_cached(identity)
    }

    /// Current record, or `StoreError::NotFound` if never written.
    ///
    /// Absent records are cached as empty version-0 records so repeated
    /// lookups for users without pronouns stay off the store.
    pub async fn get(&self, identity: &IdentityId) -> Result<PreferenceRecord, StoreError> {
        let record = self.get_or_default(identity).await?;
        if record.version == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(record)
    }

    /// Current record, with `NotFound` mapped to an empty version-0 record.
    pub async fn get_or_default(&self, identity: &IdentityId) -> Result<PreferenceRecord, StoreError> {
        let ticket = match self.cache.get_cached(identity) {
            CacheLookup::Hit(record) => return Ok(record),
            CacheLookup::Miss(ticket) => ticket,
        };

        let record = match self.fetch(identity).await {
            Ok(record) => record,
            Err(StoreError::NotFound) => PreferenceRecord::empty(*identity),
            Err(e) => return Err(e),
        };

        if !self.cache.populate(record.clone(), ticket) {
            tracing::trace!(identity = %identity, "skipped cache fill after concurrent invalidation");
        }
        Ok(record)
    }

    /// Compare-and-set the pronoun list. Returns the record as stored.
    #[tracing::instrument(skip_all, fields(identity = %identity, expected_version, by = %updated_by))]
    pub async fn set(
        &self,
        identity: &IdentityId,
        pronouns: &[String],
        expected_version: u64,
        updated_by: FrontEnd,
    ) -> Result<PreferenceRecord, StoreError> {
        let result = self
            .write("set", identity, pronouns, expected_version, updated_by)
            .await;
        self.after_write(identity, result)
    }

    /// Compare-and-set an empty pronoun list. Returns the record as stored.
    #[tracing::instrument(skip_all, fields(identity = %identity, expected_version, by = %updated_by))]
    pub async fn clear(
        &self,
        identity: &IdentityId,
        expected_version: u64,
        updated_by: FrontEnd,
    ) -> Result<PreferenceRecord, StoreError> {
        let result = self
            .write("clear", identity, &[], expected_version, updated_by)
            .await;
        self.after_write(identity, result)
    }

    /// One compare-and-set with transient retries.
    ///
    /// A timed-out attempt may still have committed. If a retry then
    /// conflicts one version ahead, the stored record is checked and
    /// returned when it is that earlier attempt's write.
    async fn write(
        &self,
        op: &'static str,
        identity: &IdentityId,
        pronouns: &[String],
        expected_version: u64,
        updated_by: FrontEnd,
    ) -> Result<PreferenceRecord, StoreError> {
        let mut attempt = 1;
        let mut unacknowledged = false;
        loop {
            let result = if pronouns.is_empty() {
                with_timeout(
                    self.timeout,
                    op,
                    self.repo.clear(identity, expected_version, updated_by),
                )
                .await
            } else {
                with_timeout(
                    self.timeout,
                    op,
                    self.repo.set(identity, pronouns, expected_version, updated_by),
                )
                .await
            };

            match result {
                Err(StoreError::VersionConflict { actual, .. })
                    if unacknowledged && actual == expected_version + 1 =>
                {
                    return self
                        .reconcile(identity, pronouns, expected_version, updated_by)
                        .await;
                }
                Err(err) if self.retry.should_retry(attempt, &err) => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        op,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient storage failure, retrying"
                    );
                    unacknowledged = true;
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn reconcile(
        &self,
        identity: &IdentityId,
        pronouns: &[String],
        expected_version: u64,
        updated_by: FrontEnd,
    ) -> Result<PreferenceRecord, StoreError> {
        let stored = with_timeout(self.timeout, "get", self.repo.get(identity)).await?;
        if stored.version == expected_version + 1
            && stored.pronouns == pronouns
            && stored.updated_by == updated_by
        {
            tracing::debug!(version = stored.version, "earlier unacknowledged write had committed");
            return Ok(stored);
        }
        Err(StoreError::VersionConflict {
            expected: expected_version,
            actual: stored.version,
        })
    }

    fn after_write(
        &self,
        identity: &IdentityId,
        result: Result<PreferenceRecord, StoreError>,
    ) -> Result<PreferenceRecord, StoreError> {
        match &result {
            Ok(record) => {
                self.cache.invalidate(identity);
                tracing::info!(version = record.version, "preference written");
            }
            Err(StoreError::VersionConflict { expected, actual }) => {
                // Another process may have written; whatever we cached is stale.
                self.cache.invalidate(identity);
                tracing::debug!(expected, actual, "version conflict");
            }
            Err(_) => {}
        }
        self.observe(identity, result)
    }

    /// Read-modify-write with conflict retries.
    ///
    /// `f` computes the new pronoun list from the current record. On a
    /// version conflict the record is re-read and `f` applied again, up to
    /// the retry policy's attempt limit. Returns the record as written.
    pub async fn update<F>(
        &self,
        identity: &IdentityId,
        updated_by: FrontEnd,
        f: F,
    ) -> Result<PreferenceRecord, StoreError>
    where
        F: Fn(&PreferenceRecord) -> Vec<String> + Send + Sync,
    {
        let mut attempt = 1;
        loop {
            let current = self.get_or_default(identity).await?;
            let pronouns = f(&current);

            match self.set(identity, &pronouns, current.version, updated_by).await {
                Ok(record) => return Ok(record),
                Err(StoreError::VersionConflict { .. }) if attempt < self.retry.max_attempts => {
                    tokio::time::sleep(self.retry.delay_for(attempt)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Drop the cached record, e.g. when a player leaves the server.
    pub fn invalidate(&self, identity: &IdentityId) {
        self.cache.invalidate(identity);
    }

    pub async fn history(&self, identity: &IdentityId) -> Result<Vec<PreferenceRevision>, StoreError> {
        let result = retry_transient(&self.retry, "history", || {
            with_timeout(self.timeout, "history", self.repo.history(identity))
        })
        .await;
        self.observe(identity, result)
    }

    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<PreferenceRecord>, StoreError> {
        retry_transient(&self.retry, "list", || {
            with_timeout(self.timeout, "list", self.repo.list(limit, offset))
        })
        .await
    }

    pub async fn count(&self) -> Result<u64, StoreError> {
        retry_transient(&self.retry, "count", || {
            with_timeout(self.timeout, "count", self.repo.count())
        })
        .await
    }
}
