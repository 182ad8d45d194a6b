//! In-memory repository implementations for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use chrono::Utc;
use pronouns_types::error::StoreError;
use pronouns_types::identity::{IdentityId, PlatformId, PlatformLink};
use pronouns_types::record::{FrontEnd, PreferenceRecord, PreferenceRevision};

use crate::repository::identity::IdentityRepository;
use crate::repository::preference::PreferenceRepository;

#[derive(Default)]
pub struct MemoryIdentityRepository {
    links: Mutex<HashMap<PlatformId, PlatformLink>>,
    identities: Mutex<Vec<IdentityId>>,
    pub find_calls: AtomicU32,
}

impl IdentityRepository for MemoryIdentityRepository {
    async fn find(&self, platform_id: &PlatformId) -> Result<Option<IdentityId>, StoreError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .links
            .lock()
            .unwrap()
            .get(platform_id)
            .map(|l| l.identity_id))
    }

    async fn find_or_create(
        &self,
        platform_id: &PlatformId,
        candidate: IdentityId,
    ) -> Result<IdentityId, StoreError> {
        let mut links = self.links.lock().unwrap();
        if let Some(link) = links.get(platform_id) {
            return Ok(link.identity_id);
        }
        self.identities.lock().unwrap().push(candidate);
        links.insert(
            platform_id.clone(),
            PlatformLink {
                platform_id: platform_id.clone(),
                identity_id: candidate,
                linked_at: Utc::now(),
            },
        );
        Ok(candidate)
    }

    async fn exists(&self, identity: &IdentityId) -> Result<bool, StoreError> {
        Ok(self.identities.lock().unwrap().contains(identity))
    }

    async fn link(&self, platform_id: &PlatformId, identity: &IdentityId) -> Result<(), StoreError> {
        self.links.lock().unwrap().insert(
            platform_id.clone(),
            PlatformLink {
                platform_id: platform_id.clone(),
                identity_id: *identity,
                linked_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn links(&self, identity: &IdentityId) -> Result<Vec<PlatformLink>, StoreError> {
        let mut links: Vec<PlatformLink> = self
            .links
            .lock()
            .unwrap()
            .values()
            .filter(|l| l.identity_id == *identity)
            .cloned()
            .collect();
        links.sort_by_key(|l| l.linked_at);
        Ok(links)
    }
}

/// Preference store with switchable failure injection.
#[derive(Default)]
pub struct MemoryPreferenceRepository {
    records: Mutex<HashMap<IdentityId, PreferenceRecord>>,
    history: Mutex<Vec<PreferenceRevision>>,
    /// Number of upcoming calls that fail with `StorageUnavailable`.
    pub fail_next: AtomicU32,
    /// Make every call fail with `StorageCorrupt`.
    pub corrupt: AtomicBool,
    /// Artificial latency per call.
    pub delay: Mutex<Option<Duration>>,
    /// One-shot stall after a write has committed, as if the
    /// acknowledgement were lost.
    pub stall_after_commit: Mutex<Option<Duration>>,
    pub get_calls: AtomicU32,
    pub set_calls: AtomicU32,
}

impl MemoryPreferenceRepository {
    async fn gate(&self) -> Result<(), StoreError> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.corrupt.load(Ordering::SeqCst) {
            return Err(StoreError::StorageCorrupt("injected".to_string()));
        }
        let remaining = self.fail_next.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_next.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::StorageUnavailable("injected".to_string()));
        }
        Ok(())
    }
}

impl PreferenceRepository for MemoryPreferenceRepository {
    async fn get(&self, identity: &IdentityId) -> Result<PreferenceRecord, StoreError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.gate().await?;
        self.records
            .lock()
            .unwrap()
            .get(identity)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn set(
        &self,
        identity: &IdentityId,
        pronouns: &[String],
        expected_version: u64,
        updated_by: FrontEnd,
    ) -> Result<PreferenceRecord, StoreError> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        self.gate().await?;
        let record = {
            let mut records = self.records.lock().unwrap();
            let actual = records.get(identity).map(|r| r.version).unwrap_or(0);
            if actual != expected_version {
                return Err(StoreError::VersionConflict {
                    expected: expected_version,
                    actual,
                });
            }
            let record = PreferenceRecord {
                identity_id: *identity,
                pronouns: pronouns.to_vec(),
                version: actual + 1,
                updated_at: Utc::now(),
                updated_by,
            };
            self.history.lock().unwrap().push(PreferenceRevision {
                identity_id: *identity,
                version: record.version,
                pronouns: record.pronouns.clone(),
                updated_at: record.updated_at,
                updated_by,
            });
            records.insert(*identity, record.clone());
            record
        };

        let stall = self.stall_after_commit.lock().unwrap().take();
        if let Some(stall) = stall {
            tokio::time::sleep(stall).await;
        }
        Ok(record)
    }

    async fn history(&self, identity: &IdentityId) -> Result<Vec<PreferenceRevision>, StoreError> {
        self.gate().await?;
        Ok(self
            .history
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.identity_id == *identity)
            .cloned()
            .collect())
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<PreferenceRecord>, StoreError> {
        self.gate().await?;
        let mut all: Vec<PreferenceRecord> = self.records.lock().unwrap().values().cloned().collect();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(all
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.gate().await?;
        Ok(self.records.lock().unwrap().len() as u64)
    }
}
