//! Preference repository trait definition.

use pronouns_types::error::StoreError;
use pronouns_types::identity::IdentityId;
use pronouns_types::record::{FrontEnd, PreferenceRecord, PreferenceRevision};

/// Repository trait for versioned preference records.
///
/// Writes are compare-and-set on `version`: `expected_version` must equal
/// the stored version (0 when no record exists) or the call fails with
/// `StoreError::VersionConflict`. A successful write stores
/// `expected_version + 1`, appends a history revision and returns the record
/// exactly as stored.
pub trait PreferenceRepository: Send + Sync {
    /// Get the current record. `StoreError::NotFound` if never written.
    fn get(
        &self,
        identity: &IdentityId,
    ) -> impl std::future::Future<Output = Result<PreferenceRecord, StoreError>> + Send;

    /// Replace the pronoun list.
    fn set(
        &self,
        identity: &IdentityId,
        pronouns: &[String],
        expected_version: u64,
        updated_by: FrontEnd,
    ) -> impl std::future::Future<Output = Result<PreferenceRecord, StoreError>> + Send;

    /// Write an empty pronoun list, keeping history.
    fn clear(
        &self,
        identity: &IdentityId,
        expected_version: u64,
        updated_by: FrontEnd,
    ) -> impl std::future::Future<Output = Result<PreferenceRecord, StoreError>> + Send {
        self.set(identity, &[], expected_version, updated_by)
    }

    /// Every revision for an identity, ascending by version.
    fn history(
        &self,
        identity: &IdentityId,
    ) -> impl std::future::Future<Output = Result<Vec<PreferenceRevision>, StoreError>> + Send;

    /// Current records, most recently updated first.
    fn list(
        &self,
        limit: i64,
        offset: i64,
    ) -> impl std::future::Future<Output = Result<Vec<PreferenceRecord>, StoreError>> + Send;

    /// Number of identities with a record.
    fn count(&self) -> impl std::future::Future<Output = Result<u64, StoreError>> + Send;
}
