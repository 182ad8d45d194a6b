//! Identity repository trait definition.

use pronouns_types::error::StoreError;
use pronouns_types::identity::{IdentityId, PlatformId, PlatformLink};

/// Repository trait for the platform ID -> identity mapping.
///
/// Implementations live in pronouns-infra (e.g., SqliteIdentityRepository).
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait IdentityRepository: Send + Sync {
    /// Look up the identity a platform ID maps to.
    fn find(
        &self,
        platform_id: &PlatformId,
    ) -> impl std::future::Future<Output = Result<Option<IdentityId>, StoreError>> + Send;

    /// Map `platform_id` to `candidate` unless it is already mapped.
    ///
    /// Returns whichever identity the platform ID maps to afterwards. Must be
    /// atomic: concurrent callers with different candidates all observe the
    /// same winner.
    fn find_or_create(
        &self,
        platform_id: &PlatformId,
        candidate: IdentityId,
    ) -> impl std::future::Future<Output = Result<IdentityId, StoreError>> + Send;

    /// Whether an identity exists.
    fn exists(
        &self,
        identity: &IdentityId,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send;

    /// Point `platform_id` at an existing identity, replacing any mapping.
    fn link(
        &self,
        platform_id: &PlatformId,
        identity: &IdentityId,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// All platform IDs mapped to an identity, oldest link first.
    fn links(
        &self,
        identity: &IdentityId,
    ) -> impl std::future::Future<Output = Result<Vec<PlatformLink>, StoreError>> + Send;
}
