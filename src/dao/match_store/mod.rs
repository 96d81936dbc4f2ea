pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::MatchEntity;
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

pub use self::memory::MemoryMatchStore;

/// Selection applied when listing matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchFilter {
    All,
    /// Only matches whose status is `live`.
    Live,
}

/// Abstraction over the persistence layer for match aggregates.
///
/// Listings are sorted by scheduled time, newest first.
pub trait MatchStore: Send + Sync {
    fn insert_match(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Replace the stored document only if its version still equals `expected_version`.
    ///
    /// Returns `false` when the document moved on or no longer exists.
    fn replace_match(
        &self,
        entity: MatchEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    fn find_match(&self, id: String) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>>;
    fn list_matches(&self, filter: MatchFilter)
    -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>>;
    fn delete_match(&self, id: String) -> BoxFuture<'static, StorageResult<bool>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
