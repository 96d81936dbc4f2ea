use std::{cmp::Reverse, sync::Arc};

use dashmap::DashMap;
use futures::future::{BoxFuture, ready};

use crate::{
    dao::{
        match_store::{MatchFilter, MatchStore},
        models::MatchEntity,
        storage::StorageResult,
    },
    state::cricket::MatchStatus,
};

/// Process-local store. Nothing survives a restart.
#[derive(Clone, Default)]
pub struct MemoryMatchStore {
    matches: Arc<DashMap<String, MatchEntity>>,
}

impl MemoryMatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn replace(&self, entity: MatchEntity, expected_version: u64) -> bool {
        match self.matches.get_mut(&entity.id) {
            Some(mut stored) if stored.version == expected_version => {
                *stored = entity;
                true
            }
            _ => false,
        }
    }

    fn list(&self, filter: MatchFilter) -> Vec<MatchEntity> {
        let mut matches: Vec<MatchEntity> = self
            .matches
            .iter()
            .filter(|entry| match filter {
                MatchFilter::All => true,
                MatchFilter::Live => entry.status == MatchStatus::Live,
            })
            .map(|entry| entry.value().clone())
            .collect();
        matches.sort_by_key(|entity| Reverse(entity.scheduled_at));
        matches
    }
}

impl MatchStore for MemoryMatchStore {
    fn insert_match(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.matches.insert(entity.id.clone(), entity);
        Box::pin(ready(Ok(())))
    }

    fn replace_match(
        &self,
        entity: MatchEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let replaced = self.replace(entity, expected_version);
        Box::pin(ready(Ok(replaced)))
    }

    fn find_match(&self, id: String) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let found = self.matches.get(&id).map(|entry| entry.value().clone());
        Box::pin(ready(Ok(found)))
    }

    fn list_matches(
        &self,
        filter: MatchFilter,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
        let matches = self.list(filter);
        Box::pin(ready(Ok(matches)))
    }

    fn delete_match(&self, id: String) -> BoxFuture<'static, StorageResult<bool>> {
        let removed = self.matches.remove(&id).is_some();
        Box::pin(ready(Ok(removed)))
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(ready(Ok(())))
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(ready(Ok(())))
    }
}
