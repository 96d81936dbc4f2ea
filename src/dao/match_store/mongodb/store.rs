use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{Document, doc},
    options::IndexOptions,
};
use tokio::sync::RwLock;
use tracing::info;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{MongoMatchDocument, doc_id, doc_id_at_version},
};
use crate::{
    dao::{
        match_store::{MatchFilter, MatchStore},
        models::MatchEntity,
        storage::StorageResult,
    },
    state::cricket::MatchStatus,
};

const MATCH_COLLECTION_NAME: &str = "matches";

#[derive(Clone)]
pub struct MongoMatchStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoMatchStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;
        info!(database = %config.database_name, "connected to MongoDB");

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let collection = self.database().await.collection::<Document>(MATCH_COLLECTION_NAME);
        for (keys, name, label) in [
            (doc! {"status": 1}, "match_status_idx", "status"),
            (doc! {"scheduled_at": -1}, "match_scheduled_at_idx", "scheduled_at"),
        ] {
            let index = IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().name(Some(name.to_owned())).build())
                .build();

            collection
                .create_index(index)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection: MATCH_COLLECTION_NAME,
                    index: label,
                    source,
                })?;
        }

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn collection(&self) -> Collection<MongoMatchDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoMatchDocument>(MATCH_COLLECTION_NAME)
    }

    async fn insert_match(&self, entity: MatchEntity) -> MongoResult<()> {
        let id = entity.id.clone();
        let document: MongoMatchDocument = entity.into();
        self.collection()
            .await
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::InsertMatch { id, source })?;
        Ok(())
    }

    async fn replace_match(&self, entity: MatchEntity, expected_version: u64) -> MongoResult<bool> {
        let id = entity.id.clone();
        let filter = doc_id_at_version(&id, expected_version);
        let document: MongoMatchDocument = entity.into();
        let result = self
            .collection()
            .await
            .replace_one(filter, &document)
            .await
            .map_err(|source| MongoDaoError::ReplaceMatch { id, source })?;
        Ok(result.matched_count == 1)
    }

    async fn find_match(&self, id: String) -> MongoResult<Option<MatchEntity>> {
        let document = self
            .collection()
            .await
            .find_one(doc_id(&id))
            .await
            .map_err(|source| MongoDaoError::LoadMatch { id, source })?;
        Ok(document.map(Into::into))
    }

    async fn list_matches(&self, filter: MatchFilter) -> MongoResult<Vec<MatchEntity>> {
        let query = match filter {
            MatchFilter::All => doc! {},
            MatchFilter::Live => doc! {"status": MatchStatus::Live.as_str()},
        };

        let documents: Vec<MongoMatchDocument> = self
            .collection()
            .await
            .find(query)
            .sort(doc! {"scheduled_at": -1})
            .await
            .map_err(|source| MongoDaoError::ListMatches { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListMatches { source })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn delete_match(&self, id: String) -> MongoResult<bool> {
        let result = self
            .collection()
            .await
            .delete_one(doc_id(&id))
            .await
            .map_err(|source| MongoDaoError::DeleteMatch { id, source })?;
        Ok(result.deleted_count > 0)
    }
}

impl MatchStore for MongoMatchStore {
    fn insert_match(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_match(entity).await.map_err(Into::into) })
    }

    fn replace_match(
        &self,
        entity: MatchEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .replace_match(entity, expected_version)
                .await
                .map_err(Into::into)
        })
    }

    fn find_match(&self, id: String) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_match(id).await.map_err(Into::into) })
    }

    fn list_matches(
        &self,
        filter: MatchFilter,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_matches(filter).await.map_err(Into::into) })
    }

    fn delete_match(&self, id: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_match(id).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
