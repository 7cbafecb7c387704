use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{Client, Collection, Database, bson::doc, options::IndexOptions};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        MongoLiveSessionDocument, MongoSessionRecordDocument, MongoStakeDocument, doc_id,
        uuid_as_binary,
    },
};
use crate::dao::{
    models::{LiveSessionEntity, SessionRecordEntity, StakeEntity},
    session_store::SessionStore,
    storage::StorageResult,
};

const RECORD_COLLECTION_NAME: &str = "session_records";
const LIVE_COLLECTION_NAME: &str = "live_sessions";
const STAKE_COLLECTION_NAME: &str = "stakes";

/// MongoDB-backed [`SessionStore`].
#[derive(Clone)]
pub struct MongoSessionStore {
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

impl MongoSessionStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        // One live session per player; lookups during restore go by player id.
        let live_collection = database.collection::<MongoLiveSessionDocument>(LIVE_COLLECTION_NAME);
        let live_index = mongodb::IndexModel::builder()
            .keys(doc! {"player_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("live_player_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        live_collection
            .create_index(live_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: LIVE_COLLECTION_NAME,
                index: "player_id",
                source,
            })?;

        let stake_collection = database.collection::<MongoStakeDocument>(STAKE_COLLECTION_NAME);
        let stake_index = mongodb::IndexModel::builder()
            .keys(doc! {"session_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("stake_session_idx".to_owned()))
                    .build(),
            )
            .build();
        stake_collection
            .create_index(stake_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: STAKE_COLLECTION_NAME,
                index: "session_id",
                source,
            })?;

        let record_collection =
            database.collection::<MongoSessionRecordDocument>(RECORD_COLLECTION_NAME);
        let record_index = mongodb::IndexModel::builder()
            .keys(doc! {"player_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("record_player_idx".to_owned()))
                    .build(),
            )
            .build();
        record_collection
            .create_index(record_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: RECORD_COLLECTION_NAME,
                index: "player_id",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn record_collection(&self) -> Collection<MongoSessionRecordDocument> {
        self.database()
            .await
            .collection::<MongoSessionRecordDocument>(RECORD_COLLECTION_NAME)
    }

    async fn live_collection(&self) -> Collection<MongoLiveSessionDocument> {
        self.database()
            .await
            .collection::<MongoLiveSessionDocument>(LIVE_COLLECTION_NAME)
    }

    async fn stake_collection(&self) -> Collection<MongoStakeDocument> {
        self.database()
            .await
            .collection::<MongoStakeDocument>(STAKE_COLLECTION_NAME)
    }

    async fn save_session_record(&self, record: SessionRecordEntity) -> MongoResult<Uuid> {
        let id = record.id;
        let document: MongoSessionRecordDocument = record.into();
        let collection = self.record_collection().await;
        collection
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveRecord { id, source })?;

        Ok(id)
    }

    async fn save_live_session(&self, session: LiveSessionEntity) -> MongoResult<()> {
        let player_id = session.player_id.clone();
        let document: MongoLiveSessionDocument = session.into();
        let collection = self.live_collection().await;
        collection
            .replace_one(doc! {"player_id": &player_id}, &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveLiveSession { player_id, source })?;

        Ok(())
    }

    async fn find_live_session(&self, player_id: String) -> MongoResult<Option<LiveSessionEntity>> {
        let collection = self.live_collection().await;
        let document = collection
            .find_one(doc! {"player_id": &player_id})
            .await
            .map_err(|source| MongoDaoError::LoadLiveSession { player_id, source })?;

        Ok(document.map(Into::into))
    }

    async fn delete_live_session(&self, player_id: String) -> MongoResult<()> {
        let collection = self.live_collection().await;
        collection
            .delete_one(doc! {"player_id": &player_id})
            .await
            .map_err(|source| MongoDaoError::DeleteLiveSession { player_id, source })?;

        Ok(())
    }

    async fn create_stake(&self, stake: StakeEntity) -> MongoResult<Uuid> {
        let id = stake.id;
        let document: MongoStakeDocument = stake.into();
        let collection = self.stake_collection().await;
        collection
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::CreateStake { id, source })?;

        Ok(id)
    }

    async fn update_stake(&self, stake: StakeEntity) -> MongoResult<()> {
        let id = stake.id;
        let document: MongoStakeDocument = stake.into();
        let collection = self.stake_collection().await;
        collection
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::UpdateStake { id, source })?;

        Ok(())
    }

    async fn fetch_stakes_for_session(&self, session_id: Uuid) -> MongoResult<Vec<StakeEntity>> {
        let collection = self.stake_collection().await;
        let documents: Vec<MongoStakeDocument> = collection
            .find(doc! {"session_id": uuid_as_binary(session_id)})
            .await
            .map_err(|source| MongoDaoError::ListStakes { session_id, source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListStakes { session_id, source })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }
}

impl SessionStore for MongoSessionStore {
    fn save_session_record(
        &self,
        record: SessionRecordEntity,
    ) -> BoxFuture<'static, StorageResult<Uuid>> {
        let store = self.clone();
        Box::pin(async move { store.save_session_record(record).await.map_err(Into::into) })
    }

    fn save_live_session(
        &self,
        session: LiveSessionEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_live_session(session).await.map_err(Into::into) })
    }

    fn find_live_session(
        &self,
        player_id: &str,
    ) -> BoxFuture<'static, StorageResult<Option<LiveSessionEntity>>> {
        let store = self.clone();
        let player_id = player_id.to_owned();
        Box::pin(async move { store.find_live_session(player_id).await.map_err(Into::into) })
    }

    fn delete_live_session(&self, player_id: &str) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let player_id = player_id.to_owned();
        Box::pin(async move {
            store
                .delete_live_session(player_id)
                .await
                .map_err(Into::into)
        })
    }

    fn create_stake(&self, stake: StakeEntity) -> BoxFuture<'static, StorageResult<Uuid>> {
        let store = self.clone();
        Box::pin(async move { store.create_stake(stake).await.map_err(Into::into) })
    }

    fn update_stake(&self, stake: StakeEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.update_stake(stake).await.map_err(Into::into) })
    }

    fn fetch_stakes_for_session(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<StakeEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .fetch_stakes_for_session(session_id)
                .await
                .map_err(Into::into)
        })
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
