use mongodb::error::Error as MongoError;
use thiserror::Error;
use uuid::Uuid;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Typed failures for every MongoDB interaction the store performs.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to save session record `{id}`")]
    SaveRecord {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to save live session for player `{player_id}`")]
    SaveLiveSession {
        player_id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to load live session for player `{player_id}`")]
    LoadLiveSession {
        player_id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to delete live session for player `{player_id}`")]
    DeleteLiveSession {
        player_id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to create stake `{id}`")]
    CreateStake {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to update stake `{id}`")]
    UpdateStake {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to list stakes for session `{session_id}`")]
    ListStakes {
        session_id: Uuid,
        #[source]
        source: MongoError,
    },
}
