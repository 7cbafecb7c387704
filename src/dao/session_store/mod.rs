//! Abstraction over the persistence layer for sessions and stakes.

#[cfg(test)]
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{LiveSessionEntity, SessionRecordEntity, StakeEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Document store keyed by player/session id that the core reads from and
/// writes to. All methods are asynchronous and may fail transiently; callers
/// decide which writes are best-effort and which must be durable.
pub trait SessionStore: Send + Sync {
    /// Persist the historical record of a completed session. Returns the
    /// document id so the caller can confirm durability.
    fn save_session_record(
        &self,
        record: SessionRecordEntity,
    ) -> BoxFuture<'static, StorageResult<Uuid>>;
    /// Upsert the snapshot of an in-flight session.
    fn save_live_session(
        &self,
        session: LiveSessionEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch the in-flight session snapshot for a player, if any.
    fn find_live_session(
        &self,
        player_id: &str,
    ) -> BoxFuture<'static, StorageResult<Option<LiveSessionEntity>>>;
    /// Drop the in-flight snapshot once a session ended or was discarded.
    fn delete_live_session(&self, player_id: &str) -> BoxFuture<'static, StorageResult<()>>;
    /// Create a new stake record. Returns the document id.
    fn create_stake(&self, stake: StakeEntity) -> BoxFuture<'static, StorageResult<Uuid>>;
    /// Update an existing stake record in place.
    fn update_stake(&self, stake: StakeEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// All stake records linked to a session.
    fn fetch_stakes_for_session(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<StakeEntity>>>;
    /// Cheap connectivity probe.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Attempt to re-establish a dropped connection.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
