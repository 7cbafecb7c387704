//! In-memory [`SessionStore`] double used by service tests: records every
//! write and can be told to fail specific operations on demand.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    models::{LiveSessionEntity, SessionRecordEntity, StakeEntity},
    session_store::SessionStore,
    storage::{StorageError, StorageResult},
};

#[derive(Debug, thiserror::Error)]
#[error("injected failure")]
struct InjectedFailure;

fn injected(message: &str) -> StorageError {
    StorageError::unavailable(message.to_owned(), InjectedFailure)
}

#[derive(Default)]
struct Inner {
    records: Mutex<HashMap<Uuid, SessionRecordEntity>>,
    live: Mutex<HashMap<String, LiveSessionEntity>>,
    stakes: Mutex<HashMap<Uuid, StakeEntity>>,
    fail_record_writes: AtomicBool,
    fail_stake_writes: AtomicBool,
}

/// Cloneable in-memory store.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    inner: Arc<Inner>,
}

impl InMemorySessionStore {
    /// Fresh empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `save_session_record` fail until reset.
    pub fn fail_record_writes(&self, fail: bool) {
        self.inner.fail_record_writes.store(fail, Ordering::SeqCst);
    }

    /// Make stake create/update fail until reset.
    pub fn fail_stake_writes(&self, fail: bool) {
        self.inner.fail_stake_writes.store(fail, Ordering::SeqCst);
    }

    /// Stored historical record, if any.
    pub fn record(&self, id: Uuid) -> Option<SessionRecordEntity> {
        self.inner.records.lock().unwrap().get(&id).cloned()
    }

    /// Stored live snapshot for a player, if any.
    pub fn live_session(&self, player_id: &str) -> Option<LiveSessionEntity> {
        self.inner.live.lock().unwrap().get(player_id).cloned()
    }

    /// Insert a live snapshot directly, simulating a previous process run.
    pub fn seed_live_session(&self, entity: LiveSessionEntity) {
        self.inner
            .live
            .lock()
            .unwrap()
            .insert(entity.player_id.clone(), entity);
    }

    /// All stake records, in no particular order.
    pub fn stakes(&self) -> Vec<StakeEntity> {
        self.inner.stakes.lock().unwrap().values().cloned().collect()
    }
}

impl SessionStore for InMemorySessionStore {
    fn save_session_record(
        &self,
        record: SessionRecordEntity,
    ) -> BoxFuture<'static, StorageResult<Uuid>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            if inner.fail_record_writes.load(Ordering::SeqCst) {
                return Err(injected("record write failed"));
            }
            let id = record.id;
            inner.records.lock().unwrap().insert(id, record);
            Ok(id)
        })
    }

    fn save_live_session(
        &self,
        session: LiveSessionEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner
                .live
                .lock()
                .unwrap()
                .insert(session.player_id.clone(), session);
            Ok(())
        })
    }

    fn find_live_session(
        &self,
        player_id: &str,
    ) -> BoxFuture<'static, StorageResult<Option<LiveSessionEntity>>> {
        let inner = self.inner.clone();
        let player_id = player_id.to_owned();
        Box::pin(async move { Ok(inner.live.lock().unwrap().get(&player_id).cloned()) })
    }

    fn delete_live_session(&self, player_id: &str) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        let player_id = player_id.to_owned();
        Box::pin(async move {
            inner.live.lock().unwrap().remove(&player_id);
            Ok(())
        })
    }

    fn create_stake(&self, stake: StakeEntity) -> BoxFuture<'static, StorageResult<Uuid>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            if inner.fail_stake_writes.load(Ordering::SeqCst) {
                return Err(injected("stake create failed"));
            }
            let id = stake.id;
            inner.stakes.lock().unwrap().insert(id, stake);
            Ok(id)
        })
    }

    fn update_stake(&self, stake: StakeEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            if inner.fail_stake_writes.load(Ordering::SeqCst) {
                return Err(injected("stake update failed"));
            }
            inner.stakes.lock().unwrap().insert(stake.id, stake);
            Ok(())
        })
    }

    fn fetch_stakes_for_session(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<StakeEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner
                .stakes
                .lock()
                .unwrap()
                .values()
                .filter(|stake| stake.session_id == session_id)
                .cloned()
                .collect())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
