//! Local fallback cache for staker configurations.
//!
//! Best-effort by design: a failed write or an unreadable file is logged and
//! swallowed, never propagated. The cache is consulted only when the
//! authoritative store has nothing for a session, so the worst case of losing
//! it is re-entering a staking config by hand.

use std::{fs, path::PathBuf};

use tracing::warn;
use uuid::Uuid;

use crate::dao::models::StakerConfigEntity;

/// File-backed cache keyed by session id, one JSON document per session.
#[derive(Debug, Clone)]
pub struct StakeConfigCache {
    dir: PathBuf,
}

impl StakeConfigCache {
    /// Cache rooted at `dir`; the directory is created lazily on first write.
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, session_id: Uuid) -> PathBuf {
        self.dir.join(format!("{session_id}.json"))
    }

    /// Persist the config set for a session. Best-effort.
    pub fn write(&self, session_id: Uuid, configs: &[StakerConfigEntity]) {
        if let Err(err) = fs::create_dir_all(&self.dir) {
            warn!(dir = %self.dir.display(), error = %err, "failed to create stake cache dir");
            return;
        }

        let payload = match serde_json::to_vec(configs) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(%session_id, error = %err, "failed to encode staker configs for cache");
                return;
            }
        };

        let path = self.path_for(session_id);
        if let Err(err) = fs::write(&path, payload) {
            warn!(path = %path.display(), error = %err, "failed to write stake cache");
        }
    }

    /// Read back the cached config set for a session, if any. Best-effort.
    pub fn read(&self, session_id: Uuid) -> Option<Vec<StakerConfigEntity>> {
        let path = self.path_for(session_id);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to read stake cache");
                return None;
            }
        };

        match serde_json::from_str(&contents) {
            Ok(configs) => Some(configs),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "stake cache entry is corrupt; ignoring");
                None
            }
        }
    }

    /// Drop the cached config set once a session has been settled or discarded.
    pub fn remove(&self, session_id: Uuid) {
        let path = self.path_for(session_id);
        if let Err(err) = fs::remove_file(&path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %err, "failed to remove stake cache entry");
            }
        }
    }
}
