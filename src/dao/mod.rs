//! Persistence layer: backend-agnostic models, the session store trait, the
//! MongoDB backend, and the local staker-config fallback cache.

/// Local best-effort cache for staker configurations.
pub mod cache;
/// Database model definitions.
pub mod models;
/// Session and stake storage and retrieval operations.
pub mod session_store;
/// Storage abstraction layer for database operations.
pub mod storage;
