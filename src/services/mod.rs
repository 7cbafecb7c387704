//! Service layer: business logic invoked by the REST routes.

/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Session lifecycle logic and state management.
pub mod session_service;
/// Staking engine: config management and settlement.
pub mod staking_service;
/// Storage connection supervision and degraded-mode handling.
pub mod storage_supervisor;
