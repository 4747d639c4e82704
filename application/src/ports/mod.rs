//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters and external
//! integrations implement.

pub mod confidence_provider;
pub mod hook_registry;
pub mod insight_observer;
pub mod snapshot_store;
