//! Domain core for the integration configuration service.
//!
//! Everything here is storage-agnostic: the snapshot schema, the diff
//! engine, the version status machine, approval policy, the store traits
//! with an in-memory implementation, and the lifecycle service that drives
//! approvals, publishing, and rollback on top of any [`store::VersionStore`].

pub mod approval;
pub mod audit;
pub mod diff;
pub mod embed_keys;
pub mod error;
pub mod hashing;
pub mod integration;
pub mod lifecycle;
pub mod pagination;
pub mod snapshot;
pub mod store;
pub mod types;
pub mod versioning;
