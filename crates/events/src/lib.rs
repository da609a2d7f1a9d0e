//! Embedkit event bus and audit recording.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`]: the lifecycle event envelope.
//! - [`event_types`]: the dot-separated event names.
//! - [`AuditRecorder`]: background service that appends every event to the
//!   hash-chained audit log.

pub mod audit;
pub mod bus;
pub mod event_types;

pub use audit::AuditRecorder;
pub use bus::{EventBus, PlatformEvent};
