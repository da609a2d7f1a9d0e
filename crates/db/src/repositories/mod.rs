//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods.
//! Methods that take part in multi-statement transactions accept any
//! [`sqlx::postgres::PgExecutor`], so they run equally against the pool or
//! inside an open transaction.

pub mod approval_repo;
pub mod audit_repo;
pub mod embed_key_repo;
pub mod integration_repo;
pub mod version_repo;

pub use approval_repo::ApprovalRepo;
pub use audit_repo::AuditLogRepo;
pub use embed_key_repo::EmbedKeyRepo;
pub use integration_repo::IntegrationRepo;
pub use version_repo::VersionRepo;
