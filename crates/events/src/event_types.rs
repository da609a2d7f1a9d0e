//! Event type names published on the bus.

pub const INTEGRATION_CREATED: &str = "integration.created";
pub const INTEGRATION_WORKFLOW_UPDATED: &str = "integration.workflow_updated";

pub const VERSION_CREATED: &str = "version.created";
pub const VERSION_UPDATED: &str = "version.updated";
pub const VERSION_APPROVED: &str = "version.approved";
pub const VERSION_PUBLISHED: &str = "version.published";
pub const VERSION_ARCHIVED: &str = "version.archived";
pub const VERSION_ROLLED_BACK: &str = "version.rolled_back";
/// An approval satisfied the policy but the automatic publish failed.
pub const VERSION_AUTO_PUBLISH_FAILED: &str = "version.auto_publish_failed";

pub const EMBED_KEY_CREATED: &str = "embed_key.created";
pub const EMBED_KEY_UPDATED: &str = "embed_key.updated";
pub const EMBED_KEY_ROTATED: &str = "embed_key.rotated";
pub const EMBED_KEY_DELETED: &str = "embed_key.deleted";
