pub mod approvals;
pub mod audit;
pub mod embed_keys;
pub mod integrations;
pub mod rollback;
pub mod versions;

use embedkit_core::versioning::{PublishOutcome, Version};
use embedkit_events::{event_types, PlatformEvent};
use serde_json::json;

use crate::state::AppState;

/// Event for a single version, sourced on that version.
pub(crate) fn version_event(event_type: &str, version: &Version) -> PlatformEvent {
    PlatformEvent::new(event_type, version.integration_id).with_source("version", version.id)
}

/// Emit `version.archived` (when something was displaced) followed by
/// `version.published` for a completed publish.
pub(crate) fn emit_publish_events(state: &AppState, outcome: &PublishOutcome, actor: Option<&str>) {
    let published = &outcome.published;

    if let Some(archived) = &outcome.archived {
        state.publish(
            version_event(event_types::VERSION_ARCHIVED, archived).with_payload(json!({
                "version_label": archived.version_label,
                "superseded_by": published.id,
            })),
        );
    }

    let mut event = version_event(event_types::VERSION_PUBLISHED, published).with_payload(json!({
        "version_label": published.version_label,
        "snapshot_hash": published.snapshot_hash,
        "archived_version_id": outcome.archived.as_ref().map(|v| v.id),
        "is_rollback": published.is_rollback,
    }));
    if let Some(actor) = actor {
        event = event.with_actor(actor);
    }
    state.publish(event);
}
