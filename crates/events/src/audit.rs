//! Audit recording service.
//!
//! [`AuditRecorder`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! broadcast channel and appends every received [`PlatformEvent`] to the
//! integration's hash-chained audit log. It runs as a long-lived background
//! task and shuts down gracefully when the bus sender is dropped.

use std::sync::Arc;

use chrono::SubsecRound;
use embedkit_core::audit::{redact_sensitive_fields, AuditEntry, NewAuditEntry};
use embedkit_core::error::CoreError;
use embedkit_core::store::AuditStore;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::bus::PlatformEvent;

/// Background service that writes platform events to the audit log.
pub struct AuditRecorder;

impl AuditRecorder {
    /// Run the recording loop.
    ///
    /// The loop exits when the channel is closed (i.e. the
    /// [`EventBus`](crate::bus::EventBus) is dropped).
    pub async fn run(store: Arc<dyn AuditStore>, mut receiver: broadcast::Receiver<PlatformEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = Self::record(store.as_ref(), &event).await {
                        tracing::error!(
                            error = %e,
                            event_type = %event.event_type,
                            integration_id = event.integration_id,
                            "Failed to record audit entry"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        skipped = n,
                        "Audit recorder lagged, some events were not recorded"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, audit recorder shutting down");
                    break;
                }
            }
        }
    }

    /// Append a single event to the audit log.
    pub async fn record(
        store: &dyn AuditStore,
        event: &PlatformEvent,
    ) -> Result<AuditEntry, CoreError> {
        store.append_audit(&Self::entry_for(event)).await
    }

    /// Build the audit entry for an event: sensitive payload keys are
    /// redacted and the event id is kept alongside the payload.
    pub fn entry_for(event: &PlatformEvent) -> NewAuditEntry {
        let mut details = match redact_sensitive_fields(&event.payload) {
            Value::Object(map) => map,
            other => {
                let mut map = serde_json::Map::new();
                map.insert("payload".into(), other);
                map
            }
        };
        details.insert("event_id".into(), Value::String(event.event_id.to_string()));

        NewAuditEntry {
            integration_id: event.integration_id,
            event_type: event.event_type.clone(),
            entity_type: event.source_entity_type.clone(),
            entity_id: event.source_entity_id,
            actor: event.actor.clone(),
            details: Value::Object(details),
            // Stored timestamps keep microseconds; hash what will be read back.
            created_at: event.timestamp.trunc_subsecs(6),
        }
    }
}
