use std::sync::Arc;

use embedkit_core::lifecycle::VersionService;
use embedkit_core::store::{AuditStore, EmbedKeyStore, MemoryStore, VersionStore};
use embedkit_db::{DbPool, PgStore};
use embedkit_events::{EventBus, PlatformEvent};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Version lifecycle: drafts, approvals, publishing, rollback, diff.
    pub versions: VersionService,
    pub embed_keys: Arc<dyn EmbedKeyStore>,
    pub audit: Arc<dyn AuditStore>,
    /// Present only when running on PostgreSQL; used by the health check.
    pub pool: Option<DbPool>,
    pub config: Arc<ServerConfig>,
    /// Centralized event bus for lifecycle events.
    pub event_bus: Arc<EventBus>,
}

impl AppState {
    /// Build state around one store that implements every store trait.
    pub fn with_store<S>(
        store: Arc<S>,
        pool: Option<DbPool>,
        config: ServerConfig,
        event_bus: Arc<EventBus>,
    ) -> Self
    where
        S: VersionStore + EmbedKeyStore + AuditStore,
    {
        Self {
            versions: VersionService::new(store.clone()),
            embed_keys: store.clone(),
            audit: store,
            pool,
            config: Arc::new(config),
            event_bus,
        }
    }

    /// State backed by PostgreSQL.
    pub fn postgres(pool: DbPool, config: ServerConfig, event_bus: Arc<EventBus>) -> Self {
        let store = Arc::new(PgStore::new(pool.clone()));
        Self::with_store(store, Some(pool), config, event_bus)
    }

    /// State backed by the process-local store. Data is lost on restart.
    pub fn in_memory(config: ServerConfig, event_bus: Arc<EventBus>) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), None, config, event_bus)
    }

    pub fn publish(&self, event: PlatformEvent) {
        self.event_bus.publish(event);
    }
}
