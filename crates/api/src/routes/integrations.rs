use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Routes mounted at `/integrations`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::integrations::list).post(handlers::integrations::create),
        )
        .route("/{id}", get(handlers::integrations::get_by_id))
        .route(
            "/{id}/approval-workflow",
            get(handlers::integrations::get_workflow).put(handlers::integrations::update_workflow),
        )
        .route(
            "/{id}/versions",
            get(handlers::versions::list_by_integration).post(handlers::versions::create_draft),
        )
        .route(
            "/{id}/versions/published",
            get(handlers::versions::get_published),
        )
        .route("/{id}/rollback", post(handlers::rollback::rollback))
        .route(
            "/{id}/embed-keys",
            get(handlers::embed_keys::list_by_integration).post(handlers::embed_keys::create),
        )
        .route("/{id}/audit-log", get(handlers::audit::list))
        .route("/{id}/audit-log/verify", get(handlers::audit::verify))
}
