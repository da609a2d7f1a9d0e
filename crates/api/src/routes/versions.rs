use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Routes mounted at `/versions`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}",
            get(handlers::versions::get_by_id).patch(handlers::versions::update_metadata),
        )
        .route("/{id}/approve", post(handlers::approvals::approve))
        .route("/{id}/approvals", get(handlers::approvals::status))
        .route("/{id}/publish", post(handlers::versions::publish))
        .route("/{id}/verify", get(handlers::versions::verify))
        .route("/{id}/diff/{other_id}", get(handlers::versions::diff))
}
