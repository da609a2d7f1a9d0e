use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Routes mounted at `/embed-keys`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}",
            get(handlers::embed_keys::get_by_id)
                .patch(handlers::embed_keys::update)
                .delete(handlers::embed_keys::delete),
        )
        .route("/{id}/rotate", post(handlers::embed_keys::rotate))
}
