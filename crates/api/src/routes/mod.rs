pub mod embed_keys;
pub mod health;
pub mod integrations;
pub mod versions;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /integrations                                    list, create
/// /integrations/{id}                               get
/// /integrations/{id}/approval-workflow             get, replace (PUT)
/// /integrations/{id}/versions                      list, create draft
/// /integrations/{id}/versions/published            current live version
/// /integrations/{id}/rollback                      roll back (POST)
/// /integrations/{id}/embed-keys                    list, create
/// /integrations/{id}/audit-log                     list entries, newest first
/// /integrations/{id}/audit-log/verify              verify the hash chain
///
/// /versions/{id}                                   get, update draft metadata (PATCH)
/// /versions/{id}/approve                           approve (POST)
/// /versions/{id}/approvals                         approval status
/// /versions/{id}/publish                           publish (POST)
/// /versions/{id}/verify                            verify snapshot hash
/// /versions/{id}/diff/{other_id}                   field-level diff
///
/// /embed-keys/{id}                                 get, update, delete
/// /embed-keys/{id}/rotate                          rotate (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/integrations", integrations::router())
        .nest("/versions", versions::router())
        .nest("/embed-keys", embed_keys::router())
}
