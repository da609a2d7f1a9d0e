//! Handlers for widget embed keys.
//!
//! The plaintext key is returned exactly once, from `create` and `rotate`.
//! Every other response carries only the display prefix.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use embedkit_core::embed_keys::{self, EmbedKey, NewEmbedKey, UpdateEmbedKey};
use embedkit_core::error::CoreError;
use embedkit_core::types::DbId;
use embedkit_events::{event_types, PlatformEvent};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateEmbedKeyRequest {
    pub label: String,
}

/// A key together with its one-time plaintext.
#[derive(Debug, Serialize)]
pub struct EmbedKeyCreatedResponse {
    pub key: EmbedKey,
    pub plaintext: String,
}

fn key_event(event_type: &str, key: &EmbedKey) -> PlatformEvent {
    PlatformEvent::new(event_type, key.integration_id)
        .with_source("embed_key", key.id)
        .with_payload(json!({
            "label": key.label,
            "key_prefix": key.key_prefix,
            "is_active": key.is_active,
        }))
}

/// GET /api/v1/integrations/{id}/embed-keys
pub async fn list_by_integration(
    State(state): State<AppState>,
    Path(integration_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<EmbedKey>>>> {
    state.versions.get_integration(integration_id).await?;
    let keys = state.embed_keys.list_keys(integration_id).await?;
    Ok(Json(DataResponse { data: keys }))
}

/// POST /api/v1/integrations/{id}/embed-keys
pub async fn create(
    State(state): State<AppState>,
    Path(integration_id): Path<DbId>,
    Json(body): Json<CreateEmbedKeyRequest>,
) -> AppResult<(StatusCode, Json<EmbedKeyCreatedResponse>)> {
    let label = embed_keys::validate_label(&body.label).map_err(CoreError::Validation)?;
    let generated = embed_keys::generate_embed_key();

    let key = state
        .embed_keys
        .create_key(&NewEmbedKey {
            integration_id,
            label,
            key_prefix: generated.prefix,
            key_hash: generated.hash,
        })
        .await?;

    tracing::info!(key_id = key.id, integration_id, "Embed key created");
    state.publish(key_event(event_types::EMBED_KEY_CREATED, &key));

    Ok((
        StatusCode::CREATED,
        Json(EmbedKeyCreatedResponse {
            key,
            plaintext: generated.plaintext,
        }),
    ))
}

/// GET /api/v1/embed-keys/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<EmbedKey>> {
    let key = state.embed_keys.get_key(id).await?;
    Ok(Json(key))
}

/// PATCH /api/v1/embed-keys/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<UpdateEmbedKey>,
) -> AppResult<Json<EmbedKey>> {
    let label = body
        .label
        .as_deref()
        .map(embed_keys::validate_label)
        .transpose()
        .map_err(CoreError::Validation)?;

    let key = state
        .embed_keys
        .update_key(
            id,
            &UpdateEmbedKey {
                label,
                is_active: body.is_active,
            },
        )
        .await?;

    state.publish(key_event(event_types::EMBED_KEY_UPDATED, &key));
    Ok(Json(key))
}

/// POST /api/v1/embed-keys/{id}/rotate
///
/// Issues a new plaintext; the previous key stops matching immediately.
pub async fn rotate(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<EmbedKeyCreatedResponse>> {
    let generated = embed_keys::generate_embed_key();
    let key = state
        .embed_keys
        .rotate_key(id, &generated.prefix, &generated.hash, Utc::now())
        .await?;

    tracing::info!(key_id = key.id, integration_id = key.integration_id, "Embed key rotated");
    state.publish(key_event(event_types::EMBED_KEY_ROTATED, &key));

    Ok(Json(EmbedKeyCreatedResponse {
        key,
        plaintext: generated.plaintext,
    }))
}

/// DELETE /api/v1/embed-keys/{id}
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let key = state.embed_keys.get_key(id).await?;
    if !state.embed_keys.delete_key(id).await? {
        return Err(CoreError::NotFound {
            entity: "EmbedKey",
            id,
        }
        .into());
    }

    state.publish(key_event(event_types::EMBED_KEY_DELETED, &key));
    Ok(StatusCode::NO_CONTENT)
}
