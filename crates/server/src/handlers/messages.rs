//! Message history

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

use crate::config::AppState;
use crate::ctx::Ctx;
use crate::error::Result;
use crate::models::Message;

/// GET /messages/{peer_id}
///
/// The full conversation between the caller and `peer_id`, oldest first.
/// Clients call this on conversation open; messages missed while offline
/// show up here.
pub async fn get_history(
    Path(peer_id): Path<String>,
    State(state): State<AppState>,
    ctx: Ctx,
) -> Result<Json<Vec<Message>>> {
    info!("GET /messages/{}", peer_id);

    let messages = state.store.history(ctx.user_id(), &peer_id).await?;

    Ok(Json(messages))
}
