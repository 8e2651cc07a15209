//! Contact list

use axum::{extract::State, Json};
use tracing::info;

use crate::config::AppState;
use crate::ctx::Ctx;
use crate::error::Result;
use crate::models::{PresenceStatus, UserInfo};

/// GET /users
///
/// All other users, sorted by username. The status field reflects live
/// registry membership, not the persisted column.
pub async fn list_users(
    State(state): State<AppState>,
    ctx: Ctx,
) -> Result<Json<Vec<UserInfo>>> {
    info!("GET /users");

    let mut users = state.auth.list_users(ctx.user_id()).await?;

    for user in &mut users {
        user.status = if state.registry.is_online(&user.id) {
            PresenceStatus::Online
        } else {
            PresenceStatus::Offline
        };
    }

    Ok(Json(users))
}
