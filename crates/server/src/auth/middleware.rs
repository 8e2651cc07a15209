use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::config::AppState;
use crate::ctx::Ctx;
use crate::error::{Error, Result};

pub async fn mw_require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    debug!("MIDDLEWARE: require_auth");

    let auth_header = match req.headers().get(header::AUTHORIZATION) {
        Some(h) => h.to_str().map_err(|_| Error::AuthFailTokenWrongFormat)?,
        None => return Err(Error::AuthFailNoToken),
    };

    // Format: "Bearer <token>"
    if !auth_header.starts_with("Bearer ") {
        return Err(Error::AuthFailTokenWrongFormat);
    }

    let token = auth_header[7..].to_string();

    let user = state
        .auth
        .validate_session(&token)
        .await
        .map_err(|_| Error::AuthFailInvalidToken)?;

    req.extensions_mut().insert(Ctx::new(user, token));

    Ok(next.run(req).await)
}
