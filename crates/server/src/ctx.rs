use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::{Error, Result};
use crate::models::UserInfo;

/// Authenticated request context, inserted by the auth middleware.
#[derive(Clone, Debug)]
pub struct Ctx {
    user: UserInfo,
    token: String,
}

impl Ctx {
    pub fn new(user: UserInfo, token: String) -> Self {
        Self { user, token }
    }

    pub fn user(&self) -> &UserInfo {
        &self.user
    }

    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl<S> FromRequestParts<S> for Ctx
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<Ctx>()
            .cloned()
            .ok_or(Error::AuthFailCtxNotInRequestExt)
    }
}
