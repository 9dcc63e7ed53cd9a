use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use super::jwt::JwtKeys;
use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

/// Identity of whoever issued the request. Services decide what each
/// kind of caller may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    User { id: Uuid, is_staff: bool },
}

impl Caller {
    pub fn require_authenticated(&self) -> AppResult<Uuid> {
        match *self {
            Caller::Anonymous => Err(AppError::NotAuthenticated),
            Caller::User { id, .. } => Ok(id),
        }
    }

    pub fn require_admin(&self) -> AppResult<Uuid> {
        match *self {
            Caller::Anonymous => Err(AppError::NotAuthenticated),
            Caller::User { is_staff: false, .. } => Err(AppError::PermissionDenied),
            Caller::User { id, is_staff: true } => Ok(id),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // No credentials, or a scheme we don't handle: anonymous
        let Some(auth) = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
        else {
            return Ok(Caller::Anonymous);
        };
        let Some(token) = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
        else {
            return Ok(Caller::Anonymous);
        };

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify_access(token.trim()).map_err(|e| {
            warn!(error = %e, "rejected bearer token");
            AppError::InvalidToken
        })?;

        // Staff flag is read fresh so revoked rights apply immediately
        let user = state
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| {
                warn!(user_id = %claims.sub, "token for unknown user");
                AppError::InvalidToken
            })?;

        Ok(Caller::User {
            id: user.id,
            is_staff: user.is_staff,
        })
    }
}
