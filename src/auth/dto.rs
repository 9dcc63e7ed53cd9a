use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{jwt::TokenPair, repo_types::User};

/// Request body for user registration. Fields stay raw JSON so that missing
/// or mistyped ones can be reported per field.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: Option<Value>,
    pub email: Option<Value>,
    pub password: Option<Value>,
    pub password_confirm: Option<Value>,
}

/// Request body for login.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: Option<Value>,
    pub password: Option<Value>,
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date_joined: OffsetDateTime,
    pub is_staff: bool,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            date_joined: u.date_joined,
            is_staff: u.is_staff,
        }
    }
}

/// Response returned after login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: PublicUser,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

/// Response returned after registration.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: PublicUser,
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub message: &'static str,
}
