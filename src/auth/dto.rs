use serde::{Deserialize, Serialize};

use super::{
    claims::{Claims, Role},
    repo_types::User,
};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response returned after login.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Generic `{"message": ...}` envelope.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Identity echoed back from the caller's token.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub is_activated: bool,
    pub role: Role,
}

impl From<Claims> for UserInfo {
    fn from(c: Claims) -> Self {
        Self {
            user_id: c.user_id,
            username: c.username,
            email: c.email,
            is_activated: c.is_activated,
            role: c.role,
        }
    }
}

/// Public part of the user returned to administrators.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_activated: bool,
    pub role: Role,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            is_activated: u.is_activated,
            role: u.role,
        }
    }
}
