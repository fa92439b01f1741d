use sqlx::FromRow;
use time::OffsetDateTime;

use super::claims::Role;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String, // Argon2 PHC string
    pub is_activated: bool,
    pub activation_link: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub created_at: OffsetDateTime,
}

/// Fields required to insert a user; the store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_activated: bool,
    pub activation_link: Option<String>,
    pub role: Role,
}
