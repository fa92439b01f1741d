use lazy_static::lazy_static;
use regex::Regex;
use tracing::info;
use uuid::Uuid;

use super::{
    claims::Role,
    password::hash_password,
    repo::UserStore,
    repo_types::NewUser,
};
use crate::config::AdminConfig;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Fresh one-time activation token.
pub(crate) fn new_activation_link() -> String {
    Uuid::new_v4().to_string()
}

/// Create the admin account unless some user already holds the admin role.
pub async fn ensure_admin(users: &dyn UserStore, cfg: &AdminConfig) -> anyhow::Result<()> {
    if let Some(admin) = users.find_admin().await? {
        info!(user_id = admin.id, "admin account present");
        return Ok(());
    }

    let admin = users
        .create(NewUser {
            username: cfg.username.clone(),
            email: normalize_email(&cfg.email),
            password_hash: hash_password(&cfg.password)?,
            is_activated: true,
            activation_link: None,
            role: Role::Admin,
        })
        .await?;
    info!(user_id = admin.id, username = %admin.username, "admin account created");
    Ok(())
}
