use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    auth::repo_types::{NewUser, User},
    error::StoreError,
};

/// Credential store.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    /// Any user holding the `ADMIN` role.
    async fn find_admin(&self) -> Result<Option<User>, StoreError>;
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;
    /// Mark the owner of `link` activated and clear the link.
    async fn activate(&self, link: &str) -> Result<Option<User>, StoreError>;
    async fn set_activation_link(&self, id: i64, link: &str) -> Result<bool, StoreError>;
    async fn list(&self) -> Result<Vec<User>, StoreError>;
}

const USER_COLUMNS: &str =
    "id, username, email, password_hash, is_activated, activation_link, role, created_at";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.find_one("email", email).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.find_one("username", username).await
    }

    async fn find_admin(&self) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE role = 'ADMIN' ORDER BY id LIMIT 1");
        let user = sqlx::query_as::<_, User>(&sql)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO users (username, email, password_hash, is_activated, activation_link, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.is_activated)
            .bind(&user.activation_link)
            .bind(user.role.as_str())
            .fetch_one(&self.db)
            .await
            .map_err(unique_violation)
    }

    async fn activate(&self, link: &str) -> Result<Option<User>, StoreError> {
        let sql = format!(
            r#"
            UPDATE users
               SET is_activated = TRUE, activation_link = NULL
             WHERE activation_link = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(link)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn set_activation_link(&self, id: i64, link: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE users SET activation_link = $2 WHERE id = $1")
            .bind(id)
            .bind(link)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");
        let users = sqlx::query_as::<_, User>(&sql).fetch_all(&self.db).await?;
        Ok(users)
    }
}

/// Map a unique-constraint violation on insert to the field it concerns.
fn unique_violation(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            if let Some(field) = duplicate_field(db_err.constraint()) {
                return StoreError::Duplicate(field);
            }
        }
    }
    StoreError::Database(err)
}

/// Field named by a unique constraint from `migrations/0001_init.sql`.
fn duplicate_field(constraint: Option<&str>) -> Option<&'static str> {
    match constraint? {
        "users_username_key" => Some("Username"),
        "users_email_key" => Some("Email"),
        _ => None,
    }
}
