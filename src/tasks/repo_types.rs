use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Task record in the database, owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub name: String,
    pub details: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_date: OffsetDateTime,
    #[serde(rename = "star")]
    pub starred: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
    pub user_id: i64,
}

impl Task {
    /// A fresh, unstarred task owned by `user_id`.
    pub fn new(user_id: i64, name: String, details: String) -> Self {
        let now = now_micros();
        Self {
            id: Uuid::new_v4(),
            name,
            details,
            created_date: now,
            starred: false,
            last_updated: now,
            user_id,
        }
    }
}

/// Fields a client may change on an existing task.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub details: Option<String>,
    pub starred: Option<bool>,
}

/// Result of flipping the star flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StarToggle {
    pub have_star: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

/// Current time truncated to the microsecond precision Postgres stores.
pub fn now_micros() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now.replace_nanosecond(now.nanosecond() / 1_000 * 1_000)
        .unwrap_or(now)
}
