//! In-memory stores, a recording mailer and a request helper for HTTP tests.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use time::{Duration as TimeDuration, OffsetDateTime};
use tower::ServiceExt;
use uuid::Uuid;

use crate::{
    app::build_app,
    auth::{
        claims::{Claims, Role},
        repo::UserStore,
        repo_types::{NewUser, User},
    },
    config::{AdminConfig, AppConfig, JwtConfig, RateLimitConfig, SmtpConfig},
    error::StoreError,
    mail::Mailer,
    state::AppState,
    tasks::{
        query::{SortField, SortOrder, TaskQuery},
        repo::TaskStore,
        repo_types::{now_micros, StarToggle, Task, TaskPatch},
    },
};

#[derive(Default)]
pub struct MemoryUsers {
    rows: Mutex<Vec<User>>,
}

impl MemoryUsers {
    fn insert(&self, new: NewUser) -> Result<User, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|u| u.username == new.username) {
            return Err(StoreError::Duplicate("Username"));
        }
        if rows.iter().any(|u| u.email == new.email) {
            return Err(StoreError::Duplicate("Email"));
        }
        let user = User {
            id: rows.len() as i64 + 1,
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            is_activated: new.is_activated,
            activation_link: new.activation_link,
            role: new.role,
            created_at: OffsetDateTime::now_utc(),
        };
        rows.push(user.clone());
        Ok(user)
    }

    fn find(&self, pred: impl Fn(&User) -> bool) -> Option<User> {
        self.rows.lock().unwrap().iter().find(|u| pred(u)).cloned()
    }

    pub fn by_email(&self, email: &str) -> Option<User> {
        self.find(|u| u.email == email)
    }

    pub fn count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl UserStore for MemoryUsers {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.find(|u| u.id == id))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.by_email(email))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self.find(|u| u.username == username))
    }

    async fn find_admin(&self) -> Result<Option<User>, StoreError> {
        Ok(self.find(|u| u.role == Role::Admin))
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        self.insert(user)
    }

    async fn activate(&self, link: &str) -> Result<Option<User>, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        Ok(rows
            .iter_mut()
            .find(|u| u.activation_link.as_deref() == Some(link))
            .map(|u| {
                u.is_activated = true;
                u.activation_link = None;
                u.clone()
            }))
    }

    async fn set_activation_link(&self, id: i64, link: &str) -> Result<bool, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        Ok(rows
            .iter_mut()
            .find(|u| u.id == id)
            .map(|u| u.activation_link = Some(link.to_string()))
            .is_some())
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.rows.lock().unwrap().clone())
    }
}

/// Mirrors the Postgres `last_updated` bump: now, but strictly after `previous`.
fn next_update(previous: OffsetDateTime) -> OffsetDateTime {
    let now = now_micros();
    if now > previous {
        now
    } else {
        previous + TimeDuration::microseconds(1)
    }
}

#[derive(Default)]
pub struct MemoryTasks {
    rows: Mutex<Vec<Task>>,
}

impl MemoryTasks {
    fn modify<T>(&self, owner: i64, id: Uuid, f: impl FnOnce(&mut Task) -> T) -> Option<T> {
        let mut rows = self.rows.lock().unwrap();
        rows.iter_mut()
            .find(|t| t.id == id && t.user_id == owner)
            .map(f)
    }
}

#[async_trait]
impl TaskStore for MemoryTasks {
    async fn list(&self, owner: i64, query: &TaskQuery) -> Result<Vec<Task>, StoreError> {
        let mut rows: Vec<Task> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.user_id == owner)
            .filter(|t| query.name.as_deref().map_or(true, |n| t.name.contains(n)))
            .filter(|t| query.details.as_deref().map_or(true, |d| t.details.contains(d)))
            .filter(|t| !query.starred_only || t.starred)
            .cloned()
            .collect();

        rows.sort_by(|a, b| {
            let ord = match query.sort_field {
                SortField::Id => a.id.cmp(&b.id),
                SortField::Name => a.name.cmp(&b.name),
                SortField::Details => a.details.cmp(&b.details),
                SortField::CreatedDate => a.created_date.cmp(&b.created_date),
                SortField::Starred => a.starred.cmp(&b.starred),
                SortField::LastUpdated => a.last_updated.cmp(&b.last_updated),
            };
            let ord = match query.sort_order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            };
            ord.then_with(|| a.id.cmp(&b.id))
        });

        Ok(rows
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit() as usize)
            .collect())
    }

    async fn find(&self, owner: i64, id: Uuid) -> Result<Option<Task>, StoreError> {
        Ok(self.modify(owner, id, |t| t.clone()))
    }

    async fn insert(&self, task: &Task) -> Result<(), StoreError> {
        self.rows.lock().unwrap().push(task.clone());
        Ok(())
    }

    async fn update(
        &self,
        owner: i64,
        id: Uuid,
        patch: &TaskPatch,
    ) -> Result<Option<Task>, StoreError> {
        Ok(self.modify(owner, id, |t| {
            if let Some(name) = &patch.name {
                t.name = name.clone();
            }
            if let Some(details) = &patch.details {
                t.details = details.clone();
            }
            if let Some(starred) = patch.starred {
                t.starred = starred;
            }
            t.last_updated = next_update(t.last_updated);
            t.clone()
        }))
    }

    async fn delete(&self, owner: i64, id: Uuid) -> Result<bool, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|t| !(t.id == id && t.user_id == owner));
        Ok(rows.len() < before)
    }

    async fn toggle_star(&self, owner: i64, id: Uuid) -> Result<Option<StarToggle>, StoreError> {
        Ok(self.modify(owner, id, |t| {
            t.starred = !t.starred;
            t.last_updated = next_update(t.last_updated);
            StarToggle {
                have_star: t.starred,
                last_updated: t.last_updated,
            }
        }))
    }
}

#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Keeps every delivered message; can be told to fail the next delivery.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
    fail_next: AtomicBool,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            anyhow::bail!("smtp unavailable");
        }
        self.sent.lock().unwrap().push(SentMail {
            to: to.into(),
            subject: subject.into(),
            html: html.into(),
        });
        Ok(())
    }
}

pub fn test_config(per_second: f64, burst: u32) -> AppConfig {
    AppConfig {
        database_url: "postgres://localhost/taskd_test".into(),
        database_max_connections: 1,
        jwt: JwtConfig {
            secret: "test-secret".into(),
            issuer: "taskd".into(),
            audience: "taskd-users".into(),
            ttl_hours: 24,
        },
        smtp: SmtpConfig {
            host: "localhost".into(),
            port: 2525,
            username: "mailer".into(),
            password: "mailer".into(),
            from: "noreply@example.com".into(),
        },
        admin: AdminConfig {
            username: "admin".into(),
            email: "admin@example.com".into(),
            password: "admin-password".into(),
        },
        rate_limit: RateLimitConfig { per_second, burst },
        client_url: "http://client.test".into(),
        api_url: "http://api.test".into(),
    }
}

/// The full router over in-memory adapters.
#[derive(Clone)]
pub struct Harness {
    pub state: AppState,
    pub users: Arc<MemoryUsers>,
    pub mailer: Arc<RecordingMailer>,
    pub app: Router,
}

impl Harness {
    /// Rate limit high enough to never trigger.
    pub fn new() -> Self {
        Self::with_rate_limit(1_000_000.0, 1_000_000)
    }

    pub fn with_rate_limit(per_second: f64, burst: u32) -> Self {
        let users = Arc::new(MemoryUsers::default());
        let tasks = Arc::new(MemoryTasks::default());
        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::from_parts(
            Arc::new(test_config(per_second, burst)),
            users.clone(),
            tasks,
            mailer.clone(),
        );
        let app = build_app(state.clone()).unwrap();
        Self {
            state,
            users,
            mailer,
            app,
        }
    }

    /// Insert an activated user directly and return it with a valid token.
    pub fn seed_user(&self, username: &str, role: Role) -> (User, String) {
        let user = self
            .users
            .insert(NewUser {
                username: username.into(),
                email: format!("{username}@example.com"),
                password_hash: "not-a-real-hash".into(),
                is_activated: true,
                activation_link: None,
                role,
            })
            .unwrap();
        let token = self.token_for(&user);
        (user, token)
    }

    pub fn token_for(&self, user: &User) -> String {
        self.state.jwt.issue(user).unwrap()
    }

    /// Valid token for a user id the store does not know.
    pub fn ghost_token(&self, user_id: i64) -> String {
        self.token_for(&User {
            id: user_id,
            username: "ghost".into(),
            email: "ghost@example.com".into(),
            password_hash: String::new(),
            is_activated: false,
            activation_link: None,
            role: Role::User,
            created_at: OffsetDateTime::now_utc(),
        })
    }

    pub fn expired_token(&self, user_id: i64) -> String {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let cfg = &self.state.config.jwt;
        self.state
            .jwt
            .sign(&Claims {
                user_id,
                username: "expired".into(),
                email: "expired@example.com".into(),
                is_activated: true,
                role: Role::User,
                iat: now - 7200,
                exp: now - 60,
                iss: cfg.issuer.clone(),
                aud: cfg.audience.clone(),
            })
            .unwrap()
    }

    /// Send one request through the router; the body is parsed as JSON
    /// (`Null` when empty).
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(json) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();

        let res = self.app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_update_is_strictly_after_previous() {
        let future = now_micros() + TimeDuration::seconds(5);
        assert_eq!(next_update(future), future + TimeDuration::microseconds(1));

        let past = now_micros() - TimeDuration::seconds(5);
        assert!(next_update(past) > past);
    }
}
