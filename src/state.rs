use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    auth::{
        jwt::JwtKeys,
        repo::{PgUserStore, UserStore},
    },
    config::AppConfig,
    db,
    mail::{Mailer, SmtpMailer},
    rate_limit::RateLimiter,
    tasks::repo::{PgTaskStore, TaskStore},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub jwt: JwtKeys,
    pub users: Arc<dyn UserStore>,
    pub tasks: Arc<dyn TaskStore>,
    pub mailer: Arc<dyn Mailer>,
    pub limiter: Arc<RateLimiter>,
}

impl FromRef<AppState> for Arc<RateLimiter> {
    fn from_ref(state: &AppState) -> Self {
        state.limiter.clone()
    }
}

impl AppState {
    /// Connect to Postgres, apply migrations and build the SMTP mailer.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let pool = db::connect(&config).await?;
        db::migrate(&pool).await?;

        let mailer = Arc::new(SmtpMailer::new(&config.smtp)?) as Arc<dyn Mailer>;
        Ok(Self::from_parts(
            Arc::new(config),
            Arc::new(PgUserStore::new(pool.clone())),
            Arc::new(PgTaskStore::new(pool)),
            mailer,
        ))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        tasks: Arc<dyn TaskStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let jwt = JwtKeys::from_config(&config.jwt);
        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit.per_second,
            config.rate_limit.burst,
        ));
        Self {
            config,
            jwt,
            users,
            tasks,
            mailer,
            limiter,
        }
    }
}
