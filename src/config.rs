use anyhow::Context;
use axum::http::HeaderValue;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

/// Credentials for the admin account created on first start.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub per_second: f64,
    pub burst: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt: JwtConfig,
    pub smtp: SmtpConfig,
    pub admin: AdminConfig,
    pub rate_limit: RateLimitConfig,
    /// Origin allowed by CORS.
    pub client_url: String,
    /// Public base URL used to build activation links.
    pub api_url: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from any variable source; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let env = Env(lookup);

        let database_url = env.required("DATABASE_URL")?;
        let database_max_connections = env.parsed("DATABASE_MAX_CONNECTIONS", 10)?;

        let jwt = JwtConfig {
            secret: env.required("JWT_SECRET")?,
            issuer: env.or("JWT_ISSUER", "taskd"),
            audience: env.or("JWT_AUDIENCE", "taskd-users"),
            ttl_hours: env.parsed("JWT_TTL_HOURS", 24)?,
        };
        anyhow::ensure!(jwt.ttl_hours >= 1, "JWT_TTL_HOURS must be at least 1");

        let smtp_username = env.required("SMTP_USERNAME")?;
        let smtp = SmtpConfig {
            host: env.or("SMTP_HOST", "smtp.gmail.com"),
            port: env.parsed("SMTP_PORT", 587)?,
            from: env.or("SMTP_FROM", &smtp_username),
            username: smtp_username,
            password: env.required("SMTP_PASSWORD")?,
        };

        let admin = AdminConfig {
            username: env.or("ADMIN_USERNAME", "admin"),
            email: env.or("ADMIN_EMAIL", "admin@localhost"),
            password: env.required("ADMIN_PASSWORD")?,
        };

        let rate_limit = RateLimitConfig {
            per_second: env.parsed("RATE_LIMIT_PER_SEC", 300.0)?,
            burst: env.parsed("RATE_LIMIT_BURST", 1)?,
        };
        anyhow::ensure!(
            rate_limit.per_second.is_finite() && rate_limit.per_second > 0.0 && rate_limit.burst > 0,
            "RATE_LIMIT_PER_SEC and RATE_LIMIT_BURST must be positive"
        );

        let client_url = env.required("CLIENT_URL")?;
        HeaderValue::from_str(&client_url).context("CLIENT_URL is not a valid origin")?;

        Ok(Self {
            database_url,
            database_max_connections,
            jwt,
            smtp,
            admin,
            rate_limit,
            client_url,
            api_url: env.required("API_URL")?.trim_end_matches('/').to_string(),
        })
    }
}

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn required(&self, name: &str) -> anyhow::Result<String> {
        (self.0)(name).with_context(|| format!("missing `{name}` environment variable"))
    }

    fn or(&self, name: &str, default: &str) -> String {
        (self.0)(name).unwrap_or_else(|| default.to_string())
    }

    /// Default when unset; an error when set but unparsable.
    fn parsed<T>(&self, name: &str, default: T) -> anyhow::Result<T>
    where
        T: std::str::FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match (self.0)(name) {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .with_context(|| format!("invalid `{name}` value `{raw}`")),
        }
    }
}
