//! API server configuration.

use chrono::Duration;
use resultify_core::auth::jwt::{
    ACCESS_TOKEN_EXPIRY_SECS, DEFAULT_ALGORITHM, JwtSettings, REFRESH_TOKEN_EXPIRY_SECS,
    resolve_jwt_secret,
};
use resultify_core::auth::password::DEFAULT_BCRYPT_COST;

/// Identity seeded as the first privileged principal.
#[derive(Clone)]
pub struct SuperAdminSettings {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
}

impl std::fmt::Debug for SuperAdminSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuperAdminSettings")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish_non_exhaustive()
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3100").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub pg_connection_url: String,
    /// Public base URL used in emailed links.
    pub domain_url: String,
    /// Token signing settings.
    pub jwt: JwtSettings,
    /// bcrypt cost factor.
    pub bcrypt_cost: u32,
    /// HTTP mail relay; mail is only logged when unset.
    pub mail_webhook_url: Option<String>,
    /// Super-admin bootstrap identity, if configured.
    pub super_admin: Option<SuperAdminSettings>,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                     | Default                              |
    /// |------------------------------|--------------------------------------|
    /// | `BIND_ADDR`                  | `127.0.0.1:3100`                     |
    /// | `DATABASE_URL`               | `postgres://localhost:5432/resultify` |
    /// | `DOMAIN_URL`                 | `http://127.0.0.1:3100`              |
    /// | `JWT_SECRET` / `AUTH_SECRET` | generated & persisted to file        |
    /// | `JWT_ALGORITHM`              | `HS256`                              |
    /// | `ACCESS_TOKEN_TTL_SECS`      | `3600`                               |
    /// | `REFRESH_TOKEN_TTL_SECS`     | `172800`                             |
    /// | `TOKEN_LEEWAY_SECS`          | `0`                                  |
    /// | `BCRYPT_COST`                | `10`                                 |
    /// | `MAIL_WEBHOOK_URL`           | unset                                |
    /// | `SUPER_ADMIN_*`              | unset (no bootstrap)                 |
    pub fn from_env() -> Self {
        let bind_addr = env_or("BIND_ADDR", "127.0.0.1:3100");
        let jwt = JwtSettings {
            secret: resolve_jwt_secret(),
            algorithm: env_or("JWT_ALGORITHM", DEFAULT_ALGORITHM),
            access_ttl: ttl_or(
                env_parse("ACCESS_TOKEN_TTL_SECS", ACCESS_TOKEN_EXPIRY_SECS),
                ACCESS_TOKEN_EXPIRY_SECS,
            ),
            refresh_ttl: ttl_or(
                env_parse("REFRESH_TOKEN_TTL_SECS", REFRESH_TOKEN_EXPIRY_SECS),
                REFRESH_TOKEN_EXPIRY_SECS,
            ),
            leeway_secs: env_parse("TOKEN_LEEWAY_SECS", 0),
        };
        Self {
            domain_url: env_or("DOMAIN_URL", &format!("http://{bind_addr}")),
            bind_addr,
            pg_connection_url: env_or("DATABASE_URL", "postgres://localhost:5432/resultify"),
            jwt,
            bcrypt_cost: env_parse("BCRYPT_COST", DEFAULT_BCRYPT_COST),
            mail_webhook_url: std::env::var("MAIL_WEBHOOK_URL").ok().filter(|v| !v.is_empty()),
            super_admin: super_admin_from_env(),
        }
    }

    /// Defaults with a fixed secret, for tests and embedding.
    pub fn with_secret(secret: &str) -> Self {
        Self {
            bind_addr: "127.0.0.1:0".into(),
            pg_connection_url: String::new(),
            domain_url: "http://127.0.0.1".into(),
            jwt: JwtSettings::new(secret),
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            mail_webhook_url: None,
            super_admin: None,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Out-of-range or non-positive lifetimes fall back to `default_secs`.
fn ttl_or(secs: i64, default_secs: i64) -> Duration {
    Duration::try_seconds(secs)
        .filter(|d| *d > Duration::zero())
        .unwrap_or_else(|| Duration::seconds(default_secs))
}

fn super_admin_from_env() -> Option<SuperAdminSettings> {
    let email = std::env::var("SUPER_ADMIN_EMAIL").ok().filter(|v| !v.is_empty())?;
    let password = std::env::var("SUPER_ADMIN_PASSWORD").ok().filter(|v| !v.is_empty())?;
    Some(SuperAdminSettings {
        email,
        password,
        first_name: env_or("SUPER_ADMIN_FIRSTNAME", "Super"),
        last_name: env_or("SUPER_ADMIN_LASTNAME", "Admin"),
        phone_number: env_or("SUPER_ADMIN_PHONE_NUMBER", ""),
    })
}
