use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
    pub verify_ttl_minutes: i64,
}

/// SMTP relay settings. `server: None` keeps mail in the log.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub server: Option<String>,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

/// S3-compatible bucket that hosts avatar images.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub public_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub base_url: String,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
    pub storage: StorageConfig,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: env_or("JWT_ISSUER", "contactbook"),
            audience: env_or("JWT_AUDIENCE", "contactbook-users"),
            ttl_minutes: env_parse("JWT_TTL_MINUTES", 15),
            refresh_ttl_minutes: env_parse("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 7),
            verify_ttl_minutes: env_parse("JWT_VERIFY_TTL_MINUTES", 60 * 24),
        };

        let mail = MailConfig {
            server: std::env::var("MAIL_SERVER").ok().filter(|s| !s.is_empty()),
            port: env_parse("MAIL_PORT", 587),
            username: env_or("MAIL_USERNAME", ""),
            password: env_or("MAIL_PASSWORD", ""),
            from: env_or("MAIL_FROM", "no-reply@contactbook.local"),
        };

        let endpoint = env_or("S3_ENDPOINT", "http://localhost:9000");
        let bucket = env_or("S3_BUCKET", "avatars");
        let public_url = std::env::var("S3_PUBLIC_URL")
            .unwrap_or_else(|_| format!("{}/{}", endpoint.trim_end_matches('/'), bucket));
        let storage = StorageConfig {
            access_key: std::env::var("S3_ACCESS_KEY").context("S3_ACCESS_KEY is not set")?,
            secret_key: std::env::var("S3_SECRET_KEY").context("S3_SECRET_KEY is not set")?,
            region: env_or("S3_REGION", "us-east-1"),
            endpoint,
            bucket,
            public_url,
        };

        Ok(Self {
            database_url,
            max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 10),
            base_url: env_or("APP_BASE_URL", "http://localhost:8080"),
            jwt,
            mail,
            storage,
        })
    }
}
