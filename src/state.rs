use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::auth::jwt::JwtKeys;
use crate::auth::repo::{PgUserRepo, UserRepo};
use crate::config::AppConfig;
use crate::contacts::repo::{ContactRepo, PgContactRepo};
use crate::mailer::{self, Mailer};
use crate::storage::{Storage, StorageClient};

/// Process-wide handles shared by every request. Read-only after start-up.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub jwt: Arc<JwtKeys>,
    pub users: Arc<dyn UserRepo>,
    pub contacts: Arc<dyn ContactRepo>,
    pub storage: Arc<dyn StorageClient>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let db = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .context("run migrations")?;
        info!("database migrations applied");

        let storage = Arc::new(Storage::new(&config.storage).await?) as Arc<dyn StorageClient>;
        let mailer = mailer::from_config(&config.mail)?;

        Ok(Self {
            jwt: Arc::new(JwtKeys::from_config(&config.jwt)),
            users: Arc::new(PgUserRepo::new(db.clone())),
            contacts: Arc::new(PgContactRepo::new(db)),
            storage,
            mailer,
            config,
        })
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        crate::testing::Harness::new().state
    }
}
