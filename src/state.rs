use std::sync::Arc;

use tracing::warn;

use crate::auth::repo::{PgUserStore, UserStore};
use crate::config::AppConfig;
use crate::db;
use crate::memory::{MemorySweetStore, MemoryUserStore};
use crate::sweets::repo::{PgSweetStore, SweetStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub sweets: Arc<dyn SweetStore>,
}

impl AppState {
    /// Postgres-backed state when `DATABASE_URL` is set, in-memory otherwise.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let Some(url) = config.database_url.clone() else {
            warn!("DATABASE_URL not set; using in-memory stores, data will not persist");
            return Ok(Self::in_memory(config));
        };

        let pool = db::connect(&url, config.db_max_connections).await?;
        db::migrate(&pool).await;

        Ok(Self::from_parts(
            Arc::new(config),
            Arc::new(PgUserStore::new(pool.clone())),
            Arc::new(PgSweetStore::new(pool)),
        ))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        sweets: Arc<dyn SweetStore>,
    ) -> Self {
        Self {
            config,
            users,
            sweets,
        }
    }

    pub fn in_memory(config: AppConfig) -> Self {
        Self::from_parts(
            Arc::new(config),
            Arc::new(MemoryUserStore::new()),
            Arc::new(MemorySweetStore::new()),
        )
    }

    pub fn fake() -> Self {
        Self::in_memory(AppConfig::test_default())
    }
}
