use std::sync::Arc;

use tracing::{info, warn};

use crate::config::AppConfig;
use crate::service::TrackingService;
use crate::store::{MemoryStore, PgStore, TrackingStore};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TrackingService>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store: Arc<dyn TrackingStore> = match &config.database_url {
            Some(url) => {
                let pg = PgStore::connect(url, config.database_max_connections).await?;
                if let Err(e) = sqlx::migrate!("./migrations").run(pg.pool()).await {
                    warn!(error = %e, "migration failed; continuing");
                }
                Arc::new(pg)
            }
            None => {
                info!("DATABASE_URL not set; using in-memory store");
                Arc::new(MemoryStore::new())
            }
        };

        Ok(Self::from_parts(Arc::new(TrackingService::new(store)), config))
    }

    pub fn from_parts(service: Arc<TrackingService>, config: Arc<AppConfig>) -> Self {
        Self { service, config }
    }

    pub fn fake() -> Self {
        let store = Arc::new(MemoryStore::new()) as Arc<dyn TrackingStore>;
        Self::from_parts(
            Arc::new(TrackingService::new(store)),
            Arc::new(AppConfig::default()),
        )
    }
}
