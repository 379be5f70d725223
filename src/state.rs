use sqlx::PgPool;
use std::env;
use std::sync::Arc;
use tracing::info;

use crate::config::RedeemConfig;
use crate::db::{create_db_pool, create_lazy_db_pool, DatabaseConfig};
use crate::domains::redeem::{
    AdminService, MemoryTokenStore, PgTokenStore, QrConfig, QrRenderer, RedeemService,
    TokenGenerator, TokenStore,
};
use crate::services::directory::{
    BusinessDirectory, MemoryDirectory, PgBusinessDirectory, PgUserDirectory, UserDirectory,
};

/// Estado compartido de la aplicación.
/// Owns the constructed services; handlers reach everything through here.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub redeem_service: Arc<RedeemService>,
    pub admin_service: Arc<AdminService>,
    pub qr: Arc<QrRenderer>,
    pub config: RedeemConfig,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        let config = RedeemConfig::from_env();

        let (db_pool, store, businesses, users): (
            PgPool,
            Arc<dyn TokenStore>,
            Arc<dyn BusinessDirectory>,
            Arc<dyn UserDirectory>,
        ) = if config.use_memory_store {
            // Local development without Postgres. The pool is lazy and never
            // connected; readiness skips it.
            let database_url = env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/redeem_ws".to_string());
            let db_pool = create_lazy_db_pool(&database_url)?;
            let directory = Arc::new(MemoryDirectory::with_sample_data());
            info!("🗂️ Using in-memory token store (REDEEM_STORE=memory)");
            (
                db_pool,
                Arc::new(MemoryTokenStore::new()),
                directory.clone(),
                directory,
            )
        } else {
            let database_url = env::var("DATABASE_URL")
                .map_err(|e| anyhow::anyhow!("DATABASE_URL must be set: {}", e))?;
            let db_config = DatabaseConfig::production();
            let db_pool = create_db_pool(&database_url, db_config).await?;
            (
                db_pool.clone(),
                Arc::new(PgTokenStore::new(db_pool.clone())),
                Arc::new(PgBusinessDirectory::new(db_pool.clone())),
                Arc::new(PgUserDirectory::new(db_pool)),
            )
        };

        let generator = TokenGenerator::new(config.token_length);
        let redeem_service = Arc::new(RedeemService::new(
            store.clone(),
            businesses,
            users.clone(),
            generator,
            config.expiry_policy,
        ));
        let admin_service = Arc::new(AdminService::new(store, users));
        let qr = Arc::new(QrRenderer::new(QrConfig {
            base_url: config.public_base_url.clone(),
            ..QrConfig::default()
        }));

        Ok(AppState {
            db_pool,
            redeem_service,
            admin_service,
            qr,
            config,
        })
    }
}
