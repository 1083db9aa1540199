use std::sync::Arc;
use crate::config::Config;
use crate::crypto::password::CredentialHasher;
use crate::crypto::token::TokenCodec;
use crate::error::{AppError, Result};
use crate::repositories::{memory::MemoryUserStore, user::PgUserStore, user::UserStore};
use crate::services::auth::AuthService;

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration.
    pub config: Config,
    /// The user store shared by the service and the access gate.
    pub users: Arc<dyn UserStore>,
    /// Session token issuer and verifier.
    pub tokens: Arc<TokenCodec>,
    /// Registration, login and account maintenance.
    pub auth: AuthService,
}

impl AppState {
    /// Creates a new `AppState`.
    ///
    /// Connects to PostgreSQL when `DATABASE_URL` is configured and falls
    /// back to an in-memory store otherwise.
    pub async fn new(config: &Config) -> Result<Self> {
        let users: Arc<dyn UserStore> = match config.database_url.as_deref() {
            Some(url) => {
                let pool = crate::db::create_pool(url, config.db_pool_size)?;
                // Fail fast when the database is unreachable.
                drop(pool.get().await?);
                tracing::info!("✅ PostgreSQL Pool initialized with deadpool-postgres");
                Arc::new(PgUserStore::new(pool))
            }
            None => {
                tracing::warn!("⚠️  DATABASE_URL not set, users are kept in memory only");
                Arc::new(MemoryUserStore::new())
            }
        };

        Self::with_store(config, users)
    }

    /// Creates an `AppState` around an existing user store.
    pub fn with_store(config: &Config, users: Arc<dyn UserStore>) -> Result<Self> {
        let hasher = CredentialHasher::new(config.hash_cost)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        tracing::info!("✅ Credential hasher initialized");

        let tokens = Arc::new(TokenCodec::new(config.secret_key.as_bytes()));
        tracing::info!("✅ Token codec initialized");

        Ok(AppState {
            config: config.clone(),
            auth: AuthService::new(users.clone(), hasher),
            users,
            tokens,
        })
    }
}
