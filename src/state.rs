use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::db::Store;
use crate::services::{AuthService, SeaOrmAuthService};

/// Everything a request handler can reach: configuration, the persistence
/// facade and the session/token issuer. No other mutable state is shared
/// across requests.
pub struct AppState {
    pub config: Config,

    pub store: Store,

    pub auth: Arc<dyn AuthService>,

    pub start_time: Instant,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.database.path,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await?;

        let auth: Arc<dyn AuthService> = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            config.security.pbkdf2_iterations,
        ));

        Ok(Self {
            config,
            store,
            auth,
            start_time: Instant::now(),
        })
    }

    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    #[must_use]
    pub fn auth(&self) -> &Arc<dyn AuthService> {
        &self.auth
    }
}
