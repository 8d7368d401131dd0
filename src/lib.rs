pub mod api;
pub mod commands;
pub mod config;
pub mod db;
pub mod discovery;
pub mod models;
pub mod session;
pub mod validation;

use api::ApiClient;
use config::{Config, ConfigError};
use db::{Database, StoreError};
use discovery::DiscoveryState;
use session::{SessionRefresher, TokenStore};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Installs the fmt subscriber. `RUST_LOG` overrides the default filter.
/// Calling it again is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("persona_hub_lib=info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Everything a UI shell needs: storage, the backend client and the refresh loop.
pub struct App {
    pub config: Config,
    pub store: TokenStore,
    pub client: ApiClient,
    pub refresher: SessionRefresher,
}

impl App {
    pub fn from_env() -> Result<Self, AppError> {
        Self::init(Config::from_env()?)
    }

    pub fn init(config: Config) -> Result<Self, AppError> {
        let database = Database::new(&config.data_dir)?;
        info!(data_dir = %config.data_dir.display(), api = %config.api_base_url, "Storage opened");
        Ok(Self::with_database(config, database))
    }

    pub fn with_database(config: Config, database: Database) -> Self {
        let store = TokenStore::new(Arc::new(database));
        let client = ApiClient::new(config.api_base_url.clone(), store.clone());
        Self::with_client(config, client)
    }

    /// Wires the app around an existing client, sharing its token store and refresher.
    pub fn with_client(config: Config, client: ApiClient) -> Self {
        let store = client.store().clone();
        let refresher =
            SessionRefresher::new(store.clone(), client.refresher(), config.refresh_interval);
        Self {
            config,
            store,
            client,
            refresher,
        }
    }

    /// Fresh discovery state paged by the configured page size.
    pub fn discovery_state(&self) -> DiscoveryState {
        DiscoveryState::new(self.config.items_per_page)
    }

    /// Restarts the refresh loop for a session persisted by an earlier run.
    /// Needs a tokio runtime.
    pub fn resume_session(&self) -> Result<bool, StoreError> {
        if !self.store.is_authenticated()? {
            return Ok(false);
        }
        self.refresher.start();
        Ok(true)
    }
}
