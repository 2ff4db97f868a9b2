//! Application state

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::auth::{JwtConfig, JwtService};
use crate::cart::{CartService, CustomerLocks};
use crate::config::Config;
use crate::dashboard::DashboardService;
use crate::db::{MarketStore, MemoryStore, PgStore};
use crate::live::{LiveHub, LiveHubConfig};
use crate::notify::{NotificationDispatcher, PushJob, PushWorker};
use crate::orders::OrderEngine;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn MarketStore>,
    pub jwt: Arc<JwtService>,
    pub carts: CartService,
    pub orders: OrderEngine,
    pub notifications: NotificationDispatcher,
    pub dashboards: DashboardService,
    pub live: LiveHub,
}

impl AppState {
    /// Wire services over `store`. The returned receiver is the push
    /// queue; hand it to [`AppState::push_worker`]'s `run`.
    pub fn new(config: Config, store: Arc<dyn MarketStore>) -> (Self, mpsc::Receiver<PushJob>) {
        let locks = CustomerLocks::new();
        let (notifications, push_rx) =
            NotificationDispatcher::new(store.clone(), config.push_queue_capacity);
        let live = LiveHub::new(LiveHubConfig {
            connection_buffer: config.connection_buffer,
            max_connections_per_user: config.max_connections_per_user,
            push_timeout: config.push_timeout,
        });
        let jwt = JwtService::with_config(JwtConfig::new(
            config.jwt_secret.clone(),
            config.jwt_issuer.clone(),
        ));

        let state = Self {
            carts: CartService::new(store.clone(), locks.clone()),
            orders: OrderEngine::new(store.clone(), notifications.clone(), locks),
            dashboards: DashboardService::new(store.clone()),
            notifications,
            live,
            jwt: Arc::new(jwt),
            store,
            config: Arc::new(config),
        };
        (state, push_rx)
    }

    /// Select the store from config: PostgreSQL when `DATABASE_URL` is
    /// set, otherwise the in-memory store.
    pub async fn connect(config: Config) -> Result<(Self, mpsc::Receiver<PushJob>), BoxError> {
        let store: Arc<dyn MarketStore> = match &config.database_url {
            Some(url) => {
                let store = PgStore::connect(url).await?;
                tracing::info!("PostgreSQL store ready");
                Arc::new(store)
            }
            None => {
                tracing::warn!("DATABASE_URL not set, using in-memory store");
                Arc::new(MemoryStore::new())
            }
        };
        Ok(Self::new(config, store))
    }

    pub fn push_worker(&self) -> PushWorker {
        PushWorker::new(self.live.clone())
    }
}
