use crate::api::ApiError;
use crate::session::store::TokenStore;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Exchanges a refresh token for a new access token.
    async fn refresh(&self, refresh_token: &str) -> Result<String, ApiError>;
}

/// Runs one refresh against the stored refresh token and writes the new access token.
pub async fn refresh_session(
    store: &TokenStore,
    refresher: &dyn TokenRefresher,
) -> Result<String, ApiError> {
    let refresh_token = store.refresh_token()?.ok_or(ApiError::Unauthenticated)?;
    let token = refresher.refresh(&refresh_token).await?;
    store.set_access_token(&token)?;
    Ok(token)
}

/// Background timer that renews the access token before it lapses.
///
/// At most one loop runs per refresher: `start` while running is a no-op.
/// Ticks never overlap since each refresh is awaited inside the loop and
/// missed ticks are skipped. The loop ends on its own once the access token
/// is gone; otherwise only `stop` ends it.
pub struct SessionRefresher {
    store: TokenStore,
    refresher: Arc<dyn TokenRefresher>,
    period: Duration,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SessionRefresher {
    pub fn new(store: TokenStore, refresher: Arc<dyn TokenRefresher>, period: Duration) -> Self {
        Self {
            store,
            refresher,
            period,
            handle: Mutex::new(None),
        }
    }

    /// Arms the timer. Returns `false` when a loop is already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> bool {
        let mut handle = self.slot();
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            debug!("Session refresh loop already running");
            return false;
        }

        let store = self.store.clone();
        let refresher = self.refresher.clone();
        let period = self.period;
        *handle = Some(tokio::spawn(run_loop(store, refresher, period)));
        info!(period_secs = period.as_secs(), "Session refresh loop started");
        true
    }

    pub fn stop(&self) {
        if let Some(h) = self.slot().take() {
            h.abort();
            info!("Session refresh loop stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.slot().as_ref().is_some_and(|h| !h.is_finished())
    }

    fn slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SessionRefresher {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_loop(store: TokenStore, refresher: Arc<dyn TokenRefresher>, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        match store.access_token() {
            Ok(Some(_)) => {}
            Ok(None) => {
                info!("No access token; session refresh loop exiting");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Could not read access token; will retry next tick");
                continue;
            }
        }

        match refresh_session(&store, refresher.as_ref()).await {
            Ok(_) => debug!("Access token refreshed"),
            // Keep the current token; a transient failure must not sign the user out.
            Err(e) => warn!(error = %e, "Access token refresh failed"),
        }
    }
}
