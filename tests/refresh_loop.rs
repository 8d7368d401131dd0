use async_trait::async_trait;
use persona_hub_lib::api::ApiError;
use persona_hub_lib::db::Database;
use persona_hub_lib::models::{SessionTokens, User};
use persona_hub_lib::session::{SessionRefresher, TokenRefresher, TokenStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const PERIOD: Duration = Duration::from_secs(60);

#[derive(Default)]
struct CountingRefresher {
    calls: AtomicUsize,
    fail: bool,
}

impl CountingRefresher {
    fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenRefresher for CountingRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<String, ApiError> {
        assert_eq!(refresh_token, "refresh-1");
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail {
            return Err(ApiError::Api {
                status: 503,
                message: "unavailable".into(),
            });
        }
        Ok(format!("fresh-{}", n))
    }
}

fn store(signed_in: bool) -> TokenStore {
    let store = TokenStore::new(Arc::new(Database::in_memory().unwrap()));
    if signed_in {
        store
            .set_session(
                &SessionTokens {
                    access_token: "access-0".into(),
                    refresh_token: "refresh-1".into(),
                },
                &User {
                    id: "u1".into(),
                    email: "ada@example.com".into(),
                    name: None,
                    is_verified: true,
                    workspace_id: None,
                },
                None,
            )
            .unwrap();
    }
    store
}

#[tokio::test(start_paused = true)]
async fn double_start_keeps_a_single_timer() {
    let store = store(true);
    let counter = Arc::new(CountingRefresher::default());
    let refresher = SessionRefresher::new(store.clone(), counter.clone(), PERIOD);

    assert!(refresher.start());
    assert!(!refresher.start());

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(counter.calls(), 0, "first refresh waits a full period");

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(counter.calls(), 1);
    assert_eq!(store.access_token().unwrap().as_deref(), Some("fresh-1"));

    tokio::time::sleep(PERIOD).await;
    assert_eq!(counter.calls(), 2);
    assert_eq!(store.access_token().unwrap().as_deref(), Some("fresh-2"));
}

#[tokio::test(start_paused = true)]
async fn failed_refresh_keeps_token_and_retries_next_tick() {
    let store = store(true);
    let counter = Arc::new(CountingRefresher::failing());
    let refresher = SessionRefresher::new(store.clone(), counter.clone(), PERIOD);
    refresher.start();

    tokio::time::sleep(PERIOD + Duration::from_secs(1)).await;
    assert_eq!(counter.calls(), 1);
    assert_eq!(store.access_token().unwrap().as_deref(), Some("access-0"));
    assert!(refresher.is_running());

    tokio::time::sleep(PERIOD).await;
    assert_eq!(counter.calls(), 2);
    assert_eq!(store.access_token().unwrap().as_deref(), Some("access-0"));
}

#[tokio::test(start_paused = true)]
async fn loop_exits_without_access_token() {
    let store = store(false);
    let counter = Arc::new(CountingRefresher::default());
    let refresher = SessionRefresher::new(store, counter.clone(), PERIOD);
    refresher.start();

    tokio::time::sleep(PERIOD * 3).await;
    assert_eq!(counter.calls(), 0);
    assert!(!refresher.is_running());

    // a finished loop can be armed again
    assert!(refresher.start());
}

#[tokio::test(start_paused = true)]
async fn clearing_session_ends_loop_on_next_tick() {
    let store = store(true);
    let counter = Arc::new(CountingRefresher::default());
    let refresher = SessionRefresher::new(store.clone(), counter.clone(), PERIOD);
    refresher.start();

    tokio::time::sleep(PERIOD + Duration::from_secs(1)).await;
    assert_eq!(counter.calls(), 1);

    store.clear_session().unwrap();
    tokio::time::sleep(PERIOD).await;
    assert_eq!(counter.calls(), 1);
    assert!(!refresher.is_running());
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_the_timer() {
    let store = store(true);
    let counter = Arc::new(CountingRefresher::default());
    let refresher = SessionRefresher::new(store, counter.clone(), PERIOD);
    refresher.start();
    refresher.stop();

    tokio::time::sleep(PERIOD * 5).await;
    assert_eq!(counter.calls(), 0);
    assert!(!refresher.is_running());
}
