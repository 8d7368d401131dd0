//! Request pipeline stages. Each stage receives the request and the rest of
//! the chain; the innermost step executes the request on the HTTP client.

use super::ApiError;
use crate::session::refresh::{refresh_session, TokenRefresher};
use crate::session::store::TokenStore;
use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Client, Request, Response, StatusCode};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, req: Request, next: Next<'_>) -> Result<Response, ApiError>;
}

/// Remaining stages of the chain.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    http: &'a Client,
    stages: &'a [Arc<dyn Middleware>],
}

impl<'a> Next<'a> {
    pub fn new(http: &'a Client, stages: &'a [Arc<dyn Middleware>]) -> Self {
        Self { http, stages }
    }

    pub async fn run(self, req: Request) -> Result<Response, ApiError> {
        match self.stages.split_first() {
            Some((stage, rest)) => {
                stage
                    .handle(
                        req,
                        Next {
                            http: self.http,
                            stages: rest,
                        },
                    )
                    .await
            }
            None => Ok(self.http.execute(req).await?),
        }
    }
}

pub fn bearer_value(token: &str) -> Result<HeaderValue, ApiError> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|e| ApiError::Parse(format!("Token is not a valid header value: {}", e)))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Attaches `Authorization: Bearer <token>` from the token store.
pub struct BearerAuth {
    store: TokenStore,
}

impl BearerAuth {
    pub fn new(store: TokenStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Middleware for BearerAuth {
    async fn handle(&self, mut req: Request, next: Next<'_>) -> Result<Response, ApiError> {
        if let Some(token) = self.store.access_token()? {
            req.headers_mut().insert(AUTHORIZATION, bearer_value(&token)?);
        }
        next.run(req).await
    }
}

/// On a 401, refreshes the access token once and replays the request once.
/// A second 401 is handed back as-is.
pub struct RefreshOnUnauthorized {
    store: TokenStore,
    refresher: Arc<dyn TokenRefresher>,
}

impl RefreshOnUnauthorized {
    pub fn new(store: TokenStore, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self { store, refresher }
    }
}

#[async_trait]
impl Middleware for RefreshOnUnauthorized {
    async fn handle(&self, req: Request, next: Next<'_>) -> Result<Response, ApiError> {
        let replay = req.try_clone();
        let resp = next.run(req).await?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return Ok(resp);
        }

        let Some(replay) = replay else {
            debug!("401 on a streaming body; not replaying");
            return Ok(resp);
        };

        match refresh_session(&self.store, self.refresher.as_ref()).await {
            Ok(_) => {
                debug!(url = %replay.url(), "Replaying request after token refresh");
                next.run(replay).await
            }
            Err(e) => {
                warn!(error = %e, "Token refresh after 401 failed");
                Ok(resp)
            }
        }
    }
}

/// Logs each attempt with its status and latency.
pub struct RequestLog;

#[async_trait]
impl Middleware for RequestLog {
    async fn handle(&self, req: Request, next: Next<'_>) -> Result<Response, ApiError> {
        let method = req.method().clone();
        let url = req.url().clone();
        let started = Instant::now();
        let result = next.run(req).await;
        match &result {
            Ok(resp) => debug!(
                %method,
                %url,
                status = resp.status().as_u16(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Request completed"
            ),
            Err(e) => debug!(%method, %url, error = %e, "Request failed"),
        }
        result
    }
}
