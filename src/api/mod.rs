pub mod auth;
pub mod conversations;
pub mod middleware;
pub mod personas;
mod timestamps;
pub mod webhooks;

use crate::db::StoreError;
use crate::session::refresh::TokenRefresher;
use crate::session::store::TokenStore;
use middleware::{BearerAuth, Middleware, Next, RefreshOnUnauthorized, RequestLog};
use reqwest::{Client, Method, Request, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Not signed in")]
    Unauthenticated,
    #[error("Invalid request URL: {0}")]
    Url(#[from] url::ParseError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    /// Builds an `Api` error from a non-success response, reading `{error}` when the body is JSON.
    pub async fn from_response(resp: Response) -> Self {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        let message = error_message(&text).unwrap_or_else(|| {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                status.canonical_reason().unwrap_or("Request failed").to_string()
            } else {
                trimmed.to_string()
            }
        });
        ApiError::Api {
            status: status.as_u16(),
            message,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
            ApiError::Unauthenticated => Some(401),
            _ => None,
        }
    }

    /// Message carried by the backend, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Api { message, .. } => Some(message),
            _ => None,
        }
    }
}

impl Serialize for ApiError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn error_message(text: &str) -> Option<String> {
    let body: ErrorBody = serde_json::from_str(text).ok()?;
    body.error.or(body.message).filter(|m| !m.trim().is_empty())
}

/// Backend client. Authenticated calls go through the middleware stages;
/// auth endpoints that need no session go straight to the HTTP client.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    store: TokenStore,
    refresher: Arc<dyn TokenRefresher>,
    stages: Arc<[Arc<dyn Middleware>]>,
}

impl ApiClient {
    pub fn new(base_url: Url, store: TokenStore) -> Self {
        let http = Client::new();
        let refresher: Arc<dyn TokenRefresher> = Arc::new(auth::RefreshEndpoint::new(
            http.clone(),
            base_url.clone(),
        ));
        Self::with_refresher(http, base_url, store, refresher)
    }

    pub fn with_refresher(
        http: Client,
        base_url: Url,
        store: TokenStore,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Self {
        let stages: Vec<Arc<dyn Middleware>> = vec![
            Arc::new(RefreshOnUnauthorized::new(store.clone(), refresher.clone())),
            Arc::new(BearerAuth::new(store.clone())),
            Arc::new(RequestLog),
        ];
        Self {
            http,
            base_url,
            store,
            refresher,
            stages: stages.into(),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn refresher(&self) -> Arc<dyn TokenRefresher> {
        self.refresher.clone()
    }

    /// Absolute URL for an API path, keeping any path prefix on the base URL.
    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        endpoint_url(&self.base_url, path)
    }

    /// `base_path` followed by `segments`, each percent-encoded as a single path
    /// segment, so an id can never add path levels, a query or a fragment.
    pub fn url_with_segments(&self, base_path: &str, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.url(base_path)?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ApiError::Parse("Base URL cannot carry a path".into()))?;
            path.pop_if_empty();
            for segment in segments {
                if segment.is_empty() || *segment == "." || *segment == ".." {
                    return Err(ApiError::Parse(format!("Invalid path segment: {:?}", segment)));
                }
                path.push(segment);
            }
        }
        Ok(url)
    }

    pub fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder, ApiError> {
        Ok(self.http.request(method, self.url(path)?))
    }

    pub fn request_url(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        self.http.request(method, url)
    }

    /// Sends a request with the bearer token attached, retrying once after a refresh on 401.
    pub async fn fetch_with_auth(&self, req: Request) -> Result<Response, ApiError> {
        Next::new(&self.http, &self.stages).run(req).await
    }

    /// Sends a request that needs no session.
    pub async fn fetch_public(&self, req: Request) -> Result<Response, ApiError> {
        debug!(method = %req.method(), url = %req.url(), "Public request");
        Ok(self.http.execute(req).await?)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let req = self.http.get(url).build()?;
        let resp = self.fetch_with_auth(req).await?;
        read_json(resp).await
    }

    pub(crate) async fn send_json<B, T>(&self, method: Method, url: Url, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req = self.http.request(method, url).json(body).build()?;
        let resp = self.fetch_with_auth(req).await?;
        read_json(resp).await
    }
}

pub(crate) fn endpoint_url(base: &Url, path: &str) -> Result<Url, ApiError> {
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Ok(Url::parse(&joined)?)
}

/// Parses a success body as JSON; non-success statuses become `ApiError::Api`.
pub(crate) async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    if !resp.status().is_success() {
        return Err(ApiError::from_response(resp).await);
    }
    let text = resp.text().await?;
    serde_json::from_str(&text).map_err(|e| ApiError::Parse(e.to_string()))
}

/// Reads a `{message}` body, falling back to the plain text of the response.
pub(crate) async fn read_message(resp: Response) -> Result<String, ApiError> {
    if !resp.status().is_success() {
        return Err(ApiError::from_response(resp).await);
    }
    let text = resp.text().await?;

    #[derive(Deserialize)]
    struct MessageBody {
        message: Option<String>,
    }

    let message = serde_json::from_str::<MessageBody>(&text)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| text.trim().to_string());
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_url_keeps_base_path() {
        let base = Url::parse("https://api.example.com/backend/").unwrap();
        assert_eq!(
            endpoint_url(&base, "/api/personas").unwrap().as_str(),
            "https://api.example.com/backend/api/personas"
        );

        let base = Url::parse("http://localhost:3000").unwrap();
        assert_eq!(
            endpoint_url(&base, "api/auth/login").unwrap().as_str(),
            "http://localhost:3000/api/auth/login"
        );
    }

    fn client(base: &str) -> ApiClient {
        let store = TokenStore::new(Arc::new(crate::db::Database::in_memory().unwrap()));
        ApiClient::new(Url::parse(base).unwrap(), store)
    }

    #[test]
    fn id_segments_are_encoded() {
        let api = client("http://h");
        let url = api.url_with_segments("/api/personas", &["../auth/refresh"]).unwrap();
        assert_eq!(url.path(), "/api/personas/..%2Fauth%2Frefresh");

        let url = api.url_with_segments("/api/personas", &["a?b#c"]).unwrap();
        assert_eq!(url.path(), "/api/personas/a%3Fb%23c");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);

        let url = api
            .url_with_segments("/api/conversations", &["c 1", "archive"])
            .unwrap();
        assert_eq!(url.path(), "/api/conversations/c%201/archive");
    }

    #[test]
    fn id_segments_keep_base_prefix() {
        let api = client("https://api.example.com/backend/");
        let url = api.url_with_segments("/api/personas", &["p1"]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/backend/api/personas/p1");
    }

    #[test]
    fn dot_and_empty_segments_are_rejected() {
        let api = client("http://h");
        for id in ["", ".", ".."] {
            let err = api.url_with_segments("/api/personas", &[id]).unwrap_err();
            assert!(matches!(err, ApiError::Parse(_)), "{id:?} accepted");
        }
    }

    #[test]
    fn error_body_variants() {
        assert_eq!(error_message(r#"{"error":"Email not verified"}"#).as_deref(), Some("Email not verified"));
        assert_eq!(error_message(r#"{"message":"Nope"}"#).as_deref(), Some("Nope"));
        assert_eq!(error_message(r#"{"error":""}"#), None);
        assert_eq!(error_message("<html>Bad Gateway</html>"), None);
    }

    #[test]
    fn api_error_serializes_as_string() {
        let err = ApiError::Api {
            status: 404,
            message: "Persona not found".into(),
        };
        assert_eq!(
            serde_json::to_string(&err).unwrap(),
            "\"API error: 404 - Persona not found\""
        );
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.server_message(), Some("Persona not found"));
    }
}
