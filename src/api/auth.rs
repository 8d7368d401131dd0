use super::middleware::bearer_value;
use super::{endpoint_url, read_json, read_message, ApiClient, ApiError};
use crate::models::{SessionTokens, User};
use crate::session::refresh::TokenRefresher;
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const REGISTER_PATH: &str = "/api/auth/register";
pub const REQUEST_RESET_PATH: &str = "/api/auth/request-password-reset";
pub const RESET_PASSWORD_PATH: &str = "/api/auth/reset-password";
pub const RESEND_VERIFICATION_PATH: &str = "/api/auth/resend-verification";
pub const VERIFY_EMAIL_PATH: &str = "/api/auth/verify-email";
pub const GOOGLE_PATH: &str = "/api/auth/google";
pub const REFRESH_PATH: &str = "/api/auth/refresh";

/// Credentials and user returned by a successful login.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthGrant {
    pub tokens: SessionTokens,
    pub user: User,
    pub workspace_id: Option<String>,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct EmailRequest<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct ResetPasswordRequest<'a> {
    token: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    #[serde(alias = "accessToken", alias = "access_token")]
    token: String,
    #[serde(default, alias = "refresh_token")]
    refresh_token: Option<String>,
    user: UserRecord,
    #[serde(default, alias = "workspace_id")]
    workspace_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRecord {
    #[serde(alias = "_id")]
    id: String,
    email: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, alias = "is_verified", alias = "emailVerified")]
    is_verified: bool,
    #[serde(default, alias = "workspace_id")]
    workspace_id: Option<String>,
}

impl From<UserRecord> for User {
    fn from(u: UserRecord) -> Self {
        User {
            id: u.id,
            email: u.email,
            name: u.name.filter(|n| !n.trim().is_empty()),
            is_verified: u.is_verified,
            workspace_id: u.workspace_id,
        }
    }
}

#[derive(Deserialize)]
struct RefreshResponse {
    #[serde(alias = "accessToken", alias = "access_token")]
    token: String,
}

impl ApiClient {
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthGrant, ApiError> {
        let req = self
            .request(Method::POST, LOGIN_PATH)?
            .json(&LoginRequest { email, password })
            .build()?;
        let resp = self.fetch_public(req).await?;
        let body: LoginResponse = read_json(resp).await?;

        let refresh_token = body
            .refresh_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Parse("Login response has no refresh token".into()))?;
        let user: User = body.user.into();
        let workspace_id = body.workspace_id.or_else(|| user.workspace_id.clone());

        debug!(user_id = %user.id, "Login succeeded");
        Ok(AuthGrant {
            tokens: SessionTokens {
                access_token: body.token,
                refresh_token,
            },
            user,
            workspace_id,
        })
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<String, ApiError> {
        let req = self
            .request(Method::POST, REGISTER_PATH)?
            .json(&RegisterRequest { name, email, password })
            .build()?;
        read_message(self.fetch_public(req).await?).await
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<String, ApiError> {
        let req = self
            .request(Method::POST, REQUEST_RESET_PATH)?
            .json(&EmailRequest { email })
            .build()?;
        read_message(self.fetch_public(req).await?).await
    }

    pub async fn reset_password(&self, token: &str, password: &str) -> Result<String, ApiError> {
        let req = self
            .request(Method::POST, RESET_PASSWORD_PATH)?
            .json(&ResetPasswordRequest { token, password })
            .build()?;
        read_message(self.fetch_public(req).await?).await
    }

    pub async fn resend_verification(&self, email: &str) -> Result<String, ApiError> {
        let req = self
            .request(Method::POST, RESEND_VERIFICATION_PATH)?
            .json(&EmailRequest { email })
            .build()?;
        read_message(self.fetch_public(req).await?).await
    }

    pub async fn verify_email(&self, token: &str) -> Result<String, ApiError> {
        let req = self
            .request(Method::GET, VERIFY_EMAIL_PATH)?
            .query(&[("token", token)])
            .build()?;
        read_message(self.fetch_public(req).await?).await
    }

    /// Where the shell should navigate to start Google sign-in. No request is made.
    pub fn google_auth_url(&self) -> Result<Url, ApiError> {
        self.url(GOOGLE_PATH)
    }
}

/// Calls the refresh endpoint directly, outside the middleware chain.
pub struct RefreshEndpoint {
    http: Client,
    base_url: Url,
}

impl RefreshEndpoint {
    pub fn new(http: Client, base_url: Url) -> Self {
        Self { http, base_url }
    }
}

#[async_trait]
impl TokenRefresher for RefreshEndpoint {
    async fn refresh(&self, refresh_token: &str) -> Result<String, ApiError> {
        let url = endpoint_url(&self.base_url, REFRESH_PATH)?;
        let resp = self
            .http
            .get(url)
            .header(AUTHORIZATION, bearer_value(refresh_token)?)
            .send()
            .await?;
        let body: RefreshResponse = read_json(resp).await?;
        if body.token.is_empty() {
            return Err(ApiError::Parse("Refresh response has an empty token".into()));
        }
        Ok(body.token)
    }
}
