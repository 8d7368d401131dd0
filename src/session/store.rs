use crate::db::{Database, Result};
use crate::models::{Session, SessionTokens, User};
use std::sync::Arc;
use tracing::{debug, warn};

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const WORKSPACE_ID_KEY: &str = "workspaceId";

pub const SESSION_KEYS: [&str; 4] = [TOKEN_KEY, USER_KEY, REFRESH_TOKEN_KEY, WORKSPACE_ID_KEY];

/// Sole writer of the persisted session. Cloning shares the same storage.
///
/// Tokens are opaque: nothing here inspects or validates their contents.
#[derive(Clone)]
pub struct TokenStore {
    db: Arc<Database>,
}

impl TokenStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn access_token(&self) -> Result<Option<String>> {
        self.db.get_item(TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Result<Option<String>> {
        self.db.get_item(REFRESH_TOKEN_KEY)
    }

    pub fn workspace_id(&self) -> Result<Option<String>> {
        self.db.get_item(WORKSPACE_ID_KEY)
    }

    /// Returns the stored user. A corrupt entry reads as no user rather than an error.
    pub fn get_user(&self) -> Result<Option<User>> {
        let Some(raw) = self.db.get_item(USER_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                warn!(error = %e, "Stored user entry is unreadable; ignoring it");
                Ok(None)
            }
        }
    }

    /// Current session, or `None` when no access token is stored.
    pub fn session(&self) -> Result<Option<Session>> {
        let Some(access_token) = self.access_token()? else {
            return Ok(None);
        };
        Ok(Some(Session {
            access_token,
            refresh_token: self.refresh_token()?,
            user: self.get_user()?,
            workspace_id: self.workspace_id()?,
        }))
    }

    pub fn is_authenticated(&self) -> Result<bool> {
        Ok(self.access_token()?.is_some())
    }

    pub fn set_session(
        &self,
        tokens: &SessionTokens,
        user: &User,
        workspace_id: Option<&str>,
    ) -> Result<()> {
        let user_json = serde_json::to_string(user)?;
        let workspace_id = workspace_id
            .or(user.workspace_id.as_deref())
            .unwrap_or_default();
        self.db.set_items(&[
            (TOKEN_KEY, tokens.access_token.as_str()),
            (USER_KEY, user_json.as_str()),
            (REFRESH_TOKEN_KEY, tokens.refresh_token.as_str()),
            (WORKSPACE_ID_KEY, workspace_id),
        ])?;
        debug!(user_id = %user.id, "Session stored");
        Ok(())
    }

    /// Replaces only the access token, as done by a refresh.
    pub fn set_access_token(&self, token: &str) -> Result<()> {
        self.db.set_item(TOKEN_KEY, token)
    }

    pub fn clear_session(&self) -> Result<()> {
        self.db.remove_items(&SESSION_KEYS)?;
        debug!("Session cleared");
        Ok(())
    }
}
