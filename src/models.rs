//! Canonical internal model. Backend JSON is normalized into these types in
//! the `api` layer, so nothing downstream has to know about alternate field names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub workspace_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Persona {
    pub id: String,
    pub name: String,
    pub personal_name: Option<String>,
    pub department: Option<String>,
    pub description: String,
    pub avatar_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    #[serde(alias = "user")]
    User,
    #[serde(alias = "assistant")]
    Assistant,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Visibility {
    #[default]
    #[serde(alias = "private")]
    Private,
    #[serde(alias = "shared")]
    Shared,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Conversation {
    pub id: String,
    pub persona_id: Option<String>,
    pub persona_name: Option<String>,
    pub title: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub archived: bool,
    pub visibility: Visibility,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Conversation {
    /// Most recent activity: last message timestamp, falling back to update/creation time.
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.messages
            .iter()
            .filter_map(|m| m.timestamp)
            .max()
            .or(self.updated_at)
            .or(self.created_at)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Snapshot of the persisted session, read through the token store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub user: Option<User>,
    pub workspace_id: Option<String>,
}
