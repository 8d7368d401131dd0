use super::{read_message, ApiClient, ApiError};
use crate::models::{ChatMessage, Conversation, Role, Visibility};
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

pub const CONVERSATIONS_PATH: &str = "/api/conversations";
pub const CHAT_SESSIONS_PATH: &str = "/api/chat-sessions";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersonaRef {
    #[serde(alias = "_id")]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, alias = "personal_name")]
    personal_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageRecord {
    role: Role,
    #[serde(default)]
    content: String,
    #[serde(
        default,
        alias = "createdAt",
        alias = "created_at",
        deserialize_with = "super::timestamps::lenient_datetime"
    )]
    timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConversationRecord {
    #[serde(default, alias = "_id")]
    id: Option<String>,
    #[serde(default, alias = "conversation_id")]
    conversation_id: Option<String>,
    #[serde(default, alias = "persona_id")]
    persona_id: Option<String>,
    #[serde(default)]
    persona: Option<PersonaRef>,
    #[serde(default, alias = "persona_name")]
    persona_name: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    messages: Vec<MessageRecord>,
    #[serde(default, alias = "isArchived", alias = "is_archived")]
    archived: bool,
    #[serde(default)]
    visibility: Option<Visibility>,
    #[serde(default, alias = "created_at", deserialize_with = "super::timestamps::lenient_datetime")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "updated_at", deserialize_with = "super::timestamps::lenient_datetime")]
    updated_at: Option<DateTime<Utc>>,
}

impl ConversationRecord {
    fn into_conversation(self) -> Option<Conversation> {
        let id = self.conversation_id.or(self.id)?;
        let (ref_id, ref_name) = match self.persona {
            Some(p) => (p.id, p.personal_name.or(p.name)),
            None => (None, None),
        };
        Some(Conversation {
            id,
            persona_id: self.persona_id.or(ref_id),
            persona_name: self.persona_name.or(ref_name),
            title: self.title.filter(|t| !t.trim().is_empty()),
            messages: self
                .messages
                .into_iter()
                .map(|m| ChatMessage {
                    role: m.role,
                    content: m.content,
                    timestamp: m.timestamp,
                })
                .collect(),
            archived: self.archived,
            visibility: self.visibility.unwrap_or_default(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ConversationListBody {
    Bare(Vec<ConversationRecord>),
    Wrapped {
        #[serde(alias = "sessions", alias = "data")]
        conversations: Vec<ConversationRecord>,
    },
}

fn normalize_conversations(body: ConversationListBody) -> Vec<Conversation> {
    let records = match body {
        ConversationListBody::Bare(records) => records,
        ConversationListBody::Wrapped { conversations } => conversations,
    };
    records
        .into_iter()
        .filter_map(|r| {
            let conv = r.into_conversation();
            if conv.is_none() {
                warn!("Conversation record without an id; skipping");
            }
            conv
        })
        .collect()
}

#[derive(Serialize)]
struct VisibilityRequest {
    visibility: Visibility,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShareLinkBody {
    #[serde(default, alias = "share_url")]
    share_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    link: Option<String>,
}

impl ApiClient {
    pub async fn list_conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        let body: ConversationListBody = self.get_json(self.url(CONVERSATIONS_PATH)?).await?;
        let conversations = normalize_conversations(body);
        debug!(count = conversations.len(), "Fetched conversations");
        Ok(conversations)
    }

    pub async fn list_chat_sessions(&self) -> Result<Vec<Conversation>, ApiError> {
        let body: ConversationListBody = self.get_json(self.url(CHAT_SESSIONS_PATH)?).await?;
        Ok(normalize_conversations(body))
    }

    pub async fn archive_conversation(&self, id: &str) -> Result<(), ApiError> {
        self.post_action(self.url_with_segments(CONVERSATIONS_PATH, &[id, "archive"])?)
            .await
    }

    pub async fn unarchive_conversation(&self, id: &str) -> Result<(), ApiError> {
        self.post_action(self.url_with_segments(CONVERSATIONS_PATH, &[id, "unarchive"])?)
            .await
    }

    pub async fn set_conversation_visibility(
        &self,
        id: &str,
        visibility: Visibility,
    ) -> Result<(), ApiError> {
        let url = self.url_with_segments(CONVERSATIONS_PATH, &[id, "visibility"])?;
        let req = self
            .request_url(Method::POST, url)
            .json(&VisibilityRequest { visibility })
            .build()?;
        read_message(self.fetch_with_auth(req).await?).await?;
        Ok(())
    }

    /// Creates a shareable link and returns its URL.
    pub async fn create_share_link(&self, id: &str) -> Result<String, ApiError> {
        let body: ShareLinkBody = self
            .send_json(
                Method::POST,
                self.url_with_segments(CONVERSATIONS_PATH, &[id, "share"])?,
                &serde_json::json!({}),
            )
            .await?;
        body.share_url
            .or(body.url)
            .or(body.link)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ApiError::Parse("Share response has no link".into()))
    }

    async fn post_action(&self, url: Url) -> Result<(), ApiError> {
        let req = self.request_url(Method::POST, url).build()?;
        read_message(self.fetch_with_auth(req).await?).await?;
        Ok(())
    }
}
