use super::auth::user_message;
use crate::models::{Conversation, Visibility};
use crate::App;
use serde::Serialize;
use std::cmp::Reverse;

#[derive(Debug, Clone, Default, Serialize)]
pub struct HistoryView {
    pub active: Vec<Conversation>,
    pub archived: Vec<Conversation>,
}

pub fn matches_history_search(conv: &Conversation, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    let contains = |s: &str| s.to_lowercase().contains(&query);
    conv.persona_name.as_deref().is_some_and(contains)
        || conv.title.as_deref().is_some_and(contains)
        || conv.messages.iter().any(|m| contains(&m.content))
}

/// Splits conversations into active and archived, newest activity first.
pub fn build_history(conversations: Vec<Conversation>, query: &str) -> HistoryView {
    let (mut archived, mut active): (Vec<_>, Vec<_>) = conversations
        .into_iter()
        .filter(|c| matches_history_search(c, query))
        .partition(|c| c.archived);
    active.sort_by_key(|c| Reverse(c.last_activity()));
    archived.sort_by_key(|c| Reverse(c.last_activity()));
    HistoryView { active, archived }
}

pub async fn load_history(app: &App, query: &str) -> Result<HistoryView, String> {
    let sessions = app
        .client
        .list_chat_sessions()
        .await
        .map_err(|e| user_message(&e))?;
    Ok(build_history(sessions, query))
}

pub async fn archive_conversation(app: &App, id: &str) -> Result<(), String> {
    app.client
        .archive_conversation(id)
        .await
        .map_err(|e| user_message(&e))
}

pub async fn unarchive_conversation(app: &App, id: &str) -> Result<(), String> {
    app.client
        .unarchive_conversation(id)
        .await
        .map_err(|e| user_message(&e))
}

pub async fn set_visibility(app: &App, id: &str, visibility: Visibility) -> Result<(), String> {
    app.client
        .set_conversation_visibility(id, visibility)
        .await
        .map_err(|e| user_message(&e))
}

/// Makes the conversation shared if needed, then returns a link to it.
pub async fn share_conversation(app: &App, conv: &Conversation) -> Result<String, String> {
    if conv.visibility != Visibility::Shared {
        set_visibility(app, &conv.id, Visibility::Shared).await?;
    }
    app.client
        .create_share_link(&conv.id)
        .await
        .map_err(|e| user_message(&e))
}
