use super::auth::user_message;
use crate::api::ApiError;
use crate::models::{Conversation, Persona};
use crate::App;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaDetail {
    pub persona: Persona,
    pub conversations: Vec<Conversation>,
}

/// Persona plus the user's conversations with it, fetched together.
pub async fn persona_detail(app: &App, id: &str) -> Result<PersonaDetail, String> {
    let (persona, conversations) =
        futures::try_join!(app.client.get_persona(id), app.client.list_conversations())
            .map_err(|e| match e {
                ApiError::Api { status: 404, .. } => "Persona not found.".to_string(),
                other => user_message(&other),
            })?;

    let mut conversations: Vec<Conversation> = conversations
        .into_iter()
        .filter(|c| c.persona_id.as_deref() == Some(persona.id.as_str()))
        .collect();
    conversations.sort_by_key(|c| std::cmp::Reverse(c.last_activity()));

    Ok(PersonaDetail {
        persona,
        conversations,
    })
}
