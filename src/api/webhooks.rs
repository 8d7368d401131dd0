use super::{read_json, ApiClient, ApiError};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const TRAITS_PATH: &str = "/api/webhooks/traits";
pub const TRAITS_FORWARD_PATH: &str = "/api/webhooks/traits/forward";
pub const HEALTH_PATH: &str = "/api/webhooks/health";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitUpdate<'a> {
    pub persona_id: &'a str,
    pub traits: &'a Map<String, Value>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct WebhookAck {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct WebhookHealth {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl WebhookHealth {
    pub fn is_healthy(&self) -> bool {
        matches!(self.status.to_ascii_lowercase().as_str(), "ok" | "healthy" | "up")
    }
}

impl ApiClient {
    /// Applies trait updates to a persona.
    pub async fn update_traits(
        &self,
        persona_id: &str,
        traits: &Map<String, Value>,
    ) -> Result<WebhookAck, ApiError> {
        self.send_json(Method::POST, self.url(TRAITS_PATH)?, &TraitUpdate { persona_id, traits })
            .await
    }

    /// Hands trait updates to the external workflow engine via the backend relay.
    pub async fn forward_traits(
        &self,
        persona_id: &str,
        traits: &Map<String, Value>,
    ) -> Result<WebhookAck, ApiError> {
        self.send_json(
            Method::POST,
            self.url(TRAITS_FORWARD_PATH)?,
            &TraitUpdate { persona_id, traits },
        )
        .await
    }

    pub async fn webhook_health(&self) -> Result<WebhookHealth, ApiError> {
        let req = self.request(Method::GET, HEALTH_PATH)?.build()?;
        read_json(self.fetch_public(req).await?).await
    }
}
