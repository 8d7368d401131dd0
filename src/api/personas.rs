use super::{ApiClient, ApiError};
use crate::models::Persona;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, warn};

pub const PERSONAS_PATH: &str = "/api/personas";

/// Persona as the backend sends it; field names vary between endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PersonaRecord {
    #[serde(alias = "_id")]
    id: String,
    name: String,
    #[serde(default, alias = "personal_name")]
    personal_name: Option<String>,
    #[serde(default)]
    department: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, alias = "avatar_url")]
    avatar_url: Option<String>,
    #[serde(default)]
    avatar: Option<String>,
    #[serde(default, alias = "created_at", deserialize_with = "super::timestamps::lenient_datetime")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "updated_at", deserialize_with = "super::timestamps::lenient_datetime")]
    updated_at: Option<DateTime<Utc>>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl From<PersonaRecord> for Persona {
    fn from(r: PersonaRecord) -> Self {
        Persona {
            id: r.id,
            name: r.name,
            personal_name: non_blank(r.personal_name),
            department: non_blank(r.department),
            description: r.description.unwrap_or_default(),
            avatar_url: non_blank(r.avatar_url).or_else(|| non_blank(r.avatar)),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PersonaListBody {
    Bare(Vec<PersonaRecord>),
    Wrapped {
        #[serde(alias = "data")]
        personas: Vec<PersonaRecord>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PersonaBody {
    Wrapped { persona: PersonaRecord },
    Bare(PersonaRecord),
}

/// Normalizes records and drops repeated ids, keeping the first occurrence.
pub(crate) fn normalize_personas(records: Vec<PersonaRecord>) -> Vec<Persona> {
    let mut seen = HashSet::new();
    let mut personas = Vec::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.id.clone()) {
            warn!(persona_id = %record.id, "Duplicate persona id in response; skipping");
            continue;
        }
        personas.push(record.into());
    }
    personas
}

impl ApiClient {
    pub async fn list_personas(&self) -> Result<Vec<Persona>, ApiError> {
        let body: PersonaListBody = self.get_json(self.url(PERSONAS_PATH)?).await?;
        let records = match body {
            PersonaListBody::Bare(records) => records,
            PersonaListBody::Wrapped { personas } => personas,
        };
        let personas = normalize_personas(records);
        debug!(count = personas.len(), "Fetched personas");
        Ok(personas)
    }

    pub async fn get_persona(&self, id: &str) -> Result<Persona, ApiError> {
        let body: PersonaBody = self
            .get_json(self.url_with_segments(PERSONAS_PATH, &[id])?)
            .await?;
        let record = match body {
            PersonaBody::Wrapped { persona } => persona,
            PersonaBody::Bare(record) => record,
        };
        Ok(record.into())
    }
}
