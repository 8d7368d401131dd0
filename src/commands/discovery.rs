use super::auth::user_message;
use crate::discovery::pagination::{max_visible, page_window, PageItem};
use crate::discovery::{DiscoveryState, FilterOption};
use crate::models::Persona;
use crate::App;
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryView {
    pub items: Vec<Persona>,
    pub total_items: usize,
    pub total_pages: usize,
    pub current_page: usize,
    pub pages: Vec<PageItem>,
    pub filters: Vec<FilterOption>,
    pub all_selected: bool,
    pub query: String,
}

pub async fn load_personas(app: &App) -> Result<Vec<Persona>, String> {
    app.client.list_personas().await.map_err(|e| {
        warn!(error = %e, "Loading personas failed");
        user_message(&e)
    })
}

/// Renders the current discovery state over an already fetched persona list.
pub fn discovery_view(state: &DiscoveryState, personas: &[Persona], narrow: bool) -> DiscoveryView {
    let page = state.view(personas);
    DiscoveryView {
        pages: page_window(page.current_page, page.total_pages, max_visible(narrow)),
        items: page.items.into_iter().cloned().collect(),
        total_items: page.total_items,
        total_pages: page.total_pages,
        current_page: page.current_page,
        filters: state.filters().to_vec(),
        all_selected: state.is_all_selected(),
        query: state.query().to_string(),
    }
}
