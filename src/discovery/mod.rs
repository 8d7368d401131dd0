//! Discovery list pipeline: search, department filter, sort and paginate.
//!
//! The free functions are pure. [`DiscoveryState`] owns the inputs that change
//! with user interaction and resets the page whenever the result set changes.

pub mod pagination;

use crate::models::Persona;
use serde::{Deserialize, Serialize};

/// Departments in display order. Anything else sorts after these.
pub const DEPARTMENT_ORDER: [&str; 3] = ["Tech", "Marketing", "Sales"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOption {
    pub label: String,
    pub value: String,
    pub active: bool,
}

impl FilterOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            active: false,
        }
    }
}

/// One inactive option per known department; none active means "All".
pub fn department_filters() -> Vec<FilterOption> {
    DEPARTMENT_ORDER
        .iter()
        .map(|d| FilterOption::new(*d, *d))
        .collect()
}

/// Case-insensitive substring match over name, personal name and description.
pub fn matches_search(persona: &Persona, query: &str) -> bool {
    let query = query.trim();
    if query.is_empty() {
        return true;
    }
    let haystack = format!(
        "{} {} {}",
        persona.name,
        persona.personal_name.as_deref().unwrap_or_default(),
        persona.description
    )
    .to_lowercase();
    haystack.contains(&query.to_lowercase())
}

pub fn matches_filters(persona: &Persona, filters: &[FilterOption]) -> bool {
    let mut active = filters.iter().filter(|f| f.active).peekable();
    if active.peek().is_none() {
        return true;
    }
    let Some(department) = persona.department.as_deref() else {
        return false;
    };
    active.any(|f| f.value == department)
}

pub fn department_rank(department: Option<&str>) -> usize {
    department
        .and_then(|d| DEPARTMENT_ORDER.iter().position(|known| *known == d))
        .unwrap_or(DEPARTMENT_ORDER.len())
}

/// Stable sort by department rank, then by name (case-sensitive).
pub fn sort_personas(personas: &mut [&Persona]) {
    personas.sort_by(|a, b| {
        department_rank(a.department.as_deref())
            .cmp(&department_rank(b.department.as_deref()))
            .then_with(|| a.name.cmp(&b.name))
    });
}

pub fn total_pages(count: usize, items_per_page: usize) -> usize {
    count.div_ceil(items_per_page.max(1)).max(1)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveryPage<'a> {
    pub items: Vec<&'a Persona>,
    pub total_items: usize,
    pub total_pages: usize,
    pub current_page: usize,
}

/// Filters, sorts and slices `personas`. `current_page` is 1-based and is not
/// clamped: a page past the end yields no items.
pub fn run_pipeline<'a>(
    personas: &'a [Persona],
    query: &str,
    filters: &[FilterOption],
    current_page: usize,
    items_per_page: usize,
) -> DiscoveryPage<'a> {
    let items_per_page = items_per_page.max(1);
    let mut matched: Vec<&Persona> = personas
        .iter()
        .filter(|p| matches_search(p, query) && matches_filters(p, filters))
        .collect();
    sort_personas(&mut matched);

    let total_items = matched.len();
    let start = current_page
        .saturating_sub(1)
        .saturating_mul(items_per_page)
        .min(total_items);
    let end = start.saturating_add(items_per_page).min(total_items);

    DiscoveryPage {
        items: matched[start..end].to_vec(),
        total_items,
        total_pages: total_pages(total_items, items_per_page),
        current_page,
    }
}

/// Search text, filters and page for the discovery view.
///
/// Any change to the query or filters puts the view back on page 1, and
/// [`DiscoveryState::view`] clamps the page into range, so a stale page
/// index never reaches the pipeline.
#[derive(Debug, Clone)]
pub struct DiscoveryState {
    query: String,
    filters: Vec<FilterOption>,
    current_page: usize,
    items_per_page: usize,
}

impl DiscoveryState {
    pub fn new(items_per_page: usize) -> Self {
        Self::with_filters(items_per_page, department_filters())
    }

    pub fn with_filters(items_per_page: usize, filters: Vec<FilterOption>) -> Self {
        Self {
            query: String::new(),
            filters,
            current_page: 1,
            items_per_page: items_per_page.max(1),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn filters(&self) -> &[FilterOption] {
        &self.filters
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn items_per_page(&self) -> usize {
        self.items_per_page
    }

    /// True when no department filter is active.
    pub fn is_all_selected(&self) -> bool {
        self.filters.iter().all(|f| !f.active)
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.current_page = 1;
    }

    /// Flips the filter with `value`. Returns `false` if no such filter exists.
    pub fn toggle_filter(&mut self, value: &str) -> bool {
        let Some(filter) = self.filters.iter_mut().find(|f| f.value == value) else {
            return false;
        };
        filter.active = !filter.active;
        self.current_page = 1;
        true
    }

    /// The "All" option: clears every department filter.
    pub fn select_all(&mut self) {
        for f in &mut self.filters {
            f.active = false;
        }
        self.current_page = 1;
    }

    pub fn set_page(&mut self, page: usize) {
        self.current_page = page.max(1);
    }

    pub fn view<'a>(&self, personas: &'a [Persona]) -> DiscoveryPage<'a> {
        let first = run_pipeline(personas, &self.query, &self.filters, 1, self.items_per_page);
        let page = self.current_page.min(first.total_pages);
        if page == 1 {
            return first;
        }
        run_pipeline(personas, &self.query, &self.filters, page, self.items_per_page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn persona(id: &str, name: &str, department: Option<&str>, description: &str) -> Persona {
        Persona {
            id: id.into(),
            name: name.into(),
            personal_name: None,
            department: department.map(Into::into),
            description: description.into(),
            avatar_url: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn roster() -> Vec<Persona> {
        vec![
            persona("1", "Zed", Some("Sales"), "Closes deals"),
            persona("2", "amy", Some("Tech"), "Writes Rust"),
            persona("3", "Bob", None, "Generalist"),
            persona("4", "Amy", Some("Tech"), "Reviews code"),
            persona("5", "Cleo", Some("Marketing"), "Runs campaigns"),
            persona("6", "Dan", Some("Legal"), "Reads contracts"),
        ]
    }

    fn ids(page: &DiscoveryPage<'_>) -> Vec<String> {
        page.items.iter().map(|p| p.id.clone()).collect()
    }

    #[test]
    fn empty_query_matches_everything() {
        let list = roster();
        assert!(list.iter().all(|p| matches_search(p, "")));
        assert!(list.iter().all(|p| matches_search(p, "   ")));
        let page = run_pipeline(&list, "", &[], 1, 100);
        assert_eq!(page.total_items, list.len());
    }

    #[test]
    fn search_is_case_insensitive_over_all_fields() {
        let mut p = persona("1", "Analyst", None, "Loves SPREADSHEETS");
        p.personal_name = Some("Ada".into());
        assert!(matches_search(&p, "analyst"));
        assert!(matches_search(&p, "ADA"));
        assert!(matches_search(&p, "spreadsheets"));
        assert!(!matches_search(&p, "rust"));
    }

    #[test]
    fn no_active_filter_means_all() {
        let filters = department_filters();
        assert!(roster().iter().all(|p| matches_filters(p, &filters)));
        assert!(roster().iter().all(|p| matches_filters(p, &[])));
    }

    #[test]
    fn active_filters_are_ored() {
        let mut filters = department_filters();
        filters[0].active = true; // Tech
        filters[2].active = true; // Sales
        let list = roster();
        let matched: Vec<&str> = list
            .iter()
            .filter(|p| matches_filters(p, &filters))
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(matched, vec!["1", "2", "4"]);
    }

    #[test]
    fn search_and_filter_are_anded() {
        let mut filters = department_filters();
        filters[0].active = true;
        let list = roster();
        let page = run_pipeline(&list, "rust", &filters, 1, 10);
        assert_eq!(ids(&page), vec!["2"]);
    }

    #[test]
    fn sort_by_department_then_name() {
        let list = roster();
        let page = run_pipeline(&list, "", &[], 1, 100);
        // Tech (Amy < amy), Marketing, Sales, then unknown and missing departments by name
        assert_eq!(ids(&page), vec!["4", "2", "5", "1", "3", "6"]);
    }

    #[test]
    fn sort_is_idempotent() {
        let list = roster();
        let mut once: Vec<&Persona> = list.iter().collect();
        sort_personas(&mut once);
        let mut twice = once.clone();
        sort_personas(&mut twice);
        assert_eq!(once, twice);
    }

    #[test]
    fn total_pages_has_floor_of_one() {
        assert_eq!(total_pages(0, 12), 1);
        assert_eq!(total_pages(1, 12), 1);
        assert_eq!(total_pages(12, 12), 1);
        assert_eq!(total_pages(13, 12), 2);
        assert_eq!(total_pages(25, 12), 3);
        assert_eq!(total_pages(5, 0), 5);
    }

    #[test]
    fn pagination_slices_and_does_not_clamp() {
        let list = roster();
        let page2 = run_pipeline(&list, "", &[], 2, 4);
        assert_eq!(ids(&page2), vec!["3", "6"]);
        assert_eq!(page2.total_pages, 2);

        let past_end = run_pipeline(&list, "", &[], 5, 4);
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.current_page, 5);
    }

    #[test]
    fn query_and_filter_changes_reset_page() {
        let mut state = DiscoveryState::new(2);
        state.set_page(3);
        state.set_query("a");
        assert_eq!(state.current_page(), 1);

        state.set_page(3);
        state.set_query("a");
        assert_eq!(state.current_page(), 1);

        state.set_page(2);
        assert!(state.toggle_filter("Tech"));
        assert_eq!(state.current_page(), 1);
        assert!(!state.is_all_selected());

        state.set_page(2);
        state.select_all();
        assert_eq!(state.current_page(), 1);
        assert!(state.is_all_selected());

        assert!(!state.toggle_filter("Nope"));
    }

    #[test]
    fn view_clamps_stale_page() {
        let list = roster();
        let mut state = DiscoveryState::new(2);
        state.set_page(3);
        assert_eq!(ids(&state.view(&list)), vec!["3", "6"]);

        state.set_page(40);
        let view = state.view(&list);
        assert_eq!(view.current_page, 3);
        assert_eq!(ids(&view), vec!["3", "6"]);
    }
}
