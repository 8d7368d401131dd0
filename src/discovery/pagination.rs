use serde::Serialize;

pub const NARROW_MAX_VISIBLE: usize = 5;
pub const WIDE_MAX_VISIBLE: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "page", rename_all = "lowercase")]
pub enum PageItem {
    Page(usize),
    Ellipsis,
}

pub fn max_visible(narrow: bool) -> usize {
    if narrow {
        NARROW_MAX_VISIBLE
    } else {
        WIDE_MAX_VISIBLE
    }
}

/// Page buttons centred on `current`, with the first and last page pinned
/// and an ellipsis wherever pages are skipped.
pub fn page_window(current: usize, total: usize, max_visible: usize) -> Vec<PageItem> {
    let total = total.max(1);
    // A window wider than the page count shows every page.
    let max_visible = max_visible.clamp(1, total);
    let current = current.clamp(1, total);

    let mut start = current.saturating_sub(max_visible / 2).max(1);
    let end = start.saturating_add(max_visible - 1).min(total);
    if end - start + 1 < max_visible {
        start = (end + 1).saturating_sub(max_visible).max(1);
    }

    let mut items = Vec::with_capacity(max_visible.saturating_add(4));
    if start > 1 {
        items.push(PageItem::Page(1));
        if start > 2 {
            items.push(PageItem::Ellipsis);
        }
    }
    items.extend((start..=end).map(PageItem::Page));
    if end < total {
        if end + 1 < total {
            items.push(PageItem::Ellipsis);
        }
        items.push(PageItem::Page(total));
    }
    items
}
