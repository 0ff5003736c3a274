use serde::{Deserialize, Serialize};

/// Envelope returned by every list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_pages: u32,
}

/// Slice a fully filtered result set into a page. The requested page is
/// clamped into `[1, total_pages]` and `total_pages` is never zero, so a
/// page beyond the end returns the last page rather than an empty one.
pub fn paginate<T>(items: Vec<T>, page: u32, page_size: u32) -> Page<T> {
    let page_size = page_size.max(1);
    let total = items.len() as u64;
    let total_pages = ((total + page_size as u64 - 1) / page_size as u64).max(1) as u32;
    let current = page.clamp(1, total_pages);
    let start = (current as usize - 1) * page_size as usize;
    let items = items
        .into_iter()
        .skip(start)
        .take(page_size as usize)
        .collect();
    Page {
        items,
        page: current,
        page_size,
        total,
        total_pages,
    }
}

/// Positive integer query param, or the fallback. Mirrors the lenient
/// parsing of the wire contract: absent, malformed, zero, and negative
/// values all fall back.
pub fn parse_number_param(value: Option<&str>, fallback: u32) -> u32 {
    value
        .and_then(|raw| raw.trim().parse::<u32>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(fallback)
}

/// Trimmed string query param; empty means absent.
pub fn parse_string_param(value: Option<&String>) -> Option<String> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Id-valued query param; malformed values mean "no filter", matching the
/// wire contract's treatment of non-finite ids.
pub fn parse_id_param(value: Option<&String>) -> Option<u64> {
    parse_string_param(value)?.parse::<u64>().ok()
}
