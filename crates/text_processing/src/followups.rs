//! Follow-up question parsing

use once_cell::sync::Lazy;
use regex::Regex;

static LIST_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:\d+[.)]|[-*•])\s*(.+?)\s*$").expect("valid list item regex")
});

static LEADING_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:suggested\s+)?(?:follow[- ]?up\s+)?questions?\s*:\s*")
        .expect("valid label regex")
});

/// Remove a leading "Follow-up questions:" style label
pub fn strip_followup_label(text: &str) -> String {
    LEADING_LABEL.replace(text, "").trim().to_string()
}

/// Ordered questions from numbered (`1.`, `1)`) or bulleted (`-`, `*`, `•`)
/// lines, markers stripped
///
/// Without any list lines, falls back to lines ending in `?`.
pub fn parse_followups(text: &str) -> Vec<String> {
    let text = strip_followup_label(text);

    let items: Vec<String> = text
        .lines()
        .filter_map(|line| LIST_ITEM.captures(line))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .filter(|q| !q.is_empty())
        .collect();
    if !items.is_empty() {
        return items;
    }

    text.lines()
        .map(str::trim)
        .filter(|line| line.ends_with('?'))
        .map(str::to_string)
        .collect()
}
