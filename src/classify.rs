//! Paragraph classification by keyword membership.
//!
//! The log switched languages across eras of the source, so every kind
//! carries an English phrase set and a Japanese phrase set, checked
//! with OR. Casualty and map-event classification are independent: one
//! paragraph can report "X lost: …" and "… destroyed by …" in adjacent
//! sentences and then yields both record types.

use crate::types::MapEventKind;

/// "a unit was lost" phrases. The trailing colon matters: it is what
/// separates the loss report from the count that follows.
pub const LOSS_KEYWORDS_EN: &[&str] = &["lost:"];
pub const LOSS_KEYWORDS_JA: &[&str] = &["損失:"];

/// "a unit was destroyed by an attacker" phrases.
pub const DESTROYED_KEYWORDS_EN: &[&str] = &["destroyed by"];
pub const DESTROYED_KEYWORDS_JA: &[&str] = &["により撃破されました"];

/// "territory was occupied" phrases.
pub const OCCUPIED_KEYWORDS_EN: &[&str] = &["occupied"];
pub const OCCUPIED_KEYWORDS_JA: &[&str] = &["を占領しました"];

fn contains_any(text: &str, sets: &[&[&str]]) -> bool {
    sets.iter().any(|set| set.iter().any(|k| text.contains(k)))
}

/// Does this paragraph carry a casualty ("lost: N <unit>") report?
pub fn looks_like_casualty(text: &str) -> bool {
    contains_any(text, &[LOSS_KEYWORDS_EN, LOSS_KEYWORDS_JA])
}

/// Does this paragraph carry a plottable map event, and of which kind?
/// Combat keywords take precedence over occupation keywords: within the
/// map-event predicate the two kinds are mutually exclusive.
pub fn map_event_kind(text: &str) -> Option<MapEventKind> {
    if contains_any(text, &[DESTROYED_KEYWORDS_EN, DESTROYED_KEYWORDS_JA]) {
        Some(MapEventKind::Combat)
    } else if contains_any(text, &[OCCUPIED_KEYWORDS_EN, OCCUPIED_KEYWORDS_JA]) {
        Some(MapEventKind::Occupy)
    } else {
        None
    }
}

/// Byte position of the first destroyed-keyword occurrence, used by the
/// extractor's positional fallback and for display-text splitting.
pub fn destroyed_keyword_at(text: &str) -> Option<(usize, &'static str)> {
    DESTROYED_KEYWORDS_EN
        .iter()
        .chain(DESTROYED_KEYWORDS_JA)
        .filter_map(|k| text.find(k).map(|pos| (pos, *k)))
        .min_by_key(|(pos, _)| *pos)
}
