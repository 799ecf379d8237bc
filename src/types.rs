use serde::{Deserialize, Serialize};

// ── Game-clock timestamp ────────────────────────────────────────────

/// A fully decomposed in-game timestamp: day number plus time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameTimestamp {
    pub day: u32,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl GameTimestamp {
    /// Canonical encoding: seconds since day 0, 00:00:00.
    pub fn game_seconds(&self) -> u64 {
        self.day as u64 * 86400
            + self.hour as u64 * 3600
            + self.minute as u64 * 60
            + self.second as u64
    }

    /// Decompose a canonical game-second back into day/H/M/S.
    pub fn from_game_seconds(total: u64) -> Self {
        GameTimestamp {
            day: (total / 86400) as u32,
            hour: ((total % 86400) / 3600) as u8,
            minute: ((total % 3600) / 60) as u8,
            second: (total % 60) as u8,
        }
    }
}

/// A parsed time label. Labels that don't carry the expected
/// `<day> HH:MM:SS` pattern stay `Unknown`: they sort to game-second 0
/// and display as "Unknown", but the paragraph is still processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value")]
pub enum GameTime {
    Known(GameTimestamp),
    Unknown,
}

impl GameTime {
    pub fn game_seconds(&self) -> u64 {
        match self {
            GameTime::Known(t) => t.game_seconds(),
            GameTime::Unknown => 0,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, GameTime::Known(_))
    }
}

// ── Input paragraph (collaborator boundary) ─────────────────────────

/// A faction name appearing as a distinguished inline span.
/// `offset` is the byte position of the span's text within the
/// paragraph text, when the document layer was able to locate it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactionRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
}

/// One log paragraph as exported by the external document layer.
/// The markup tree itself is never seen here; the exporter has already
/// pulled out the distinguished spans (event time, faction links,
/// province name attribute).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogParagraph {
    pub text: String,
    /// Raw content of the event-time span, e.g. "day 36 22:40:06".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_label: Option<String>,
    /// Faction reference spans in document order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub faction_refs: Vec<FactionRef>,
    /// Province-name attribute, at most one per paragraph.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_ref: Option<String>,
}

impl LogParagraph {
    /// Byte position of a faction reference within the paragraph text,
    /// falling back to a plain substring search when the exporter did
    /// not record an offset.
    pub fn faction_offset(&self, r: &FactionRef) -> Option<usize> {
        r.offset.or_else(|| self.text.find(&r.name))
    }
}

/// Derive the coarse grouping key from a raw time label: everything
/// before the trailing `HH:MM[:SS]` token, e.g. "day 36 22:40:06" →
/// "day 36". Labels without a clock token group under themselves.
pub fn day_label(raw: &str) -> String {
    let trimmed = raw.trim();
    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    if let Some((last, head)) = tokens.split_last()
        && looks_like_clock(last)
        && !head.is_empty()
    {
        return head.join(" ");
    }
    trimmed.to_string()
}

fn looks_like_clock(token: &str) -> bool {
    let parts: Vec<&str> = token.split(':').collect();
    (2..=3).contains(&parts.len())
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

// ── Extracted records ───────────────────────────────────────────────

/// One "lost: N <unit-type>" line, already normalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CasualtyRecord {
    /// Coarse grouping key derived from the raw time label.
    pub day_label: String,
    pub faction: String,
    pub unit_type: String,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapEventKind {
    Combat,
    Occupy,
}

/// A geographically plottable event (destruction or occupation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapEvent {
    /// Sort key; 0 when the time label was absent or malformed.
    pub game_second: u64,
    /// Raw time label, kept for display.
    pub time_display: String,
    pub location: String,
    /// Human-readable description for popups/logs, already normalized.
    pub description: String,
    /// Acting faction; "Unknown" when no fallback applied.
    pub faction: String,
    /// Acting unit; placeholder names when recovered by fallback.
    pub unit_name: String,
    /// Faction on the receiving end, when the bracket heuristic finds
    /// one in the text before the destroyed-keyword.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub victim_faction: Option<String>,
    pub kind: MapEventKind,
}

/// One observation of a numbered unit, e.g. "7th Tank Division (Iraq)".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitSighting {
    pub faction: String,
    pub unit_number: u32,
    pub unit_type: String,
    /// Recency key; 0 when the time label was absent or malformed.
    pub game_second: u64,
    pub last_seen: String,
}

// ── Temporal anchor ─────────────────────────────────────────────────

/// A paired (real wall-clock instant, game-second) observation.
/// Anchors the bidirectional real↔game conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemporalAnchor {
    pub real: chrono::NaiveDateTime,
    pub game_second: u64,
}
