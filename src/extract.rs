//! Structured field extraction from classified paragraphs.
//!
//! The log prose has no stable grammar: field order and phrasing vary
//! across eras of the source. Each extraction runs a primary pattern
//! and then an ordered chain of named fallbacks, every step returning
//! an `Option`. A pattern-miss is a normal branch, never an error —
//! under-extraction is expected and one malformed paragraph must not
//! abort the batch.

use regex::Regex;

use crate::classify;
use crate::dict::TermDict;
use crate::types::{
    CasualtyRecord, GameTime, LogParagraph, MapEvent, MapEventKind, UnitSighting, day_label,
};

/// Placeholder names for fallback-recovered fields.
const ENEMY_FORCES: &str = "Enemy Forces";
const OCCUPYING_FORCE: &str = "Occupying Force";
const UNKNOWN: &str = "Unknown";
const UNKNOWN_UNIT: &str = "Unknown Unit";

pub struct Extractor {
    dict: TermDict,
    /// Faction spellings to drop, in both languages.
    excluded: Vec<String>,
    /// Sighting allowlist; empty keeps every faction.
    targets: Vec<String>,
    re_casualty: Regex,
    re_combat: Regex,
    re_occupy: Regex,
    re_sighting: Regex,
    re_over_clause: Regex,
    re_bracket: Regex,
}

impl Extractor {
    pub fn new(dict: TermDict, excluded: Vec<String>, targets: Vec<String>) -> Self {
        // Loss keyword, count, then the unit-type remainder up to the
        // sentence terminator.
        let re_casualty =
            Regex::new(r"(?:lost:|損失:)\s*(\d+)\s*([^.。]+)").expect("casualty regex");

        // <destroyed-keyword> (the )?<unit-phrase> (<faction>), unit
        // phrase non-greedy up to the first parenthesis.
        let re_combat = Regex::new(
            r"(?:destroyed by|により撃破されました)\s*(?:the\s+)?([^()]+?)\s*\(([^)]+)\)",
        )
        .expect("combat regex");

        // <unit-phrase> (<faction>) ... occupied, anchored at the start
        // of the paragraph or after whitespace.
        let re_occupy = Regex::new(
            r"(?:^|\s)(?:The\s+)?([^()]+?)\s*\(([^)]+)\)\s*(?:has\s+)?(?:occupied|が?.{0,12}を占領しました)",
        )
        .expect("occupy regex");

        // <number><ordinal> <unit-type> (<faction>). The mandatory
        // ordinal suffix is what excludes casualty counts and
        // coordinates from matching.
        let re_sighting =
            Regex::new(r"(?:The\s+|by\s+the\s+)?(\d+)(?:st|nd|rd|th)\s+([^(]+?)\s+\(([^)]+)\)")
                .expect("sighting regex");

        // Trailing mission-context qualifier on casualty unit types,
        // e.g. "UAV over Normandy" — the clause is not unit identity.
        let re_over_clause = Regex::new(r"\s+over\s+.*$").expect("over regex");

        let re_bracket = Regex::new(r"\(([^)]+?)\)").expect("bracket regex");

        Extractor {
            dict,
            excluded,
            targets,
            re_casualty,
            re_combat,
            re_occupy,
            re_sighting,
            re_over_clause,
            re_bracket,
        }
    }

    /// The exclusion set carries both-language spellings, so the check
    /// runs on the original and the normalized form.
    fn is_excluded(&self, raw: &str, normalized: &str) -> bool {
        self.excluded.iter().any(|e| e == raw || e == normalized)
    }

    fn is_targeted(&self, raw: &str, normalized: &str) -> bool {
        self.targets.is_empty() || self.targets.iter().any(|t| t == raw || t == normalized)
    }

    fn time_display(p: &LogParagraph) -> String {
        p.time_label
            .as_deref()
            .unwrap_or(UNKNOWN)
            .trim()
            .to_string()
    }

    fn game_second(p: &LogParagraph) -> u64 {
        p.time_label
            .as_deref()
            .map(GameTime::parse_label)
            .unwrap_or(GameTime::Unknown)
            .game_seconds()
    }

    // ── Casualty extraction ─────────────────────────────────────────

    /// "… lost: 12 Main Battle Tank." → one CasualtyRecord. The victim
    /// is the first distinguished faction token; a count+remainder
    /// pattern miss yields no record even when the loss keyword is
    /// present.
    pub fn extract_casualty(&self, p: &LogParagraph) -> Option<CasualtyRecord> {
        if !classify::looks_like_casualty(&p.text) {
            return None;
        }

        let victim_raw = p
            .faction_refs
            .first()
            .map(|r| r.name.trim())
            .unwrap_or(UNKNOWN);

        let caps = self.re_casualty.captures(&p.text)?;
        let count: u64 = caps[1].parse().ok()?;

        let remainder = caps[2].trim();
        let without_qualifier = self.re_over_clause.replace(remainder, "");
        let unit_raw = without_qualifier
            .trim()
            .trim_end_matches([',', '!', '、', '！'])
            .trim();
        if unit_raw.is_empty() {
            return None;
        }

        let faction = self.dict.translate(victim_raw);
        if self.is_excluded(victim_raw, &faction) {
            return None;
        }

        Some(CasualtyRecord {
            day_label: day_label(p.time_label.as_deref().unwrap_or(UNKNOWN)),
            faction,
            unit_type: self.dict.translate(unit_raw),
            count,
        })
    }

    // ── Map-event extraction ────────────────────────────────────────

    /// Combat or occupation event, when the paragraph carries a
    /// distinguished location token (no location, no MapEvent).
    pub fn extract_map_event(&self, p: &LogParagraph) -> Option<MapEvent> {
        let kind = classify::map_event_kind(&p.text)?;
        let location = p.location_ref.as_deref()?.trim().to_string();

        let (unit_raw, faction_raw, description, victim_raw) = match kind {
            MapEventKind::Combat => self.combat_fields(p, &location)?,
            MapEventKind::Occupy => self.occupy_fields(p, &location)?,
        };

        let faction = self.dict.translate(&faction_raw);
        if self.is_excluded(&faction_raw, &faction) {
            return None;
        }

        let victim_faction = victim_raw.map(|v| self.dict.translate(&v));

        Some(MapEvent {
            game_second: Self::game_second(p),
            time_display: Self::time_display(p),
            location,
            description,
            faction,
            unit_name: self.dict.translate(&unit_raw),
            victim_faction,
            kind,
        })
    }

    /// Combat attacker resolution, as an ordered chain of attempts:
    /// primary pattern, then last-of-many faction tokens, then a single
    /// token positioned after the keyword, then Unknown.
    fn combat_fields(
        &self,
        p: &LogParagraph,
        location: &str,
    ) -> Option<(String, String, String, Option<String>)> {
        let (kw_pos, _) = classify::destroyed_keyword_at(&p.text)?;

        let (unit, faction) = self
            .combat_primary(&p.text)
            .or_else(|| self.combat_last_of_many(p))
            .or_else(|| self.combat_single_after_keyword(p, kw_pos))
            .unwrap_or((UNKNOWN_UNIT.to_string(), UNKNOWN.to_string()));

        // Split at the keyword; the remainder (keyword included) is the
        // display text, normalized and prefixed with the location.
        let after = p.text[kw_pos..].trim_end();
        let description = format!("{location}: {}", self.dict.translate(after));

        let victim = self.victim_before_keyword(&p.text[..kw_pos]);

        Some((unit, faction, description, victim))
    }

    fn combat_primary(&self, text: &str) -> Option<(String, String)> {
        let caps = self.re_combat.captures(text)?;
        Some((caps[1].trim().to_string(), caps[2].trim().to_string()))
    }

    /// ≥2 faction tokens: the last one is the attacker. A heuristic
    /// carried over from the source tooling, with no guarantee against
    /// the log's actual grammar.
    fn combat_last_of_many(&self, p: &LogParagraph) -> Option<(String, String)> {
        if p.faction_refs.len() < 2 {
            return None;
        }
        let last = p.faction_refs.last()?;
        Some((ENEMY_FORCES.to_string(), last.name.trim().to_string()))
    }

    /// Exactly one faction token, and it appears after the destroyed
    /// keyword: take it as the attacker.
    fn combat_single_after_keyword(
        &self,
        p: &LogParagraph,
        kw_pos: usize,
    ) -> Option<(String, String)> {
        if p.faction_refs.len() != 1 {
            return None;
        }
        let only = &p.faction_refs[0];
        let offset = p.faction_offset(only)?;
        if offset > kw_pos {
            Some((ENEMY_FORCES.to_string(), only.name.trim().to_string()))
        } else {
            None
        }
    }

    /// Victim faction from the parenthesized groups before the
    /// destroyed keyword: "<unit> (<faction>) (<id>) has been" carries
    /// the faction second-to-last; with a single group, take it as-is.
    fn victim_before_keyword(&self, before: &str) -> Option<String> {
        let brackets: Vec<String> = self
            .re_bracket
            .captures_iter(before)
            .map(|c| c[1].trim().to_string())
            .collect();
        match brackets.len() {
            0 => None,
            1 => Some(brackets[0].clone()),
            n => Some(brackets[n - 2].clone()),
        }
    }

    /// Occupation: primary pattern, else the first faction token with a
    /// placeholder unit.
    fn occupy_fields(
        &self,
        p: &LogParagraph,
        location: &str,
    ) -> Option<(String, String, String, Option<String>)> {
        let (unit, faction) = self
            .occupy_primary(&p.text)
            .or_else(|| self.occupy_first_token(p))?;

        let description = format!("{location}: Occupied by {}", self.dict.translate(&unit));
        Some((unit, faction, description, None))
    }

    fn occupy_primary(&self, text: &str) -> Option<(String, String)> {
        let caps = self.re_occupy.captures(text)?;
        Some((caps[1].trim().to_string(), caps[2].trim().to_string()))
    }

    fn occupy_first_token(&self, p: &LogParagraph) -> Option<(String, String)> {
        let first = p.faction_refs.first()?;
        Some((OCCUPYING_FORCE.to_string(), first.name.trim().to_string()))
    }

    // ── Unit-sighting extraction ────────────────────────────────────

    /// Every "<N><st|nd|rd|th> <unit-type> (<faction>)" occurrence in
    /// the paragraph, no dedup (that is the aggregator's job).
    pub fn extract_sightings(&self, p: &LogParagraph) -> Vec<UnitSighting> {
        let game_second = Self::game_second(p);
        let last_seen = Self::time_display(p);

        let mut sightings = Vec::new();
        for caps in self.re_sighting.captures_iter(&p.text) {
            let Ok(unit_number) = caps[1].parse::<u32>() else {
                continue;
            };
            let unit_raw = caps[2].trim();
            let faction_raw = caps[3].trim();

            let faction = self.dict.translate(faction_raw);
            if self.is_excluded(faction_raw, &faction) {
                continue;
            }
            if !self.is_targeted(faction_raw, &faction) {
                continue;
            }

            sightings.push(UnitSighting {
                faction,
                unit_number,
                unit_type: self.dict.translate(unit_raw),
                game_second,
                last_seen: last_seen.clone(),
            });
        }
        sightings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FactionRef;

    fn extractor() -> Extractor {
        Extractor::new(
            TermDict::default(),
            vec![
                "Undead".to_string(),
                "アンデッド".to_string(),
                "Rogue State".to_string(),
                "反乱軍".to_string(),
            ],
            Vec::new(),
        )
    }

    fn para(text: &str) -> LogParagraph {
        LogParagraph {
            text: text.to_string(),
            time_label: Some("day 36 22:40:06".to_string()),
            faction_refs: Vec::new(),
            location_ref: None,
        }
    }

    fn with_factions(mut p: LogParagraph, names: &[&str]) -> LogParagraph {
        p.faction_refs = names
            .iter()
            .map(|n| FactionRef {
                name: n.to_string(),
                offset: p.text.find(n),
            })
            .collect();
        p
    }

    // ── Casualty ─────────────────────────────────────────────────────

    #[test]
    fn test_casualty_basic() {
        let p = with_factions(
            para("Forces of Sudan lost: 12 Main Battle Tank."),
            &["Sudan"],
        );
        let rec = extractor().extract_casualty(&p).unwrap();
        assert_eq!(rec.faction, "スーダン");
        assert_eq!(rec.unit_type, "主力戦車");
        assert_eq!(rec.count, 12);
        assert_eq!(rec.day_label, "day 36");
    }

    #[test]
    fn test_casualty_missing_faction_token() {
        let p = para("They lost: 3 Frigate.");
        let rec = extractor().extract_casualty(&p).unwrap();
        assert_eq!(rec.faction, "Unknown");
        assert_eq!(rec.count, 3);
    }

    #[test]
    fn test_casualty_over_qualifier_trimmed() {
        let p = with_factions(para("Egypt lost: 2 UAV over Normandy."), &["Egypt"]);
        let rec = extractor().extract_casualty(&p).unwrap();
        assert_eq!(rec.unit_type, "UAV");
        assert_eq!(rec.count, 2);
    }

    #[test]
    fn test_casualty_pattern_miss_is_silent() {
        // Loss keyword present but no count follows: no record, no panic.
        let p = with_factions(para("Sudan lost: several units."), &["Sudan"]);
        assert!(extractor().extract_casualty(&p).is_none());
    }

    #[test]
    fn test_casualty_zero_count_tolerated() {
        let p = with_factions(para("Sudan lost: 0 Frigate."), &["Sudan"]);
        let rec = extractor().extract_casualty(&p).unwrap();
        assert_eq!(rec.count, 0);
    }

    #[test]
    fn test_casualty_excluded_victim_dropped() {
        let p = with_factions(para("Undead lost: 40 Undead Horde."), &["Undead"]);
        assert!(extractor().extract_casualty(&p).is_none());
    }

    #[test]
    fn test_casualty_unknown_time_label() {
        let mut p = with_factions(para("Sudan lost: 1 Corvette."), &["Sudan"]);
        p.time_label = None;
        let rec = extractor().extract_casualty(&p).unwrap();
        assert_eq!(rec.day_label, "Unknown");
    }

    // ── Combat ───────────────────────────────────────────────────────

    #[test]
    fn test_combat_primary_pattern() {
        let mut p = with_factions(
            para("The 12th Motorized Infantry (Sudan) has been destroyed by the 5th Tank Division (Romania)."),
            &["Sudan", "Romania"],
        );
        p.location_ref = Some("Normandy".to_string());
        let ev = extractor().extract_map_event(&p).unwrap();
        assert_eq!(ev.kind, MapEventKind::Combat);
        assert_eq!(ev.location, "Normandy");
        assert_eq!(ev.faction, "ルーマニア");
        assert_eq!(ev.unit_name, "5th 戦車師団");
        assert_eq!(ev.victim_faction.as_deref(), Some("スーダン"));
        assert!(ev.description.starts_with("Normandy: destroyed by"));
        assert_eq!(ev.game_second, 36 * 86400 + 22 * 3600 + 40 * 60 + 6);
    }

    #[test]
    fn test_combat_requires_location() {
        let p = with_factions(
            para("has been destroyed by the 5th Tank Division (Romania)."),
            &["Romania"],
        );
        assert!(extractor().extract_map_event(&p).is_none());
    }

    #[test]
    fn test_combat_fallback_last_of_many() {
        // No parenthesized attacker: fall back to the last faction token.
        let mut p = with_factions(
            para("A convoy of Belarus was destroyed by raiders of Iraq."),
            &["Belarus", "Iraq"],
        );
        p.location_ref = Some("Kiev".to_string());
        let ev = extractor().extract_map_event(&p).unwrap();
        assert_eq!(ev.faction, "イラク");
        assert_eq!(ev.unit_name, "Enemy Forces");
    }

    #[test]
    fn test_combat_fallback_single_token_after_keyword() {
        let mut p = with_factions(
            para("The garrison was destroyed by forces of Iraq."),
            &["Iraq"],
        );
        p.location_ref = Some("Mosul".to_string());
        let ev = extractor().extract_map_event(&p).unwrap();
        assert_eq!(ev.faction, "イラク");
        assert_eq!(ev.unit_name, "Enemy Forces");
    }

    #[test]
    fn test_combat_single_token_before_keyword_stays_unknown() {
        // The only faction token names the victim, not the attacker.
        let mut p = with_factions(
            para("Forces of Belarus were destroyed by an unidentified strike."),
            &["Belarus"],
        );
        p.location_ref = Some("Minsk".to_string());
        let ev = extractor().extract_map_event(&p).unwrap();
        assert_eq!(ev.faction, "Unknown");
        assert_eq!(ev.unit_name, "Unknown Unit");
    }

    #[test]
    fn test_combat_excluded_attacker_never_emitted() {
        let mut p = with_factions(
            para("has been destroyed by the Undead Horde (Undead)."),
            &["Undead"],
        );
        p.location_ref = Some("Cairo".to_string());
        assert!(extractor().extract_map_event(&p).is_none());
    }

    #[test]
    fn test_combat_victim_second_to_last_bracket() {
        let mut p = para(
            "The 3rd Unit (Belarus) (J 3) has been destroyed by the 1st Tank Division (Iraq).",
        );
        p.location_ref = Some("Minsk".to_string());
        let ev = extractor().extract_map_event(&p).unwrap();
        assert_eq!(ev.victim_faction.as_deref(), Some("ベラルーシ"));
    }

    // ── Occupy ───────────────────────────────────────────────────────

    #[test]
    fn test_occupy_primary_pattern() {
        let mut p = para("The 3rd Mechanized Infantry (Iraq) has occupied the province.");
        p.location_ref = Some("Mosul".to_string());
        let ev = extractor().extract_map_event(&p).unwrap();
        assert_eq!(ev.kind, MapEventKind::Occupy);
        assert_eq!(ev.faction, "イラク");
        assert_eq!(ev.unit_name, "3rd 機械化歩兵");
        assert_eq!(ev.description, "Mosul: Occupied by 3rd 機械化歩兵");
    }

    #[test]
    fn test_occupy_fallback_first_token() {
        let mut p = with_factions(
            para("Troops loyal to Egypt occupied the crossing at dawn."),
            &["Egypt"],
        );
        p.location_ref = Some("Suez".to_string());
        let ev = extractor().extract_map_event(&p).unwrap();
        assert_eq!(ev.faction, "エジプト");
        assert_eq!(ev.unit_name, "Occupying Force");
    }

    #[test]
    fn test_occupy_no_tokens_no_event() {
        let mut p = para("The bridge was occupied overnight.");
        p.location_ref = Some("Suez".to_string());
        assert!(extractor().extract_map_event(&p).is_none());
    }

    // ── Sightings ────────────────────────────────────────────────────

    #[test]
    fn test_sighting_basic() {
        let p = para("Scouts report the 7th Tank Division (Iraq) moving east.");
        let s = extractor().extract_sightings(&p);
        assert_eq!(s.len(), 1);
        assert_eq!(s[0].faction, "イラク");
        assert_eq!(s[0].unit_number, 7);
        assert_eq!(s[0].unit_type, "戦車師団");
        assert_eq!(s[0].game_second, 36 * 86400 + 22 * 3600 + 40 * 60 + 6);
    }

    #[test]
    fn test_sighting_multiple_matches() {
        let p = para(
            "The 1st Frigate (Finland) engaged the 22nd Attack Submarine (Iceland) offshore.",
        );
        let s = extractor().extract_sightings(&p);
        assert_eq!(s.len(), 2);
        assert_eq!(s[0].unit_number, 1);
        assert_eq!(s[1].unit_number, 22);
    }

    #[test]
    fn test_sighting_ordinal_suffix_mandatory() {
        // "12" is a casualty count, not a unit designator.
        let p = para("Sudan lost: 12 Main Battle Tank (Sudan).");
        assert!(extractor().extract_sightings(&p).is_empty());
    }

    #[test]
    fn test_sighting_excluded_faction_dropped() {
        let p = para("The 4th Undead Horde (Undead) shambled west.");
        assert!(extractor().extract_sightings(&p).is_empty());
    }

    #[test]
    fn test_sighting_target_allowlist() {
        let ex = Extractor::new(TermDict::default(), Vec::new(), vec!["Iraq".to_string()]);
        let p = para("The 7th Tank Division (Iraq) and the 3rd Frigate (Finland) met.");
        let s = ex.extract_sightings(&p);
        assert_eq!(s.len(), 1);
        assert_eq!(s[0].unit_number, 7);
    }
}
