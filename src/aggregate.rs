//! Grouping, deduplication and ordering of extracted records.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{CasualtyRecord, MapEvent, UnitSighting};

// ── Casualty aggregation ────────────────────────────────────────────

/// Summed losses for one (day-label, faction, unit-type) group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CasualtyGroup {
    pub day_label: String,
    pub faction: String,
    pub unit_type: String,
    pub count: u64,
}

/// Grand total for one (faction, unit-type) pair across all day labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitTypeTotal {
    pub faction: String,
    pub unit_type: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CasualtyReport {
    /// Per-day groups, faction ascending then count descending.
    pub groups: Vec<CasualtyGroup>,
    /// Faction + unit-type totals, same ordering.
    pub unit_type_totals: Vec<UnitTypeTotal>,
    /// Per-faction totals, heaviest losses first.
    pub faction_totals: Vec<(String, u64)>,
}

/// Group casualty records and compute the grand totals.
pub fn aggregate_casualties(records: &[CasualtyRecord]) -> CasualtyReport {
    let mut by_group: HashMap<(String, String, String), u64> = HashMap::new();
    let mut by_unit_type: HashMap<(String, String), u64> = HashMap::new();
    let mut by_faction: HashMap<String, u64> = HashMap::new();

    for r in records {
        *by_group
            .entry((r.day_label.clone(), r.faction.clone(), r.unit_type.clone()))
            .or_insert(0) += r.count;
        *by_unit_type
            .entry((r.faction.clone(), r.unit_type.clone()))
            .or_insert(0) += r.count;
        *by_faction.entry(r.faction.clone()).or_insert(0) += r.count;
    }

    let mut groups: Vec<CasualtyGroup> = by_group
        .into_iter()
        .map(|((day_label, faction, unit_type), count)| CasualtyGroup {
            day_label,
            faction,
            unit_type,
            count,
        })
        .collect();
    groups.sort_by(|a, b| {
        a.faction
            .cmp(&b.faction)
            .then(b.count.cmp(&a.count))
            .then(a.day_label.cmp(&b.day_label))
            .then(a.unit_type.cmp(&b.unit_type))
    });

    let mut unit_type_totals: Vec<UnitTypeTotal> = by_unit_type
        .into_iter()
        .map(|((faction, unit_type), count)| UnitTypeTotal {
            faction,
            unit_type,
            count,
        })
        .collect();
    unit_type_totals.sort_by(|a, b| {
        a.faction
            .cmp(&b.faction)
            .then(b.count.cmp(&a.count))
            .then(a.unit_type.cmp(&b.unit_type))
    });

    let mut faction_totals: Vec<(String, u64)> = by_faction.into_iter().collect();
    faction_totals.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    CasualtyReport {
        groups,
        unit_type_totals,
        faction_totals,
    }
}

// ── Unit-sighting deduplication ─────────────────────────────────────

/// Per-faction force estimate from deduplicated sightings. Unit
/// numbering in the source increments with force expansion, so the
/// maximum number seen is a proxy for total force size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForceEstimate {
    pub faction: String,
    /// Distinct unit numbers observed.
    pub distinct_units: usize,
    pub max_unit_number: u32,
    /// Most recent sighting per unit number, numbers descending.
    pub sightings: Vec<UnitSighting>,
}

/// Keep only the most recent sighting per (faction, unit-number):
/// highest game-second wins, ties keep the first encountered.
pub fn dedup_sightings(sightings: &[UnitSighting]) -> Vec<UnitSighting> {
    let mut latest: HashMap<(String, u32), UnitSighting> = HashMap::new();
    for s in sightings {
        let key = (s.faction.clone(), s.unit_number);
        match latest.get(&key) {
            Some(existing) if existing.game_second >= s.game_second => {}
            _ => {
                latest.insert(key, s.clone());
            }
        }
    }
    let mut out: Vec<UnitSighting> = latest.into_values().collect();
    out.sort_by(|a, b| {
        a.faction
            .cmp(&b.faction)
            .then(b.unit_number.cmp(&a.unit_number))
    });
    out
}

/// Dedup and fold sightings into per-faction force estimates,
/// factions ascending.
pub fn estimate_forces(sightings: &[UnitSighting]) -> Vec<ForceEstimate> {
    let deduped = dedup_sightings(sightings);

    let mut by_faction: Vec<ForceEstimate> = Vec::new();
    for s in deduped {
        match by_faction.last_mut() {
            Some(est) if est.faction == s.faction => {
                est.distinct_units += 1;
                est.max_unit_number = est.max_unit_number.max(s.unit_number);
                est.sightings.push(s);
            }
            _ => by_faction.push(ForceEstimate {
                faction: s.faction.clone(),
                distinct_units: 1,
                max_unit_number: s.unit_number,
                sightings: vec![s],
            }),
        }
    }
    by_faction
}

// ── Map-event ordering ──────────────────────────────────────────────

/// Chronological order for trajectory reconstruction: ascending
/// game-second, ties preserve encounter order (stable sort).
pub fn sort_map_events(events: &mut [MapEvent]) {
    events.sort_by_key(|e| e.game_second);
}
