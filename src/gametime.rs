//! Game-clock ↔ real-clock conversion and drift analysis.
//!
//! The in-fiction clock runs at a fixed multiple of real time (nominally
//! 4×). A [`TemporalAnchor`] pins one observed (real instant, game
//! timestamp) pair; everything else converts relative to it. Drift
//! estimation compares recorded observations against that nominal speed.

use std::sync::LazyLock;

use chrono::{Duration, NaiveDateTime};
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::types::{GameTime, GameTimestamp, TemporalAnchor};

#[derive(Debug, Error, PartialEq)]
pub enum TimeParseError {
    #[error("malformed time of day: {0:?} (expected HH:MM or HH:MM:SS)")]
    MalformedTimeOfDay(String),
    #[error("time of day out of range: {0:?}")]
    OutOfRange(String),
}

/// `<day> HH:MM:SS` anywhere in a raw label, e.g. "day 36 22:40:06".
static RE_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s+(\d{2}):(\d{2}):(\d{2})").expect("time label regex"));

/// Parse an "HH:MM" or "HH:MM:SS" string into (hour, minute, second).
pub fn parse_time_of_day(s: &str) -> Result<(u8, u8, u8), TimeParseError> {
    let parts: Vec<&str> = s.trim().split(':').collect();
    if !(2..=3).contains(&parts.len()) {
        return Err(TimeParseError::MalformedTimeOfDay(s.to_string()));
    }
    let mut nums = [0u8; 3];
    for (i, p) in parts.iter().enumerate() {
        nums[i] = p
            .parse()
            .map_err(|_| TimeParseError::MalformedTimeOfDay(s.to_string()))?;
    }
    let (h, m, sec) = (nums[0], nums[1], nums[2]);
    if h > 23 || m > 59 || sec > 59 {
        return Err(TimeParseError::OutOfRange(s.to_string()));
    }
    Ok((h, m, sec))
}

/// Canonical conversion: day + "HH:MM[:SS]" → total game-seconds.
pub fn to_game_seconds(day: u32, time_of_day: &str) -> Result<u64, TimeParseError> {
    let (h, m, s) = parse_time_of_day(time_of_day)?;
    Ok(GameTimestamp {
        day,
        hour: h,
        minute: m,
        second: s,
    }
    .game_seconds())
}

impl GameTime {
    /// Extract a game timestamp from a raw event-time label. Labels
    /// without the `<digits> HH:MM:SS` shape stay `Unknown` — temporal
    /// ordering degrades but the paragraph is still usable.
    pub fn parse_label(raw: &str) -> GameTime {
        let Some(caps) = RE_LABEL.captures(raw) else {
            return GameTime::Unknown;
        };
        // Captures are all-digit by construction; day may still overflow.
        let Ok(day) = caps[1].parse::<u32>() else {
            return GameTime::Unknown;
        };
        let (h, m, s) = (
            caps[2].parse::<u8>().unwrap(),
            caps[3].parse::<u8>().unwrap(),
            caps[4].parse::<u8>().unwrap(),
        );
        if h > 23 || m > 59 || s > 59 {
            return GameTime::Unknown;
        }
        GameTime::Known(GameTimestamp {
            day,
            hour: h,
            minute: m,
            second: s,
        })
    }
}

// ── Anchored conversion ─────────────────────────────────────────────

/// An anchor plus a speed multiplier (game-seconds per real-second).
#[derive(Debug, Clone, Copy)]
pub struct GameClock {
    pub anchor: TemporalAnchor,
    pub speed: f64,
}

impl GameClock {
    /// Real instant → game timestamp. Instants before the point where
    /// the game clock would read zero saturate at day 0, 00:00:00.
    pub fn real_to_game(&self, instant: NaiveDateTime) -> GameTimestamp {
        let elapsed = (instant - self.anchor.real).num_milliseconds() as f64 / 1000.0;
        let game_second = self.anchor.game_second as f64 + elapsed * self.speed;
        GameTimestamp::from_game_seconds(game_second.max(0.0) as u64)
    }

    /// Game-second → real instant; inverse of [`Self::real_to_game`]
    /// within one real second of integer game-second truncation.
    pub fn game_to_real(&self, game_second: u64) -> NaiveDateTime {
        let delta_game = game_second as f64 - self.anchor.game_second as f64;
        let delta_real_ms = (delta_game / self.speed * 1000.0).round() as i64;
        self.anchor.real + Duration::milliseconds(delta_real_ms)
    }
}

// ── Drift estimation ────────────────────────────────────────────────

/// One consecutive-observation interval in the drift report.
#[derive(Debug, Clone, Serialize)]
pub struct DriftInterval {
    /// 1-based index of the interval's end observation (sorted by real time).
    pub index: usize,
    pub real_delta_secs: f64,
    pub game_delta_secs: i64,
    /// Game-seconds per real-second over this interval; `None` marks a
    /// zero-duration interval (undefined ratio, excluded from the sums).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f64>,
    /// Signed `actual − expected` game-seconds at the end observation,
    /// measured against the earliest observation at the target speed.
    /// Positive means the game clock runs ahead of nominal.
    pub drift_secs: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DriftReport {
    pub target_speed: f64,
    pub intervals: Vec<DriftInterval>,
    pub total_real_secs: f64,
    pub total_game_secs: i64,
    /// `Σ game-delta / Σ real-delta`; `None` when no usable interval.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empirical_speed: Option<f64>,
    pub excluded_intervals: usize,
}

impl DriftReport {
    /// Whether the empirical speed agrees with the target within 0.1.
    pub fn on_target(&self) -> Option<bool> {
        self.empirical_speed
            .map(|s| (s - self.target_speed).abs() < 0.1)
    }
}

/// Compare recorded (real instant, game timestamp) observations against
/// a target speed. Needs at least two observations; the earliest (by
/// real time) becomes the anchor.
pub fn estimate_drift(
    observations: &[(NaiveDateTime, GameTimestamp)],
    target_speed: f64,
) -> Option<DriftReport> {
    if observations.len() < 2 {
        return None;
    }
    let mut sorted: Vec<(NaiveDateTime, u64)> = observations
        .iter()
        .map(|(r, g)| (*r, g.game_seconds()))
        .collect();
    sorted.sort_by_key(|(r, _)| *r);

    let (anchor_real, anchor_game) = sorted[0];

    let mut intervals = Vec::new();
    let mut total_real = 0.0f64;
    let mut total_game = 0i64;
    let mut excluded = 0usize;

    for i in 1..sorted.len() {
        let (prev_real, prev_game) = sorted[i - 1];
        let (curr_real, curr_game) = sorted[i];

        let real_delta = (curr_real - prev_real).num_milliseconds() as f64 / 1000.0;
        let game_delta = curr_game as i64 - prev_game as i64;

        // Expected game-second at this instant per the target speed.
        let elapsed = (curr_real - anchor_real).num_milliseconds() as f64 / 1000.0;
        let expected = anchor_game as f64 + elapsed * target_speed;
        let drift = curr_game as f64 - expected;

        let ratio = if real_delta == 0.0 {
            excluded += 1;
            None
        } else {
            total_real += real_delta;
            total_game += game_delta;
            Some(game_delta as f64 / real_delta)
        };

        intervals.push(DriftInterval {
            index: i,
            real_delta_secs: real_delta,
            game_delta_secs: game_delta,
            ratio,
            drift_secs: drift.round() as i64,
        });
    }

    let empirical_speed = if total_real > 0.0 {
        Some(total_game as f64 / total_real)
    } else {
        None
    };

    Some(DriftReport {
        target_speed,
        intervals,
        total_real_secs: total_real,
        total_game_secs: total_game,
        empirical_speed,
        excluded_intervals: excluded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn ts(day: u32, h: u8, m: u8, s: u8) -> GameTimestamp {
        GameTimestamp {
            day,
            hour: h,
            minute: m,
            second: s,
        }
    }

    // ── parsing ──────────────────────────────────────────────────────

    #[test]
    fn test_parse_time_of_day_variants() {
        assert_eq!(parse_time_of_day("23:57:00"), Ok((23, 57, 0)));
        assert_eq!(parse_time_of_day("14:30"), Ok((14, 30, 0)));
    }

    #[test]
    fn test_parse_time_of_day_rejects_garbage() {
        assert!(parse_time_of_day("noon").is_err());
        assert!(parse_time_of_day("14").is_err());
        assert!(parse_time_of_day("25:00:00").is_err());
        assert!(parse_time_of_day("12:61").is_err());
    }

    #[test]
    fn test_to_game_seconds() {
        assert_eq!(to_game_seconds(0, "00:00:00"), Ok(0));
        assert_eq!(
            to_game_seconds(37, "23:57:00"),
            Ok(37 * 86400 + 23 * 3600 + 57 * 60)
        );
    }

    #[test]
    fn test_parse_label_known() {
        let t = GameTime::parse_label("day 36 22:40:06");
        assert_eq!(t, GameTime::Known(ts(36, 22, 40, 6)));
        // Localized prefix still matches on the digit pattern.
        let t = GameTime::parse_label("日 20 13:09:41");
        assert_eq!(t, GameTime::Known(ts(20, 13, 9, 41)));
    }

    #[test]
    fn test_parse_label_unknown() {
        assert_eq!(GameTime::parse_label("Unknown"), GameTime::Unknown);
        assert_eq!(GameTime::parse_label(""), GameTime::Unknown);
        // Seconds missing → not the full pattern.
        assert_eq!(GameTime::parse_label("day 36 22:40"), GameTime::Unknown);
        // Out-of-range clock fields.
        assert_eq!(GameTime::parse_label("5 99:00:00"), GameTime::Unknown);
    }

    // ── anchored conversion ──────────────────────────────────────────

    fn clock() -> GameClock {
        GameClock {
            anchor: TemporalAnchor {
                real: dt("2026-01-02 00:11:00"),
                game_second: ts(37, 23, 57, 0).game_seconds(),
            },
            speed: 4.0,
        }
    }

    #[test]
    fn test_real_to_game_forward() {
        let c = clock();
        // One real hour at 4× = four game hours.
        let got = c.real_to_game(dt("2026-01-02 01:11:00"));
        assert_eq!(got, ts(38, 3, 57, 0));
    }

    #[test]
    fn test_game_to_real_inverse() {
        let c = clock();
        let game = ts(38, 3, 57, 0).game_seconds();
        assert_eq!(c.game_to_real(game), dt("2026-01-02 01:11:00"));
    }

    #[test]
    fn test_round_trip_within_one_second() {
        let c = clock();
        for offset in [0u64, 1, 59, 3600, 86400, 123456] {
            let game = c.anchor.game_second + offset;
            let back = c.real_to_game(c.game_to_real(game)).game_seconds();
            assert!(
                back.abs_diff(game) <= 1,
                "round trip drifted: {game} -> {back}"
            );
        }
    }

    #[test]
    fn test_real_to_game_saturates_before_epoch() {
        let c = GameClock {
            anchor: TemporalAnchor {
                real: dt("2026-01-02 00:00:00"),
                game_second: 100,
            },
            speed: 4.0,
        };
        let got = c.real_to_game(dt("2026-01-01 00:00:00"));
        assert_eq!(got.game_seconds(), 0);
    }

    // ── drift ────────────────────────────────────────────────────────

    #[test]
    fn test_drift_requires_two_observations() {
        assert!(estimate_drift(&[], 4.0).is_none());
        assert!(estimate_drift(&[(dt("2026-01-02 00:11:00"), ts(37, 23, 57, 0))], 4.0).is_none());
    }

    #[test]
    fn test_drift_exact_four_x() {
        let obs = vec![
            (dt("2026-01-02 00:00:00"), ts(37, 0, 0, 0)),
            (dt("2026-01-02 01:00:00"), ts(37, 4, 0, 0)),
            (dt("2026-01-02 02:00:00"), ts(37, 8, 0, 0)),
        ];
        let report = estimate_drift(&obs, 4.0).unwrap();
        assert_eq!(report.empirical_speed, Some(4.0));
        assert_eq!(report.on_target(), Some(true));
        assert!(report.intervals.iter().all(|iv| iv.drift_secs == 0));
    }

    #[test]
    fn test_drift_lagging_clock() {
        // Game advanced 3h over a real hour against a 4× target: lagging.
        let obs = vec![
            (dt("2026-01-02 00:00:00"), ts(37, 0, 0, 0)),
            (dt("2026-01-02 01:00:00"), ts(37, 3, 0, 0)),
        ];
        let report = estimate_drift(&obs, 4.0).unwrap();
        assert_eq!(report.intervals[0].drift_secs, -3600);
        assert_eq!(report.on_target(), Some(false));
    }

    #[test]
    fn test_drift_zero_duration_interval_excluded() {
        let obs = vec![
            (dt("2026-01-02 00:00:00"), ts(37, 0, 0, 0)),
            (dt("2026-01-02 00:00:00"), ts(37, 1, 0, 0)),
            (dt("2026-01-02 01:00:00"), ts(37, 5, 0, 0)),
        ];
        let report = estimate_drift(&obs, 4.0).unwrap();
        assert_eq!(report.excluded_intervals, 1);
        assert_eq!(report.intervals[0].ratio, None);
        // The remaining interval still contributes to the empirical sum.
        assert_eq!(report.empirical_speed, Some(4.0));
    }

    #[test]
    fn test_drift_sorts_by_real_time() {
        let obs = vec![
            (dt("2026-01-02 01:00:00"), ts(37, 4, 0, 0)),
            (dt("2026-01-02 00:00:00"), ts(37, 0, 0, 0)),
        ];
        let report = estimate_drift(&obs, 4.0).unwrap();
        assert_eq!(report.intervals.len(), 1);
        assert_eq!(report.intervals[0].game_delta_secs, 4 * 3600);
    }
}
