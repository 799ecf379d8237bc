//! Run configuration: term dictionary extensions, faction filters, the
//! speed multiplier, temporal anchors and the geocoding table.
//!
//! Everything temporal downstream depends on the anchors, so
//! configuration problems are fatal and surface before any extraction
//! begins — unlike paragraph-level degradation, which never is.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gametime::{self, TimeParseError};
use crate::types::TemporalAnchor;

pub const REAL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("speed multiplier must be positive, got {0}")]
    NonPositiveSpeed(f64),
    #[error("anchor {index}: malformed real time {value:?} (expected YYYY-MM-DD HH:MM:SS)")]
    MalformedRealTime { index: usize, value: String },
    #[error("anchor {index}: {source}")]
    MalformedGameTime {
        index: usize,
        #[source]
        source: TimeParseError,
    },
    #[error("at least {required} temporal anchors required, got {got}")]
    NotEnoughAnchors { required: usize, got: usize },
}

/// One configured (real instant, game day + time-of-day) pair, as
/// written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorConfig {
    /// "YYYY-MM-DD HH:MM:SS"
    pub real: String,
    pub game_day: u32,
    /// "HH:MM" or "HH:MM:SS"
    pub game_time: String,
}

fn default_speed() -> f64 {
    4.0
}

fn default_excluded() -> Vec<String> {
    ["Undead", "アンデッド", "AI", "Rogue State", "反乱軍", "Insurgencies"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Extra phrase → phrase entries layered over the built-in table.
    #[serde(default)]
    pub extra_terms: HashMap<String, String>,
    /// Non-player/system factions, in both-language spellings.
    #[serde(default = "default_excluded")]
    pub excluded_factions: Vec<String>,
    /// Sighting allowlist; empty keeps every faction.
    #[serde(default)]
    pub target_factions: Vec<String>,
    /// Game-seconds per real-second.
    #[serde(default = "default_speed")]
    pub speed: f64,
    #[serde(default)]
    pub anchors: Vec<AnchorConfig>,
    /// place name → (lat, lon), for the table-backed geocoder.
    #[serde(default)]
    pub locations: HashMap<String, (f64, f64)>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            extra_terms: HashMap::new(),
            excluded_factions: default_excluded(),
            target_factions: Vec::new(),
            speed: default_speed(),
            anchors: Vec::new(),
            locations: HashMap::new(),
        }
    }
}

impl RunConfig {
    /// Load and validate a config file. `None` falls back to defaults
    /// (which still validate, to keep one code path).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(p) => {
                let content = fs::read_to_string(p).map_err(|source| ConfigError::Io {
                    path: p.display().to_string(),
                    source,
                })?;
                serde_json::from_str(&content).map_err(|source| ConfigError::Json {
                    path: p.display().to_string(),
                    source,
                })?
            }
            None => RunConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.speed <= 0.0 {
            return Err(ConfigError::NonPositiveSpeed(self.speed));
        }
        // Anchor parse failures are fatal here, not deferred to use.
        for (i, a) in self.anchors.iter().enumerate() {
            parse_anchor(i, a)?;
        }
        Ok(())
    }

    /// The validated anchors as concrete (instant, game-second) pairs.
    pub fn temporal_anchors(&self) -> Result<Vec<TemporalAnchor>, ConfigError> {
        self.anchors
            .iter()
            .enumerate()
            .map(|(i, a)| parse_anchor(i, a))
            .collect()
    }

    /// The validated anchors, demanding at least `required` are present.
    pub fn require_anchors(&self, required: usize) -> Result<Vec<TemporalAnchor>, ConfigError> {
        let anchors = self.temporal_anchors()?;
        if anchors.len() < required {
            return Err(ConfigError::NotEnoughAnchors {
                required,
                got: anchors.len(),
            });
        }
        Ok(anchors)
    }
}

fn parse_anchor(index: usize, a: &AnchorConfig) -> Result<TemporalAnchor, ConfigError> {
    let real = NaiveDateTime::parse_from_str(&a.real, REAL_TIME_FORMAT).map_err(|_| {
        ConfigError::MalformedRealTime {
            index,
            value: a.real.clone(),
        }
    })?;
    let game_second = gametime::to_game_seconds(a.game_day, &a.game_time)
        .map_err(|source| ConfigError::MalformedGameTime { index, source })?;
    Ok(TemporalAnchor { real, game_second })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor(real: &str, day: u32, time: &str) -> AnchorConfig {
        AnchorConfig {
            real: real.to_string(),
            game_day: day,
            game_time: time.to_string(),
        }
    }

    #[test]
    fn test_defaults_validate() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.speed, 4.0);
        assert!(config.excluded_factions.contains(&"Undead".to_string()));
    }

    #[test]
    fn test_non_positive_speed_rejected() {
        let config = RunConfig {
            speed: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositiveSpeed(_))
        ));
    }

    #[test]
    fn test_anchor_parses() {
        let config = RunConfig {
            anchors: vec![anchor("2026-01-02 00:11:00", 37, "23:57:00")],
            ..Default::default()
        };
        let anchors = config.temporal_anchors().unwrap();
        assert_eq!(anchors[0].game_second, 37 * 86400 + 23 * 3600 + 57 * 60);
    }

    #[test]
    fn test_malformed_real_time_is_fatal() {
        let config = RunConfig {
            anchors: vec![anchor("yesterday", 37, "23:57:00")],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MalformedRealTime { index: 0, .. })
        ));
    }

    #[test]
    fn test_malformed_game_time_is_fatal() {
        let config = RunConfig {
            anchors: vec![anchor("2026-01-02 00:11:00", 37, "around midnight")],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MalformedGameTime { index: 0, .. })
        ));
    }

    #[test]
    fn test_require_anchors() {
        let config = RunConfig {
            anchors: vec![anchor("2026-01-02 00:11:00", 37, "23:57:00")],
            ..Default::default()
        };
        assert!(config.require_anchors(1).is_ok());
        assert!(matches!(
            config.require_anchors(2),
            Err(ConfigError::NotEnoughAnchors { .. })
        ));
    }

    #[test]
    fn test_config_json_round_trip() {
        let json = r#"{
            "speed": 4,
            "target_factions": ["Iraq", "Egypt", "Sudan"],
            "anchors": [
                {"real": "2026-01-02 00:11:00", "game_day": 37, "game_time": "23:57:00"},
                {"real": "2026-01-03 14:42:00", "game_day": 40, "game_time": "11:02:00"}
            ],
            "locations": {"Normandy": [49.0, -0.3]}
        }"#;
        let config: RunConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.anchors.len(), 2);
        assert_eq!(config.locations["Normandy"], (49.0, -0.3));
        // Unspecified fields fall back to defaults.
        assert!(config.excluded_factions.contains(&"アンデッド".to_string()));
    }
}
