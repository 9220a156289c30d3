use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Thresholds used by the terminal-state rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Half-moves without a capture before the game is drawn.
    pub draw_threshold: u32,
    /// Recent half-moves of one side inspected for a two-square shuttle.
    pub repetition_window: usize,
    /// Occurrences of one defensive fingerprint that lose the game for the defenders.
    pub position_repeat_limit: u32,
    /// Fingerprints with fewer defending pieces than this are never penalised.
    pub min_defensive_pieces: u32,
    /// At or below this many attackers a king on the edge always counts as guarded.
    pub fort_attacker_floor: usize,
}

impl Default for RulesConfig {
    fn default() -> Self {
        RulesConfig {
            draw_threshold: 50,
            repetition_window: 6,
            position_repeat_limit: 3,
            min_defensive_pieces: 5,
            fort_attacker_floor: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub rules: RulesConfig,
    /// Search depth in plies; zero searches without a limit.
    pub attacker_depth: usize,
    pub defender_depth: usize,
    pub max_moves: usize,
    pub time_per_side_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            rules: RulesConfig::default(),
            attacker_depth: 2,
            defender_depth: 2,
            max_moves: 200,
            time_per_side_secs: 600,
        }
    }
}

impl EngineConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn time_per_side(&self) -> Duration {
        Duration::from_secs(self.time_per_side_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(
            r#"{ "attacker_depth": 3, "rules": { "draw_threshold": 80 } }"#,
        )
        .unwrap();

        assert_eq!(config.attacker_depth, 3);
        assert_eq!(config.defender_depth, 2);
        assert_eq!(config.rules.draw_threshold, 80);
        assert_eq!(config.rules.repetition_window, 6);
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(matches!(
            EngineConfig::from_json("{ attacker_depth: }"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            EngineConfig::load("/nonexistent/tafl.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
