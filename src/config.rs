//! Runtime configuration for the simulation core.
//!
//! [`SimConfig`] is plain data: every field has a default taken from
//! [`crate::constants`], and partial JSON documents only override the fields
//! they name. Call [`SimConfig::validate`] (done by [`SimConfig::load`] and
//! [`SimConfig::from_json_str`]) before handing a hand-built value to the
//! scheduler.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    CHARACTER_SPEED, CHARACTER_TURN_SPEED_DEGREES, STARTING_MANA, TICK_SECONDS, TILE_HALF_EXTENT,
    TILE_SIZE,
};

/// Errors raised while loading or validating a [`SimConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path that failed to load.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The document is not valid JSON for [`SimConfig`].
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    /// A field holds a value the scheduler cannot run with.
    #[error("invalid config field `{field}`: {reason}")]
    Invalid {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: &'static str,
    },
}

/// Tunable parameters of the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    /// Fixed duration of one tick in seconds.
    pub tick_seconds: f32,
    /// Edge length of one ground tile in world units.
    pub tile_size: f32,
    /// Tiles of margin guaranteed around every character.
    pub tile_half_extent: f32,
    /// Speed assigned to newly spawned characters (units per second).
    pub character_speed: f32,
    /// Mana assigned to newly spawned characters.
    pub starting_mana: f32,
    /// Display-side turn speed in degrees per second.
    pub turn_speed_degrees: f32,
    /// Upper bound on ticks drained by one `step` call; `None` drains all.
    pub max_ticks_per_step: Option<u32>,
    /// Whether tiles outside every character window are removed each tick.
    pub evict_tiles: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_seconds: TICK_SECONDS,
            tile_size: TILE_SIZE,
            tile_half_extent: TILE_HALF_EXTENT,
            character_speed: CHARACTER_SPEED,
            starting_mana: STARTING_MANA,
            turn_speed_degrees: CHARACTER_TURN_SPEED_DEGREES,
            max_ticks_per_step: None,
            evict_tiles: true,
        }
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: "must be finite and greater than zero",
        })
    }
}

impl SimConfig {
    /// Checks that every field can drive the scheduler.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] naming the first rejected field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("tick_seconds", self.tick_seconds)?;
        positive("tile_size", self.tile_size)?;
        positive("character_speed", self.character_speed)?;
        positive("turn_speed_degrees", self.turn_speed_degrees)?;
        if !(self.tile_half_extent.is_finite() && self.tile_half_extent >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "tile_half_extent",
                reason: "must be finite and not negative",
            });
        }
        if !self.starting_mana.is_finite() {
            return Err(ConfigError::Invalid {
                field: "starting_mana",
                reason: "must be finite",
            });
        }
        if self.max_ticks_per_step == Some(0) {
            return Err(ConfigError::Invalid {
                field: "max_ticks_per_step",
                reason: "must allow at least one tick",
            });
        }
        Ok(())
    }

    /// Parses and validates a JSON document.
    ///
    /// ```
    /// use shardfall::config::SimConfig;
    /// let config = SimConfig::from_json_str(r#"{ "tick_seconds": 0.1 }"#).unwrap();
    /// assert!((config.tick_seconds - 0.1).abs() < f32::EPSILON);
    /// assert!(config.evict_tiles);
    /// ```
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] when the file cannot be read, otherwise the
    /// errors of [`SimConfig::from_json_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn defaults_are_valid() {
        let config = SimConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_ticks_per_step, None);
    }

    #[rstest]
    fn partial_document_keeps_defaults() {
        let config = SimConfig::from_json_str(r#"{ "tile_size": 4.0, "evict_tiles": false }"#)
            .expect("valid config");
        assert!((config.tile_size - 4.0).abs() < f32::EPSILON);
        assert!(!config.evict_tiles);
        assert!((config.tick_seconds - TICK_SECONDS).abs() < f32::EPSILON);
    }

    #[rstest]
    #[case::zero_tick(r#"{ "tick_seconds": 0.0 }"#, "tick_seconds")]
    #[case::negative_tile(r#"{ "tile_size": -1.0 }"#, "tile_size")]
    #[case::negative_extent(r#"{ "tile_half_extent": -0.5 }"#, "tile_half_extent")]
    #[case::zero_clamp(r#"{ "max_ticks_per_step": 0 }"#, "max_ticks_per_step")]
    #[case::still_speed(r#"{ "character_speed": 0.0 }"#, "character_speed")]
    fn rejects_invalid_fields(#[case] json: &str, #[case] expected: &str) {
        match SimConfig::from_json_str(json) {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, expected),
            other => panic!("expected invalid `{expected}`, got {other:?}"),
        }
    }

    #[rstest]
    fn unknown_fields_are_parse_errors() {
        let result = SimConfig::from_json_str(r#"{ "tick_rate": 30 }"#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[rstest]
    fn missing_file_reports_path() {
        let result = SimConfig::load("/definitely/not/here.json");
        match result {
            Err(ConfigError::Io { path, .. }) => {
                assert_eq!(path, PathBuf::from("/definitely/not/here.json"));
            }
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
