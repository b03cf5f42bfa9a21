//! Session configuration. Built once at startup and shared read-only (via
//! `Rc`) by the board, its copies and the renderer.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Opaque tile identity (color / candy type). Kinds are compared for equality
/// only; the palette maps them to display colors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct TileKind(pub u8);

/// Color used for a tile whose kind is missing from the palette.
pub const FALLBACK_TILE_COLOR: &str = "#808080";

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct GameSettings {
    pub board_width: usize,
    pub board_height: usize,
    /// Side of one tile in canvas pixels.
    pub tile_size: f64,
    pub border_width: f64,
    pub border_color: String,
    /// Tiles per second.
    pub transition_speed: f64,
    pub min_combo: usize,
    /// Extra wait after all transitions finished before a deferred step runs.
    pub settle_delay_secs: f64,
    pub poll_interval_ms: f64,
    pub tile_colors: BTreeMap<TileKind, String>,
    pub fill_on_start: bool,
}

impl Default for GameSettings {
    fn default() -> Self {
        let tile_colors = [(1, "green"), (2, "red"), (3, "blue"), (4, "magenta")]
            .into_iter()
            .map(|(k, c)| (TileKind(k), c.to_string()))
            .collect();
        Self {
            board_width: 12,
            board_height: 8,
            tile_size: 40.0,
            border_width: 0.5,
            border_color: "#000000".to_string(),
            transition_speed: 7.0,
            min_combo: 3,
            settle_delay_secs: 0.25,
            poll_interval_ms: 10.0,
            tile_colors,
            fill_on_start: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("board must be at least 1x1, got {width}x{height}")]
    EmptyBoard { width: usize, height: usize },
    #[error("{field} must be a positive number, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },
    #[error("min_combo must be at least 2, got {0}")]
    MinComboTooSmall(usize),
    #[error("tile palette is empty")]
    EmptyPalette,
    #[cfg(feature = "serde_json")]
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

impl GameSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.board_width == 0 || self.board_height == 0 {
            return Err(ConfigError::EmptyBoard {
                width: self.board_width,
                height: self.board_height,
            });
        }
        positive("tile_size", self.tile_size)?;
        positive("transition_speed", self.transition_speed)?;
        positive("poll_interval_ms", self.poll_interval_ms)?;
        non_negative("border_width", self.border_width)?;
        non_negative("settle_delay_secs", self.settle_delay_secs)?;
        if self.min_combo < 2 {
            return Err(ConfigError::MinComboTooSmall(self.min_combo));
        }
        if self.tile_colors.is_empty() {
            return Err(ConfigError::EmptyPalette);
        }
        Ok(())
    }

    /// Parse a (possibly partial) JSON object; absent fields keep their
    /// defaults.
    #[cfg(feature = "serde_json")]
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn canvas_width(&self) -> f64 {
        self.board_width as f64 * self.tile_size
    }

    pub fn canvas_height(&self) -> f64 {
        self.board_height as f64 * self.tile_size
    }

    pub fn color_for(&self, kind: TileKind) -> &str {
        self.tile_colors
            .get(&kind)
            .map(String::as_str)
            .unwrap_or(FALLBACK_TILE_COLOR)
    }

    /// Palette kinds in ascending order.
    pub fn kinds(&self) -> Vec<TileKind> {
        self.tile_colors.keys().copied().collect()
    }
}
