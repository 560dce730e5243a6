//! Resolution modes and custom output geometry.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default width for the `custom` resolution mode.
pub const DEFAULT_CUSTOM_WIDTH: u32 = 1080;
/// Default height for the `custom` resolution mode.
pub const DEFAULT_CUSTOM_HEIGHT: u32 = 1920;

/// Upper bound for either custom dimension (8K).
pub const MAX_CUSTOM_DIMENSION: u32 = 7680;

/// Target aspect/geometry transform applied to every clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
pub enum ResolutionMode {
    /// Source geometry is kept
    #[default]
    #[serde(rename = "original")]
    Original,
    /// Center crop to a vertical 9:16 frame
    #[serde(rename = "9:16")]
    Portrait,
    /// Center crop to a square frame
    #[serde(rename = "1:1")]
    Square,
    /// Letterbox into a caller-supplied frame
    #[serde(rename = "custom")]
    Custom,
}

impl ResolutionMode {
    pub const ALL: &'static [ResolutionMode] = &[
        ResolutionMode::Original,
        ResolutionMode::Portrait,
        ResolutionMode::Square,
        ResolutionMode::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionMode::Original => "original",
            ResolutionMode::Portrait => "9:16",
            ResolutionMode::Square => "1:1",
            ResolutionMode::Custom => "custom",
        }
    }
}

impl fmt::Display for ResolutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResolutionMode {
    type Err = ResolutionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        ResolutionMode::ALL
            .iter()
            .copied()
            .find(|mode| mode.as_str() == normalized)
            .ok_or_else(|| ResolutionParseError(s.to_string()))
    }
}

#[derive(Debug, Error)]
#[error("Unknown resolution: {0}")]
pub struct ResolutionParseError(String);

/// Output frame for the `custom` resolution mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CustomGeometry {
    pub width: u32,
    pub height: u32,
}

impl Default for CustomGeometry {
    fn default() -> Self {
        Self {
            width: DEFAULT_CUSTOM_WIDTH,
            height: DEFAULT_CUSTOM_HEIGHT,
        }
    }
}

impl CustomGeometry {
    /// Fill unset dimensions with the defaults.
    pub fn from_parts(width: Option<u32>, height: Option<u32>) -> Self {
        Self {
            width: width.unwrap_or(DEFAULT_CUSTOM_WIDTH),
            height: height.unwrap_or(DEFAULT_CUSTOM_HEIGHT),
        }
    }

    /// Whether both dimensions are usable as an encoder frame size.
    pub fn is_valid(&self) -> bool {
        (1..=MAX_CUSTOM_DIMENSION).contains(&self.width)
            && (1..=MAX_CUSTOM_DIMENSION).contains(&self.height)
    }
}

impl fmt::Display for CustomGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
