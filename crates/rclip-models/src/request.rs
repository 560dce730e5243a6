//! Segmentation request models and validation.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::{CustomGeometry, ResolutionMode};

/// Maximum accepted length of a source URL.
pub const MAX_URL_LENGTH: usize = 2048;

/// Request validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Missing required parameters")]
    MissingParameters,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Durations must be positive whole seconds")]
    NonPositiveDuration,

    #[error("Min duration ({min}s) must be less than max duration ({max}s)")]
    InvalidRange { min: u32, max: u32 },

    #[error("Unknown resolution '{0}'. Expected one of: original, 9:16, 1:1, custom")]
    UnknownResolution(String),

    #[error("Invalid custom resolution {0}")]
    InvalidGeometry(CustomGeometry),
}

/// Raw body of `POST /api/process`.
///
/// Every field is optional so that missing fields are reported as a
/// validation error instead of a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    pub url: Option<String>,
    pub min_dur: Option<u32>,
    pub max_dur: Option<u32>,
    pub resolution: Option<String>,
    pub custom_width: Option<u32>,
    pub custom_height: Option<u32>,
}

impl ProcessRequest {
    /// Validate the raw body into a [`SegmentationRequest`].
    pub fn validate(self) -> Result<SegmentationRequest, RequestError> {
        let url = self.url.filter(|u| !u.trim().is_empty());
        let resolution = self.resolution.filter(|r| !r.trim().is_empty());

        let (Some(url), Some(min), Some(max), Some(resolution)) =
            (url, self.min_dur, self.max_dur, resolution)
        else {
            return Err(RequestError::MissingParameters);
        };

        let url = validate_source_url(&url)?;
        let range = DurationRange::new(min, max)?;
        let resolution: ResolutionMode = resolution
            .parse()
            .map_err(|_| RequestError::UnknownResolution(resolution.clone()))?;

        let custom = CustomGeometry::from_parts(self.custom_width, self.custom_height);
        if resolution == ResolutionMode::Custom && !custom.is_valid() {
            return Err(RequestError::InvalidGeometry(custom));
        }

        Ok(SegmentationRequest {
            url,
            range,
            resolution,
            custom,
        })
    }
}

/// Inclusive range of clip durations, in whole seconds.
///
/// Construction guarantees `0 < min < max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
pub struct DurationRange {
    min: u32,
    max: u32,
}

impl DurationRange {
    pub fn new(min: u32, max: u32) -> Result<Self, RequestError> {
        if min == 0 || max == 0 {
            return Err(RequestError::NonPositiveDuration);
        }
        if min >= max {
            return Err(RequestError::InvalidRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }
}

/// Validated input to a segmentation run.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct SegmentationRequest {
    /// Reference handed to the source resolver
    pub url: String,
    /// Allowed clip durations
    pub range: DurationRange,
    /// Geometry transform applied to every clip
    pub resolution: ResolutionMode,
    /// Frame used when `resolution` is `custom`
    pub custom: CustomGeometry,
}

fn validate_source_url(url: &str) -> Result<String, RequestError> {
    let url = url.trim();
    if url.len() > MAX_URL_LENGTH {
        return Err(RequestError::InvalidUrl(format!(
            "exceeds maximum length of {} characters",
            MAX_URL_LENGTH
        )));
    }

    let parsed = Url::parse(url).map_err(|e| RequestError::InvalidUrl(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(RequestError::InvalidUrl(format!(
                "unsupported protocol '{}'",
                scheme
            )))
        }
    }
    if parsed.host_str().is_none() {
        return Err(RequestError::InvalidUrl("missing host".to_string()));
    }

    Ok(url.to_string())
}
