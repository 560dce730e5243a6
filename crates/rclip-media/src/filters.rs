//! FFmpeg video filters for resolution modes.

use rclip_models::{CustomGeometry, ResolutionMode};

use crate::error::{MediaError, MediaResult};

/// Geometry change applied to a clip, derived from a resolution mode and the
/// source frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionTransform {
    /// Source geometry is kept
    Passthrough,
    /// Scale to `height`, then center-crop to `width` x `height`
    CenterCrop { width: u32, height: u32 },
    /// Fit inside the frame preserving aspect, then pad to exactly fill it
    Letterbox(CustomGeometry),
}

impl ResolutionTransform {
    /// Derive the transform for `mode` against a source of `source_height` pixels.
    ///
    /// Crop modes need a known source height; `original` and `custom` do not.
    pub fn derive(
        mode: ResolutionMode,
        custom: CustomGeometry,
        source_height: u32,
    ) -> MediaResult<Self> {
        match mode {
            ResolutionMode::Original => Ok(Self::Passthrough),
            ResolutionMode::Portrait | ResolutionMode::Square if source_height == 0 => Err(
                MediaError::invalid_geometry(format!("{} crop needs the source height", mode)),
            ),
            ResolutionMode::Portrait => Ok(Self::CenterCrop {
                width: portrait_width(source_height),
                height: source_height,
            }),
            ResolutionMode::Square => Ok(Self::CenterCrop {
                width: source_height,
                height: source_height,
            }),
            ResolutionMode::Custom if !custom.is_valid() => Err(MediaError::invalid_geometry(
                format!("custom frame {} is out of range", custom),
            )),
            ResolutionMode::Custom => Ok(Self::Letterbox(custom)),
        }
    }

    /// Build the `-vf` filter chain, or `None` when the geometry is unchanged.
    ///
    /// yuv420p output needs even dimensions, so an odd frame gets a final
    /// rescale to the nearest even size below it.
    pub fn to_filter(&self) -> Option<String> {
        let (chain, width, height) = match self {
            Self::Passthrough => return None,
            Self::CenterCrop { width, height } => (
                format!(
                    "scale=-2:{h},crop={w}:{h}:(iw-{w})/2:0",
                    w = width,
                    h = height
                ),
                *width,
                *height,
            ),
            Self::Letterbox(frame) => (
                format!(
                    "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2",
                    w = frame.width,
                    h = frame.height
                ),
                frame.width,
                frame.height,
            ),
        };

        if width % 2 == 0 && height % 2 == 0 {
            Some(chain)
        } else {
            Some(format!("{},{}", chain, EVEN_DIMENSIONS))
        }
    }
}

/// Trailing filter rounding both dimensions down to even.
const EVEN_DIMENSIONS: &str = "scale=trunc(iw/2)*2:trunc(ih/2)*2";

/// Width of a 9:16 frame at `height`, rounded down.
pub fn portrait_width(height: u32) -> u32 {
    (u64::from(height) * 9 / 16) as u32
}
