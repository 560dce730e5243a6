//! Segment windows and clip records.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::SessionId;

/// File extension of every produced clip.
pub const CLIP_EXTENSION: &str = "mp4";

/// A planned `(start, duration)` range, in seconds, to be extracted as one clip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SegmentWindow {
    /// Offset from the start of the source
    pub start: f64,
    /// Length of the window
    pub duration: f64,
}

impl SegmentWindow {
    pub fn new(start: f64, duration: f64) -> Self {
        Self { start, duration }
    }

    /// End offset of the window.
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Metadata of a successfully produced clip file.
///
/// Serialized to clients as `{name, url, duration}`; the sequence index is
/// implied by list order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClipRecord {
    /// 1-based position in the session's plan
    #[serde(skip_serializing, default)]
    pub index: u32,
    /// File name inside the session directory
    pub name: String,
    /// Relative URL the clip is served from
    pub url: String,
    /// Clip length in seconds
    pub duration: f64,
}

impl ClipRecord {
    /// Build the record for clip `index` of a session.
    pub fn new(session_id: &SessionId, index: u32, duration: f64) -> Self {
        let name = Self::file_name(index);
        let url = format!("/output/{}/{}", session_id, name);
        Self {
            index,
            name,
            url,
            duration,
        }
    }

    /// Deterministic file name for the clip at `index`.
    pub fn file_name(index: u32) -> String {
        format!("clip_{}.{}", index, CLIP_EXTENSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_end() {
        let window = SegmentWindow::new(10.0, 15.0);
        assert!((window.end() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_clip_record_paths() {
        let session = SessionId::new();
        let clip = ClipRecord::new(&session, 3, 12.0);
        assert_eq!(clip.name, "clip_3.mp4");
        assert_eq!(clip.url, format!("/output/{}/clip_3.mp4", session));
    }

    #[test]
    fn test_clip_record_wire_shape() {
        let session = SessionId::new();
        let clip = ClipRecord::new(&session, 1, 10.0);
        let json = serde_json::to_value(&clip).unwrap();

        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert_eq!(obj["name"], "clip_1.mp4");
        assert_eq!(obj["duration"], 10.0);
        assert!(!obj.contains_key("index"));
    }
}
