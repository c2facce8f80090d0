use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::session::SessionMetadata;

/// Body of `POST /start-recording`
#[derive(Debug, Serialize)]
pub struct StartRecordingRequest<'a> {
    pub metadata: &'a SessionMetadata,
}

/// Reply to `POST /start-recording`
#[derive(Debug, Deserialize)]
pub struct StartRecordingResponse {
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Body of `POST /process-frame`
#[derive(Debug, Serialize)]
pub struct ProcessFrameRequest<'a> {
    /// Base64 image, or a `data:` URL for the legacy server
    pub frame: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<&'a str>,
}

/// One hand landmark in normalized image coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,

    /// Depth, omitted by 2D models
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,

    /// Per-point extras such as `visibility`
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Reply to `POST /process-frame`, handed back to the caller as-is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameResult {
    /// Echo of the session the frame was filed under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Server-side sequence position of this frame (0-based)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_number: Option<u64>,

    /// Whether any hand was found
    #[serde(default)]
    pub detected: bool,

    /// One list of points per detected hand
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmarks: Option<Vec<Vec<Landmark>>>,

    /// Recognition output and anything else the server added
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FrameResult {
    /// Number of hands the server reported
    pub fn hand_count(&self) -> usize {
        self.landmarks.as_ref().map_or(0, Vec::len)
    }
}

/// Body of `POST /stop-recording`
#[derive(Debug, Serialize)]
pub struct StopRecordingRequest<'a> {
    pub session_id: &'a str,
}

/// Reply to `POST /stop-recording`
#[derive(Debug, Deserialize)]
pub struct StopRecordingResponse {
    #[serde(default)]
    pub frame_count: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Reply to `GET /recordings`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingList {
    /// Past sessions, exactly as the server describes them
    #[serde(default)]
    pub recordings: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RecordingList {
    pub fn len(&self) -> usize {
        self.recordings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recordings.is_empty()
    }
}
