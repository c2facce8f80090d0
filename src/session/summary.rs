use super::session::RecordingSession;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Result of stopping a session: the server's summary fields plus the ended session
///
/// Serializes flat, e.g. `{"frame_count": 2, "duration": 1.4, "session": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingSummary {
    /// Total frames the server processed for the session, if it reported one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_count: Option<u64>,

    /// Final state of the session (always inactive)
    pub session: RecordingSession,

    /// Every other field the server returned, untouched
    #[serde(flatten)]
    pub server_fields: Map<String, Value>,
}

impl RecordingSummary {
    pub(crate) fn new(
        frame_count: Option<u64>,
        mut server_fields: Map<String, Value>,
        session: RecordingSession,
    ) -> Self {
        // The local session snapshot takes precedence over a server field of the same name
        server_fields.remove("session");
        Self {
            frame_count,
            session: session.end(),
            server_fields,
        }
    }

    /// Frames the server counted, falling back to the locally acknowledged count
    pub fn total_frames(&self) -> u64 {
        self.frame_count.unwrap_or_else(|| self.session.frame_count())
    }
}
