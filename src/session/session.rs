use super::metadata::SessionMetadata;
use serde::{Deserialize, Serialize};

/// One recording session on the recognition server
///
/// Created only by a successful start. The session ID and metadata never change
/// afterwards; the frame count only moves forward as the server acknowledges frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSession {
    /// Identifier issued by the server
    session_id: String,

    /// Frames acknowledged by the server so far
    frame_count: u64,

    /// Whether the session can still take frames
    is_active: bool,

    /// Metadata sent with the start request
    metadata: SessionMetadata,
}

impl RecordingSession {
    pub(crate) fn new(session_id: String, metadata: SessionMetadata) -> Self {
        Self {
            session_id,
            frame_count: 0,
            is_active: true,
            metadata,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn metadata(&self) -> &SessionMetadata {
        &self.metadata
    }

    /// Record a server acknowledgement for `frame_number` (0-based).
    ///
    /// The count follows the server's sequence position, so it becomes
    /// `frame_number + 1` unless a later frame was already acknowledged.
    /// Returns whether the count moved.
    pub(crate) fn acknowledge(&mut self, frame_number: u64) -> bool {
        if !self.is_active {
            return false;
        }

        let position = frame_number.saturating_add(1);
        if position > self.frame_count {
            self.frame_count = position;
            true
        } else {
            false
        }
    }

    /// Consume the session and return its final, inactive state
    pub(crate) fn end(mut self) -> Self {
        self.is_active = false;
        self
    }
}
