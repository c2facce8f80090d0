//! Recording session model
//!
//! This module provides the data the session client hands back to callers:
//! - `RecordingSession`: the single active session and its acknowledged frame count
//! - `SessionMetadata`: the open key/value map captured when a session starts
//! - `RecordingSummary`: the server's stop result merged with the ended session

mod metadata;
mod session;
mod summary;

pub use metadata::{CameraFacing, SessionMetadata};
pub use session::RecordingSession;
pub use summary::RecordingSummary;
