pub mod capture;
pub mod client;
pub mod config;
pub mod error;
pub mod session;

pub use capture::{
    CaptureConfig, CaptureLoop, CaptureReport, CaptureStats, DirectorySource, EncodedFrame,
    FrameOutcome, FrameSource,
};
pub use client::{FrameResult, Landmark, RecordingList, SessionClient};
pub use config::{ClientProfile, Config, DeploymentTarget, ServerConfig};
pub use error::{ErrorKind, SessionError};
pub use session::{CameraFacing, RecordingSession, RecordingSummary, SessionMetadata};
