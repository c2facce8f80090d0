pub mod config;
pub mod driver;
pub mod source;

pub use config::CaptureConfig;
pub use driver::{CaptureLoop, CaptureReport, CaptureStats, FrameOutcome};
pub use source::{DirectorySource, EncodedFrame, FrameSource};
