pub mod client;
pub mod messages;

pub use client::SessionClient;
pub use messages::{FrameResult, Landmark, RecordingList};
