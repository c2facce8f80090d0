use anyhow::{Context, Result};
use base64::Engine;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One compressed camera image, base64-encoded for the JSON wire format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    data: String,
    mime_type: &'static str,
}

impl EncodedFrame {
    pub const DEFAULT_MIME_TYPE: &'static str = "image/jpeg";

    /// Encode raw image bytes
    pub fn from_bytes(bytes: &[u8], mime_type: &'static str) -> Self {
        Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            mime_type,
        }
    }

    /// Wrap text that is already base64 (e.g. what a camera API hands back)
    pub fn from_base64(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: Self::DEFAULT_MIME_TYPE,
        }
    }

    pub fn as_base64(&self) -> &str {
        &self.data
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    /// `data:<mime>;base64,<data>`, the form the frame-only server expects
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    /// Encoded length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Producer of encoded frames for the capture loop
///
/// Implementations:
/// - Camera bridges on device (outside this crate)
/// - `DirectorySource`: replays image files (for testing/desktop runs)
#[async_trait::async_trait]
pub trait FrameSource: Send {
    /// Grab the next frame
    ///
    /// Returns `None` once the source has nothing more to give.
    async fn next_frame(&mut self) -> Result<Option<EncodedFrame>>;

    /// Get source name for logging
    fn name(&self) -> &str;
}

/// Replays the images in a directory, in file-name order
pub struct DirectorySource {
    name: String,
    files: Vec<PathBuf>,
    position: usize,
    looping: bool,
}

impl DirectorySource {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        info!("Opening frame directory: {}", dir.display());

        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read frame directory {}", dir.display()))?
        {
            let path = entry.context("Failed to read directory entry")?.path();
            if path.is_file() && mime_type_for(&path).is_some() {
                files.push(path);
            }
        }
        files.sort();

        if files.is_empty() {
            anyhow::bail!("No .jpg, .jpeg or .png frames found in {}", dir.display());
        }

        info!("Found {} frames in {}", files.len(), dir.display());

        Ok(Self {
            name: format!("directory:{}", dir.display()),
            files,
            position: 0,
            looping: false,
        })
    }

    /// Start over from the first file instead of running dry
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn frame_files(&self) -> &[PathBuf] {
        &self.files
    }
}

#[async_trait::async_trait]
impl FrameSource for DirectorySource {
    async fn next_frame(&mut self) -> Result<Option<EncodedFrame>> {
        if self.position >= self.files.len() {
            if !self.looping {
                return Ok(None);
            }
            self.position = 0;
        }

        let path = &self.files[self.position];
        self.position += 1;

        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read frame {}", path.display()))?;
        let mime_type = mime_type_for(path).unwrap_or(EncodedFrame::DEFAULT_MIME_TYPE);

        debug!("Loaded frame {} ({} bytes)", path.display(), bytes.len());

        Ok(Some(EncodedFrame::from_bytes(&bytes, mime_type)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn mime_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        _ => None,
    }
}
