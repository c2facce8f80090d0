use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sign_session::{
    CameraFacing, CaptureLoop, Config, DirectorySource, EncodedFrame, FrameOutcome,
    SessionClient, SessionMetadata,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sign-session")]
#[command(about = "Stream camera frames to a sign-language recognition server")]
struct Args {
    /// Config file (extension optional); SIGN_SESSION__* env vars override it
    #[arg(short, long, default_value = "config/sign-session")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the recordings the server knows about
    Recordings,

    /// Send a single image outside of any recording session
    Frame {
        /// Image file (.jpg, .jpeg or .png)
        path: PathBuf,
    },

    /// Record a session from a directory of images
    Stream {
        /// Directory of .jpg/.jpeg/.png frames, replayed in name order
        #[arg(short, long)]
        frames: PathBuf,

        /// Milliseconds between captures (overrides the config)
        #[arg(short, long)]
        interval_ms: Option<u64>,

        /// Stop after this many seconds even if frames remain
        #[arg(short, long)]
        duration_secs: Option<u64>,

        /// Start over from the first frame when the directory runs out
        #[arg(long)]
        loop_frames: bool,

        #[arg(long, default_value = "front")]
        camera_facing: CameraFacing,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;
    let client = Arc::new(SessionClient::new(&cfg.server)?);

    match args.command {
        Command::Recordings => {
            let list = client.list_recordings().await?;
            println!("{}", serde_json::to_string_pretty(&list)?);
        }
        Command::Frame { path } => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let mime_type = match path.extension().and_then(|e| e.to_str()) {
                Some("png") => "image/png",
                _ => EncodedFrame::DEFAULT_MIME_TYPE,
            };
            let result = client
                .process_frame(&EncodedFrame::from_bytes(&bytes, mime_type))
                .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Stream {
            frames,
            interval_ms,
            duration_secs,
            loop_frames,
            camera_facing,
        } => {
            let mut capture = cfg.capture.clone();
            if let Some(ms) = interval_ms {
                capture.frame_interval_ms = ms;
            }

            let source = DirectorySource::open(&frames)?.looping(loop_frames);
            let metadata = SessionMetadata::new()
                .with_device_type(std::env::consts::OS)
                .with_camera_facing(camera_facing)
                .with_timestamp(chrono::Utc::now());

            let (capture_loop, mut outcomes) =
                CaptureLoop::start(Arc::clone(&client), Box::new(source), metadata, capture).await?;
            info!("Recording into session {}", capture_loop.session_id());

            let report_outcomes = tokio::spawn(async move {
                while let Some(outcome) = outcomes.recv().await {
                    match outcome {
                        FrameOutcome::Processed(result) => {
                            info!(
                                "Frame {:?}: detected={} hands={}",
                                result.frame_number,
                                result.detected,
                                result.hand_count()
                            );
                        }
                        FrameOutcome::Failed(e) => warn!("Frame failed: {}", e),
                    }
                }
            });

            let deadline = duration_secs.map(Duration::from_secs);
            let started = tokio::time::Instant::now();
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        info!("Interrupted");
                        break;
                    }
                    _ = tokio::time::sleep(Duration::from_millis(200)) => {
                        if !capture_loop.is_capturing() {
                            break;
                        }
                        if deadline.is_some_and(|d| started.elapsed() >= d) {
                            info!("Duration reached");
                            break;
                        }
                    }
                }
            }

            let report = capture_loop.stop().await?;
            report_outcomes.await.context("Outcome reporter panicked")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
