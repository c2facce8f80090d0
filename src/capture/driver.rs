use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::config::CaptureConfig;
use super::source::FrameSource;
use crate::client::{FrameResult, SessionClient};
use crate::error::SessionError;
use crate::session::{RecordingSession, RecordingSummary, SessionMetadata};

/// What happened to one submitted frame
#[derive(Debug)]
pub enum FrameOutcome {
    Processed(FrameResult),
    Failed(SessionError),
}

/// Counters kept by the capture ticker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CaptureStats {
    /// Frames pulled from the source and submitted
    pub frames_captured: u64,

    /// Ticks skipped because too many submissions were outstanding
    pub frames_dropped: u64,

    /// Ticks where the source failed to produce a frame
    pub capture_errors: u64,
}

/// Everything a finished capture run produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureReport {
    pub summary: RecordingSummary,
    pub stats: CaptureStats,
}

/// Drives a recording: one capture per tick, each frame submitted in its own task
///
/// Submissions overlap freely, so a slow server never delays the next capture.
pub struct CaptureLoop {
    client: Arc<SessionClient>,
    session: RecordingSession,
    stop_tx: Option<oneshot::Sender<()>>,
    ticker: Option<JoinHandle<CaptureStats>>,
}

impl CaptureLoop {
    /// Start a recording session and begin capturing
    ///
    /// Nothing is spawned if the session cannot be started. Frame outcomes arrive
    /// on the returned receiver; dropping it only discards them.
    pub async fn start(
        client: Arc<SessionClient>,
        source: Box<dyn FrameSource>,
        metadata: SessionMetadata,
        config: CaptureConfig,
    ) -> Result<(Self, mpsc::Receiver<FrameOutcome>), SessionError> {
        let session = client.start_recording(metadata).await?;

        info!(
            "Capturing from {} every {:?} into session {}",
            source.name(),
            config.frame_interval(),
            session.session_id()
        );

        let (outcome_tx, outcome_rx) = mpsc::channel(config.outcome_buffer());
        let (stop_tx, stop_rx) = oneshot::channel();

        let ticker = tokio::spawn(run_ticker(
            Arc::clone(&client),
            source,
            config,
            outcome_tx,
            stop_rx,
        ));

        Ok((
            Self {
                client,
                session,
                stop_tx: Some(stop_tx),
                ticker: Some(ticker),
            },
            outcome_rx,
        ))
    }

    pub fn session_id(&self) -> &str {
        self.session.session_id()
    }

    /// Whether the ticker is still capturing (false once the source ran dry)
    pub fn is_capturing(&self) -> bool {
        self.ticker.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop capturing, let in-flight frames settle, then stop the session
    pub async fn stop(mut self) -> Result<CaptureReport, SessionError> {
        info!("Stopping capture for session {}", self.session.session_id());

        if let Some(stop_tx) = self.stop_tx.take() {
            // Err only means the ticker already finished on its own
            let _ = stop_tx.send(());
        }

        let stats = match self.ticker.take() {
            Some(ticker) => match ticker.await {
                Ok(stats) => stats,
                Err(e) => {
                    error!("Capture task panicked: {}", e);
                    CaptureStats::default()
                }
            },
            None => CaptureStats::default(),
        };

        let summary = self.client.stop_recording().await?;

        info!(
            "Capture finished: {} captured, {} dropped, {} capture errors",
            stats.frames_captured, stats.frames_dropped, stats.capture_errors
        );

        Ok(CaptureReport { summary, stats })
    }
}

impl Drop for CaptureLoop {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            warn!("Capture loop dropped without stop(); session left open on the server");
            ticker.abort();
        }
    }
}

async fn run_ticker(
    client: Arc<SessionClient>,
    mut source: Box<dyn FrameSource>,
    config: CaptureConfig,
    outcome_tx: mpsc::Sender<FrameOutcome>,
    mut stop_rx: oneshot::Receiver<()>,
) -> CaptureStats {
    let mut stats = CaptureStats::default();
    let mut in_flight = FuturesUnordered::new();
    let mut delivering = FuturesUnordered::new();
    let max_in_flight = config.max_in_flight();
    let mut interval = tokio::time::interval(config.frame_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("Capture task started");

    loop {
        tokio::select! {
            _ = &mut stop_rx => {
                debug!("Stop signal received");
                break;
            }
            Some(joined) = in_flight.next(), if !in_flight.is_empty() => {
                if let Some(outcome) = settle(joined) {
                    delivering.push(deliver(&outcome_tx, outcome));
                }
            }
            Some(_) = delivering.next(), if !delivering.is_empty() => {}
            _ = interval.tick() => {
                // Outcomes the caller has not taken yet hold their slot too
                let outstanding = in_flight.len() + delivering.len();
                if outstanding >= max_in_flight {
                    stats.frames_dropped += 1;
                    warn!("{} frames outstanding, skipping capture", outstanding);
                    continue;
                }

                match source.next_frame().await {
                    Ok(Some(frame)) => {
                        stats.frames_captured += 1;
                        let client = Arc::clone(&client);
                        in_flight.push(tokio::spawn(async move {
                            match client.process_frame(&frame).await {
                                Ok(result) => FrameOutcome::Processed(result),
                                Err(e) => FrameOutcome::Failed(e),
                            }
                        }));
                    }
                    Ok(None) => {
                        info!("Frame source {} exhausted", source.name());
                        break;
                    }
                    Err(e) => {
                        stats.capture_errors += 1;
                        error!("Error capturing frame from {}: {:#}", source.name(), e);
                    }
                }
            }
        }
    }

    // Let submissions already sent reach the server before the session is stopped.
    // Pending deliveries keep running detached until the caller reads them.
    while let Some(joined) = in_flight.next().await {
        if let Some(outcome) = settle(joined) {
            drop(deliver(&outcome_tx, outcome));
        }
    }

    info!("Capture task stopped ({} frames)", stats.frames_captured);

    stats
}

fn settle(joined: Result<FrameOutcome, JoinError>) -> Option<FrameOutcome> {
    match joined {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            error!("Frame task panicked: {}", e);
            None
        }
    }
}

/// Hand an outcome to the caller, waiting for room in the channel
fn deliver(outcome_tx: &mpsc::Sender<FrameOutcome>, outcome: FrameOutcome) -> JoinHandle<()> {
    let outcome_tx = outcome_tx.clone();
    tokio::spawn(async move {
        if outcome_tx.send(outcome).await.is_err() {
            debug!("Frame outcome discarded, receiver dropped");
        }
    })
}
