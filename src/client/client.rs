use reqwest::header::CONTENT_TYPE;
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

use super::messages::{
    FrameResult, ProcessFrameRequest, RecordingList, StartRecordingRequest,
    StartRecordingResponse, StopRecordingRequest, StopRecordingResponse,
};
use crate::capture::EncodedFrame;
use crate::config::{ClientProfile, ServerConfig};
use crate::error::SessionError;
use crate::session::{RecordingSession, RecordingSummary, SessionMetadata};

pub const RECORDINGS_PATH: &str = "/recordings";
pub const START_RECORDING_PATH: &str = "/start-recording";
pub const PROCESS_FRAME_PATH: &str = "/process-frame";
pub const STOP_RECORDING_PATH: &str = "/stop-recording";

/// Client for the recognition server's recording-session API
///
/// Holds at most one active `RecordingSession`. Share one instance per process
/// (behind an `Arc`) between whoever starts/stops recording and the capture loop.
pub struct SessionClient {
    http: reqwest::Client,
    base_url: String,
    profile: ClientProfile,
    stop_retries: u32,

    /// The active session, if any. Never held across an await.
    current: Mutex<Option<RecordingSession>>,

    /// Serializes start/stop so two lifecycle changes never interleave
    lifecycle: tokio::sync::Mutex<()>,
}

impl SessionClient {
    pub fn new(config: &ServerConfig) -> Result<Self, SessionError> {
        let base_url = config.base_url();
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| SessionError::Config(e.to_string()))?;

        info!("Using recognition server at {} ({:?} profile)", base_url, config.profile);

        Ok(Self {
            http,
            base_url,
            profile: config.profile,
            stop_retries: config.stop_retries,
            current: Mutex::new(None),
            lifecycle: tokio::sync::Mutex::new(()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn profile(&self) -> ClientProfile {
        self.profile
    }

    /// Snapshot of the active session, if any
    pub fn current_session(&self) -> Option<RecordingSession> {
        self.slot().clone()
    }

    pub fn has_active_session(&self) -> bool {
        self.slot().is_some()
    }

    /// Start a new recording session
    ///
    /// Probes the server first; nothing is sent or stored if it cannot be reached.
    /// Fails with a logic error if a session is already active.
    pub async fn start_recording(
        &self,
        metadata: SessionMetadata,
    ) -> Result<RecordingSession, SessionError> {
        self.require_sessions("start a recording")?;

        let _lifecycle = self.lifecycle.lock().await;

        if let Some(active) = self.slot().as_ref() {
            return Err(SessionError::Logic(format!(
                "recording session {} is already active",
                active.session_id()
            )));
        }

        info!("Starting recording with {} metadata entries", metadata.len());

        if let Err(e) = self.check_connection().await {
            error!("Server connection test failed: {}", e);
            return Err(e);
        }

        let response: StartRecordingResponse = self
            .post_json(START_RECORDING_PATH, &StartRecordingRequest { metadata: &metadata })
            .await
            .map_err(|e| {
                error!("Failed to start recording session: {}", e);
                e
            })?;

        let session_id = response
            .session_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SessionError::InvalidResponse {
                endpoint: START_RECORDING_PATH.to_string(),
                reason: "missing session_id".to_string(),
            })?;

        let session = RecordingSession::new(session_id, metadata);
        *self.slot() = Some(session.clone());

        info!("Recording started: {}", session.session_id());

        Ok(session)
    }

    /// Send one frame to the server
    ///
    /// Works with or without an active session. When the reply acknowledges a
    /// frame of the active session, its frame count is advanced to the server's
    /// position; late or duplicate acknowledgements never move it backward.
    pub async fn process_frame(&self, frame: &EncodedFrame) -> Result<FrameResult, SessionError> {
        let result: FrameResult = match self.profile {
            ClientProfile::Sessions => {
                let session_id = self.slot().as_ref().map(|s| s.session_id().to_string());
                let request = ProcessFrameRequest {
                    frame: frame.as_base64(),
                    session_id: session_id.as_deref(),
                };
                self.post_json(PROCESS_FRAME_PATH, &request).await
            }
            ClientProfile::Legacy => {
                let data_url = frame.to_data_url();
                let request = ProcessFrameRequest {
                    frame: &data_url,
                    session_id: None,
                };
                self.post_json(PROCESS_FRAME_PATH, &request).await
            }
        }
        .map_err(|e| {
            error!("Error processing frame: {}", e);
            e
        })?;

        if let (Some(echoed), Some(frame_number)) =
            (result.session_id.as_deref(), result.frame_number)
        {
            let mut slot = self.slot();
            match slot.as_mut() {
                Some(session) if session.session_id() == echoed => {
                    if session.acknowledge(frame_number) {
                        debug!("Session {} at frame {}", echoed, session.frame_count());
                    } else {
                        debug!("Ignoring stale acknowledgement for frame {}", frame_number);
                    }
                }
                _ => debug!("Acknowledgement for inactive session {}", echoed),
            }
        }

        Ok(result)
    }

    /// Stop the active session and return its summary
    ///
    /// A stop request that gets no answer is retried `stop_retries` times. Once the
    /// outcome is final the session is ended locally even if the server refused,
    /// so a new recording can always be started afterwards.
    pub async fn stop_recording(&self) -> Result<RecordingSummary, SessionError> {
        self.require_sessions("stop a recording")?;

        let _lifecycle = self.lifecycle.lock().await;

        let session_id = match self.slot().as_ref() {
            Some(session) => session.session_id().to_string(),
            None => return Err(SessionError::Logic("no active recording session".to_string())),
        };

        info!("Stopping recording session: {}", session_id);

        let request = StopRecordingRequest { session_id: &session_id };
        let mut attempt = 0;
        let outcome = loop {
            match self
                .post_json::<_, StopRecordingResponse>(STOP_RECORDING_PATH, &request)
                .await
            {
                Err(e) if e.is_transport() && attempt < self.stop_retries => {
                    attempt += 1;
                    warn!(
                        "Stop request got no answer ({}), retry {}/{}",
                        e, attempt, self.stop_retries
                    );
                }
                other => break other,
            }
        };

        let Some(session) = self.slot().take() else {
            return Err(SessionError::Logic(format!(
                "recording session {session_id} was cleared while stopping"
            )));
        };

        match outcome {
            Ok(response) => {
                let summary = RecordingSummary::new(response.frame_count, response.extra, session);
                info!(
                    "Recording stopped: {} ({} frames)",
                    session_id,
                    summary.total_frames()
                );
                Ok(summary)
            }
            Err(e) => {
                error!(
                    "Failed to stop recording session {}: {} (ended locally after {} frames)",
                    session_id,
                    e,
                    session.frame_count()
                );
                Err(e)
            }
        }
    }

    /// List the sessions the server has recorded
    pub async fn list_recordings(&self) -> Result<RecordingList, SessionError> {
        self.require_sessions("list recordings")?;

        self.get_json(RECORDINGS_PATH).await.map_err(|e| {
            error!("Error fetching recordings: {}", e);
            e
        })
    }

    /// Lightweight GET used as a reachability probe before starting
    async fn check_connection(&self) -> Result<(), SessionError> {
        let response = self
            .http
            .get(self.url(RECORDINGS_PATH))
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| SessionError::Connectivity {
                url: self.base_url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SessionError::Connectivity {
                url: self.base_url.clone(),
                reason: format!("server test failed with status {}", status.as_u16()),
            });
        }

        debug!("Server connection test successful");
        Ok(())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, SessionError> {
        let response = self
            .http
            .get(self.url(path))
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(SessionError::transport)?;

        read_json(path, response).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, SessionError> {
        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(SessionError::transport)?;

        read_json(path, response).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn require_sessions(&self, operation: &str) -> Result<(), SessionError> {
        if self.profile.supports_sessions() {
            Ok(())
        } else {
            Err(SessionError::Logic(format!(
                "cannot {operation}: the legacy server profile has no recording sessions"
            )))
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<RecordingSession>> {
        // Every critical section is a plain assignment, so a poisoned lock still holds a valid slot
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn read_json<T: DeserializeOwned>(path: &str, response: Response) -> Result<T, SessionError> {
    let status = response.status();
    let text = response.text().await.map_err(SessionError::transport)?;

    if !status.is_success() {
        return Err(SessionError::Protocol {
            status: Some(status.as_u16()),
            body: text,
        });
    }

    serde_json::from_str(&text).map_err(|e| SessionError::InvalidResponse {
        endpoint: path.to_string(),
        reason: e.to_string(),
    })
}
