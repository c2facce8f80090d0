//! Error taxonomy for the session client
//!
//! Every failure surfaced by [`crate::SessionClient`] falls into one of three
//! classes (see [`ErrorKind`]):
//! - Connectivity: the reachability probe failed before anything was mutated
//! - Protocol: the server was contacted but the exchange did not succeed
//! - Logic: the caller violated a precondition, no request was sent

use std::fmt;

/// Coarse classification of a [`SessionError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Connectivity,
    Protocol,
    Logic,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Connectivity => write!(f, "connectivity"),
            ErrorKind::Protocol => write!(f, "protocol"),
            ErrorKind::Logic => write!(f, "logic"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The server could not be reached by the reachability probe.
    #[error("could not connect to the server at {url}: {reason}")]
    Connectivity { url: String, reason: String },

    /// The request failed in transit (`status` is `None`) or the server
    /// answered with a non-success status. `body` is the server text verbatim.
    #[error("{}", protocol_message(.status, .body))]
    Protocol { status: Option<u16>, body: String },

    /// A success response whose body could not be understood.
    #[error("invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },

    /// A precondition of the operation does not hold.
    #[error("{0}")]
    Logic(String),

    /// The HTTP client could not be built from the configuration.
    #[error("client configuration error: {0}")]
    Config(String),
}

fn protocol_message(status: &Option<u16>, body: &str) -> String {
    match *status {
        Some(code) if body.is_empty() => format!("server responded with status {code}"),
        Some(code) => format!("server responded with status {code}: {body}"),
        None => format!("request failed: {body}"),
    }
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Connectivity { .. } => ErrorKind::Connectivity,
            SessionError::Protocol { .. } | SessionError::InvalidResponse { .. } => {
                ErrorKind::Protocol
            }
            SessionError::Logic(_) | SessionError::Config(_) => ErrorKind::Logic,
        }
    }

    /// Only a failed reachability probe is safe to retry blindly.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionError::Connectivity { .. })
    }

    /// HTTP status returned by the server, if the failure carried one
    pub fn status(&self) -> Option<u16> {
        match self {
            SessionError::Protocol { status, .. } => *status,
            _ => None,
        }
    }

    pub(crate) fn transport(err: reqwest::Error) -> Self {
        SessionError::Protocol {
            status: None,
            body: err.to_string(),
        }
    }

    /// A status-less protocol failure means the request never got an answer.
    pub(crate) fn is_transport(&self) -> bool {
        matches!(self, SessionError::Protocol { status: None, .. })
    }
}
