use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

use crate::capture::CaptureConfig;

/// Environment variable prefix, e.g. `SIGN_SESSION__SERVER__TARGET=android`
pub const ENV_PREFIX: &str = "SIGN_SESSION";

/// Port served by the session-aware recognition server
pub const SESSIONS_PORT: u16 = 5001;

/// Port served by the older frame-only recognition server
pub const LEGACY_PORT: u16 = 5000;

/// Host alias an Android emulator uses to reach the machine it runs on
pub const ANDROID_EMULATOR_HOST: &str = "10.0.2.2";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub capture: CaptureConfig,
}

/// Where the client runs, which decides how the server's host is addressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentTarget {
    /// iOS simulator shares the host's loopback
    Ios,
    /// Android emulator reaches the host through a fixed alias
    Android,
    Desktop,
}

impl DeploymentTarget {
    /// Target matching the platform this binary was compiled for
    pub fn current() -> Self {
        if cfg!(target_os = "ios") {
            DeploymentTarget::Ios
        } else if cfg!(target_os = "android") {
            DeploymentTarget::Android
        } else {
            DeploymentTarget::Desktop
        }
    }

    pub fn host(&self) -> &'static str {
        match self {
            DeploymentTarget::Android => ANDROID_EMULATOR_HOST,
            DeploymentTarget::Ios | DeploymentTarget::Desktop => "localhost",
        }
    }
}

impl Default for DeploymentTarget {
    fn default() -> Self {
        Self::current()
    }
}

/// Protocol version spoken by the recognition server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientProfile {
    /// Start/process/stop/list with server-issued session IDs
    #[default]
    Sessions,
    /// Frame-only server: no sessions, frames sent as data URLs
    Legacy,
}

impl ClientProfile {
    pub fn default_port(&self) -> u16 {
        match self {
            ClientProfile::Sessions => SESSIONS_PORT,
            ClientProfile::Legacy => LEGACY_PORT,
        }
    }

    pub fn supports_sessions(&self) -> bool {
        matches!(self, ClientProfile::Sessions)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub target: DeploymentTarget,
    pub profile: ClientProfile,

    /// Overrides the profile's default port
    pub port: Option<u16>,

    /// Full base URL; when set, `target` and `port` are ignored
    pub base_url: Option<String>,

    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,

    /// Extra attempts for a stop request that got no answer at all
    pub stop_retries: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            target: DeploymentTarget::current(),
            profile: ClientProfile::Sessions,
            port: None,
            base_url: None,
            request_timeout_secs: 10,
            connect_timeout_secs: 5,
            stop_retries: 1,
        }
    }
}

impl ServerConfig {
    /// Config pointing at an explicit base URL, everything else default
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            ..Self::default()
        }
    }

    /// Resolve the server base URL (no trailing slash)
    pub fn base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => {
                let port = self.port.unwrap_or_else(|| self.profile.default_port());
                format!("http://{}:{}", self.target.host(), port)
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Config {
    /// Load from an optional file layered under `SIGN_SESSION__*` environment variables.
    ///
    /// `path` is passed to `config::File::with_name`, so the extension may be omitted.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
