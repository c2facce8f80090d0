use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Which camera the frames come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraFacing {
    Front,
    Back,
}

impl fmt::Display for CameraFacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraFacing::Front => write!(f, "front"),
            CameraFacing::Back => write!(f, "back"),
        }
    }
}

impl std::str::FromStr for CameraFacing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "front" => Ok(CameraFacing::Front),
            "back" => Ok(CameraFacing::Back),
            other => Err(format!("unknown camera facing '{other}' (expected 'front' or 'back')")),
        }
    }
}

/// Open key/value metadata sent with `/start-recording`
///
/// No key is required. The app sets `deviceType`, `cameraFacing` and `timestamp`;
/// anything else is passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionMetadata(Map<String, Value>);

impl SessionMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device_type(self, device_type: impl Into<String>) -> Self {
        self.with("deviceType", Value::String(device_type.into()))
    }

    pub fn with_camera_facing(self, facing: CameraFacing) -> Self {
        self.with("cameraFacing", Value::String(facing.to_string()))
    }

    /// RFC 3339 timestamp with millisecond precision
    pub fn with_timestamp(self, at: DateTime<Utc>) -> Self {
        self.with(
            "timestamp",
            Value::String(at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        )
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for SessionMetadata {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_builder_sets_app_keys() {
        let at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        let metadata = SessionMetadata::new()
            .with_device_type("ios")
            .with_camera_facing(CameraFacing::Front)
            .with_timestamp(at);

        assert_eq!(metadata.len(), 3);
        assert_eq!(metadata.get("deviceType"), Some(&Value::from("ios")));
        assert_eq!(metadata.get("cameraFacing"), Some(&Value::from("front")));
        assert_eq!(
            metadata.get("timestamp"),
            Some(&Value::from("2025-03-14T09:26:53.000Z"))
        );
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let metadata = SessionMetadata::new().with("fps", 2);
        let json = serde_json::to_string(&metadata).unwrap();
        assert_eq!(json, r#"{"fps":2}"#);
    }

    #[test]
    fn test_camera_facing_parse() {
        assert_eq!("back".parse::<CameraFacing>(), Ok(CameraFacing::Back));
        assert!("side".parse::<CameraFacing>().is_err());
    }
}
