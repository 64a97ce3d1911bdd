//! JSON-lines wire format shared by the daemon and its clients
//!
//! Every request, response and event is one JSON object on its own line.

use std::fmt;

use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::application::SessionError;
use crate::domain::recording::{RecordingData, StatusUpdate, STATUS_UPDATE_EVENT};

/// Boundary error codes that do not come from the session
pub mod codes {
    pub const UNKNOWN_METHOD: &str = "UNKNOWN_METHOD";
    pub const DAEMON_UNAVAILABLE: &str = "DAEMON_UNAVAILABLE";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Methods understood by the daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Method {
    CanDeviceVoiceRecord,
    StartRecording,
    PauseRecording,
    ResumeRecording,
    StopRecording,
    GetCurrentStatus,
    IsRecording,
    RecordingTime,
    AddListener,
}

/// One request line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub method: Method,
    /// Only meaningful for `addListener`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
}

impl Request {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            event_name: None,
        }
    }

    /// `addListener` for the progress event
    pub fn listen() -> Self {
        Self {
            method: Method::AddListener,
            event_name: Some(STATUS_UPDATE_EVENT.to_string()),
        }
    }

    /// Parse a request line, answering malformed input with an error response
    pub fn parse(line: &str) -> Result<Self, Response> {
        let request: Self = serde_json::from_str(line)
            .map_err(|e| Response::error(codes::UNKNOWN_METHOD, e.to_string()))?;

        match request.event_name.as_deref() {
            Some(name) if request.method == Method::AddListener && name != STATUS_UPDATE_EVENT => {
                Err(Response::error(
                    codes::UNKNOWN_METHOD,
                    format!("Unknown event '{}'", name),
                ))
            }
            _ => Ok(request),
        }
    }
}

/// Error payload of a failed response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

/// One response line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    pub fn ok(value: impl Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => Self {
                ok: true,
                value: Some(value),
                error: None,
            },
            Err(e) => Self::error(codes::INTERNAL_ERROR, e.to_string()),
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            value: None,
            error: Some(ErrorBody {
                code: code.into(),
                message: message.into(),
            }),
        }
    }

    /// Decode the success payload, or surface the error body
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T, ErrorBody> {
        if let Some(error) = self.error.filter(|_| !self.ok) {
            return Err(error);
        }

        serde_json::from_value(self.value.unwrap_or(Value::Null)).map_err(|e| ErrorBody {
            code: codes::INTERNAL_ERROR.to_string(),
            message: format!("Malformed response: {}", e),
        })
    }
}

impl From<SessionError> for Response {
    fn from(err: SessionError) -> Self {
        Self::error(err.code(), err.to_string())
    }
}

impl<T: Serialize> From<Result<T, SessionError>> for Response {
    fn from(result: Result<T, SessionError>) -> Self {
        match result {
            Ok(value) => Self::ok(value),
            Err(e) => e.into(),
        }
    }
}

/// Boolean answer for capability and control methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericResponse {
    pub value: bool,
}

impl GenericResponse {
    pub const fn new(value: bool) -> Self {
        Self { value }
    }
}

/// Whole seconds recorded so far
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingTimeResponse {
    pub value: u64,
}

impl RecordingTimeResponse {
    pub const fn new(value: u64) -> Self {
        Self { value }
    }
}

/// Finished recording as sent across the boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingPayload {
    pub record_data_base64: String,
    pub ms_duration: i64,
    pub mime_type: String,
}

impl RecordingPayload {
    /// Raw audio bytes
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(&self.record_data_base64)
    }
}

impl From<&RecordingData> for RecordingPayload {
    fn from(data: &RecordingData) -> Self {
        Self {
            record_data_base64: data.to_base64(),
            ms_duration: data.ms_duration(),
            mime_type: data.mime_type().as_str().to_string(),
        }
    }
}

/// Pushed progress event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub event: String,
    pub data: StatusUpdate,
}

impl Event {
    pub fn recording_update(update: StatusUpdate) -> Self {
        Self {
            event: STATUS_UPDATE_EVENT.to_string(),
            data: update,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::recording::{AudioMimeType, CurrentStatus, RecordingStatus};
    use serde_json::json;

    #[test]
    fn parses_method_names() {
        let request = Request::parse(r#"{"method":"stopRecording"}"#).unwrap();
        assert_eq!(request, Request::new(Method::StopRecording));

        let request = Request::parse(r#"{"method":"canDeviceVoiceRecord"}"#).unwrap();
        assert_eq!(request.method, Method::CanDeviceVoiceRecord);
    }

    #[test]
    fn query_methods_use_wire_names() {
        let request = Request::parse(r#"{"method":"isRecording"}"#).unwrap();
        assert_eq!(request.method, Method::IsRecording);
        let request = Request::parse(r#"{"method":"recordingTime"}"#).unwrap();
        assert_eq!(request.method, Method::RecordingTime);

        let json = serde_json::to_value(Response::ok(RecordingTimeResponse::new(7))).unwrap();
        assert_eq!(json, json!({"ok": true, "value": {"value": 7}}));
    }

    #[test]
    fn unknown_method_is_rejected() {
        let response = Request::parse(r#"{"method":"rewind"}"#).unwrap_err();
        assert!(!response.ok);
        assert_eq!(response.error.unwrap().code, codes::UNKNOWN_METHOD);

        assert!(Request::parse("not json").is_err());
    }

    #[test]
    fn listener_must_name_progress_event() {
        assert!(Request::parse(r#"{"method":"addListener","eventName":"recordingUpdate"}"#).is_ok());
        assert!(Request::parse(r#"{"method":"addListener"}"#).is_ok());

        let response =
            Request::parse(r#"{"method":"addListener","eventName":"volumeChanged"}"#).unwrap_err();
        assert_eq!(response.error.unwrap().code, codes::UNKNOWN_METHOD);
    }

    #[test]
    fn success_response_shape() {
        let response = Response::ok(GenericResponse::new(true));
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"ok": true, "value": {"value": true}})
        );
    }

    #[test]
    fn session_error_response_shape() {
        let response = Response::from(SessionError::AlreadyRecording);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["error"]["code"], "ALREADY_RECORDING");
        assert!(json.get("value").is_none());
    }

    #[test]
    fn status_payload_uses_wire_names() {
        let status = CurrentStatus {
            status: RecordingStatus::Paused,
            elapsed_seconds: 4,
        };
        let json = serde_json::to_value(Response::ok(status)).unwrap();
        assert_eq!(json["value"], json!({"status": "PAUSED", "elapsedSeconds": 4}));
    }

    #[test]
    fn into_result_decodes_value_or_error() {
        let ok: GenericResponse = Response::ok(GenericResponse::new(false))
            .into_result()
            .unwrap();
        assert!(!ok.value);

        let err = Response::from(SessionError::NotRecording)
            .into_result::<GenericResponse>()
            .unwrap_err();
        assert_eq!(err.code, "RECORDING_HAS_NOT_STARTED");
    }

    #[test]
    fn recording_payload_carries_base64_audio() {
        let data = RecordingData::new(vec![1, 2, 3, 4], 1500, AudioMimeType::Flac);
        let payload = RecordingPayload::from(&data);

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["msDuration"], 1500);
        assert_eq!(json["mimeType"], "audio/flac");
        assert_eq!(payload.decode().unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn event_shape() {
        let json = serde_json::to_value(Event::recording_update(StatusUpdate::new(true, 2))).unwrap();
        assert_eq!(
            json,
            json!({"event": "recordingUpdate", "data": {"isRecording": true, "elapsedSeconds": 2}})
        );
    }
}
