use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A structured log entry as produced by the application logger.
///
/// Well-known fields are typed; everything else the producer attached lives in
/// `extra` and is flattened back into the object on the wire. Identifiers and
/// HTTP numbers are kept as raw JSON so producers may send them as strings or
/// numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Value>,

    // HTTP context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<LogError>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Error attached to a log entry: either plain text or an error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogError {
    Message(String),
    Details(ErrorDetails),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            component: None,
            request_id: None,
            user_id: None,
            method: None,
            url: None,
            status_code: None,
            duration_ms: None,
            error: None,
            extra: Map::new(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(Value::String(request_id.into()));
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(Value::String(user_id.into()));
        self
    }

    /// Attaches the HTTP request context of the entry.
    pub fn with_http(
        mut self,
        method: impl Into<String>,
        url: impl Into<String>,
        status_code: u16,
        duration_ms: f64,
    ) -> Self {
        self.method = Some(method.into());
        self.url = Some(url.into());
        self.status_code = Some(Value::from(status_code));
        self.duration_ms = Some(Value::from(duration_ms));
        self
    }

    pub fn with_error(mut self, error: LogError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

impl ErrorDetails {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<Value>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(Value::from(status_code));
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(Value::String(stack.into()));
        self
    }
}

impl From<&str> for LogError {
    fn from(message: &str) -> Self {
        LogError::Message(message.to_string())
    }
}

impl From<ErrorDetails> for LogError {
    fn from(details: ErrorDetails) -> Self {
        LogError::Details(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_deserializes_known_and_extra_fields() {
        let raw = json!({
            "timestamp": "2024-05-01T10:00:00Z",
            "level": "warn",
            "message": "slow request",
            "requestId": "req-1",
            "statusCode": 200,
            "durationMs": 1532,
            "traceId": "abc",
            "region": "eu-west-1"
        });

        let entry: LogEntry = serde_json::from_value(raw).unwrap();
        assert_eq!(entry.level, LogLevel::Warn);
        assert_eq!(entry.request_id, Some(json!("req-1")));
        assert_eq!(entry.status_code, Some(json!(200)));
        assert_eq!(entry.duration_ms, Some(json!(1532)));
        assert_eq!(entry.extra.get("traceId"), Some(&json!("abc")));
        assert_eq!(entry.extra.get("region"), Some(&json!("eu-west-1")));
        assert!(!entry.extra.contains_key("requestId"));
    }

    #[test]
    fn test_error_variants() {
        let text: LogError = serde_json::from_value(json!("boom")).unwrap();
        assert_eq!(text, LogError::Message("boom".to_string()));

        let details: LogError = serde_json::from_value(json!({
            "message": "db down",
            "name": "ConnectionError",
            "code": "ECONNREFUSED",
            "stack": "at connect (db.js:10)"
        }))
        .unwrap();
        match details {
            LogError::Details(d) => {
                assert_eq!(d.message, "db down");
                assert_eq!(d.name.as_deref(), Some("ConnectionError"));
                assert_eq!(d.code, Some(json!("ECONNREFUSED")));
                assert!(d.stack.is_some());
            }
            LogError::Message(_) => panic!("expected structured error"),
        }
    }

    #[test]
    fn test_serialization_skips_absent_fields() {
        let entry = LogEntry::new(LogLevel::Info, "hello").with_component("api");
        let value = serde_json::to_value(&entry).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.get("component"), Some(&json!("api")));
        assert!(!object.contains_key("requestId"));
        assert!(!object.contains_key("error"));
    }

    #[test]
    fn test_loose_identifier_and_status_types_are_accepted() {
        let raw = json!({
            "timestamp": "2024-05-01T10:00:00Z",
            "level": "error",
            "message": "upstream failed",
            "userId": 42,
            "statusCode": "502",
            "durationMs": 1532,
            "error": {"message": "bad gateway", "statusCode": "500", "code": 7}
        });

        let entry: LogEntry = serde_json::from_value(raw).unwrap();
        assert_eq!(entry.user_id, Some(json!(42)));
        assert_eq!(entry.status_code, Some(json!("502")));

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["durationMs"].to_string(), "1532");
        assert_eq!(value["error"]["statusCode"], json!("500"));
    }
}
