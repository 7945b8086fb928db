//! Scope optimization: decides how much of a log entry leaves the process.
//!
//! Full scope forwards the entry as produced. Minimal scope keeps the fields
//! monitoring needs (identity, request context, error summary) plus a small
//! set of correlation metadata. In both scopes error stack traces are removed
//! before anything is sent over HTTP.

mod metadata;
mod sanitize;

pub use metadata::{ESSENTIAL_METADATA_KEYS, filter_essential_metadata};
pub use sanitize::{is_present, sanitize_error, strip_stack, strip_stacks};

use crate::config::{Scope, TransportConfig};
use crate::domain::{LogEntry, LogError, LogLevel, OptimizationError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// An entry after scope optimization, as it is batched and serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<LogError>,

    /// Essential metadata, only populated in minimal scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,

    /// Remaining producer fields, only populated in full scope.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeOptimizer {
    minimal: bool,
    include_metadata: bool,
}

impl ScopeOptimizer {
    pub fn new(minimal: bool, include_metadata: bool) -> Self {
        Self {
            minimal,
            include_metadata,
        }
    }

    pub fn from_config(config: &TransportConfig) -> Self {
        Self::new(config.minimal(), config.include_metadata())
    }

    pub fn scope(&self) -> Scope {
        if self.minimal {
            Scope::Minimal
        } else {
            Scope::Full
        }
    }

    pub fn optimize(&self, entry: LogEntry) -> OutboundEntry {
        if self.minimal {
            self.minimal_entry(entry)
        } else {
            full_entry(entry)
        }
    }

    /// Interprets a raw JSON value as a log entry, then optimizes it.
    pub fn optimize_value(&self, value: Value) -> Result<OutboundEntry, OptimizationError> {
        let kind = match &value {
            Value::Object(_) => None,
            Value::Null => Some("null"),
            Value::Bool(_) => Some("a boolean"),
            Value::Number(_) => Some("a number"),
            Value::String(_) => Some("a string"),
            Value::Array(_) => Some("an array"),
        };
        if let Some(kind) = kind {
            return Err(OptimizationError::NotAnObject(kind));
        }

        let entry: LogEntry = serde_json::from_value(value)?;
        Ok(self.optimize(entry))
    }

    fn minimal_entry(&self, entry: LogEntry) -> OutboundEntry {
        let meta = if self.include_metadata {
            let mut meta = filter_essential_metadata(&entry.extra);
            strip_stacks(&mut meta);
            Some(meta).filter(|meta| !meta.is_empty())
        } else {
            None
        };
        let present = |value: Option<Value>| value.filter(is_present);
        let non_empty = |text: Option<String>| text.filter(|text| !text.is_empty());

        OutboundEntry {
            timestamp: entry.timestamp,
            level: entry.level,
            message: entry.message,
            component: non_empty(entry.component),
            request_id: present(entry.request_id),
            user_id: present(entry.user_id),
            method: non_empty(entry.method),
            url: non_empty(entry.url),
            status_code: present(entry.status_code),
            duration_ms: present(entry.duration_ms),
            error: entry.error.map(sanitize_error),
            meta,
            extra: Map::new(),
        }
    }
}

fn full_entry(mut entry: LogEntry) -> OutboundEntry {
    strip_stacks(&mut entry.extra);
    OutboundEntry {
        timestamp: entry.timestamp,
        level: entry.level,
        message: entry.message,
        component: entry.component,
        request_id: entry.request_id,
        user_id: entry.user_id,
        method: entry.method,
        url: entry.url,
        status_code: entry.status_code,
        duration_ms: entry.duration_ms,
        error: entry.error.map(strip_stack),
        meta: None,
        extra: entry.extra,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorDetails;
    use serde_json::json;

    fn sample_entry() -> LogEntry {
        LogEntry::new(LogLevel::Error, "payment failed")
            .with_component("billing")
            .with_request_id("req-42")
            .with_user_id("user-7")
            .with_http("POST", "/api/pay", 502, 812.5)
            .with_error(
                ErrorDetails::new("upstream unavailable")
                    .with_name("GatewayError")
                    .with_code("E_UPSTREAM")
                    .with_stack("GatewayError: upstream unavailable\n    at pay (pay.js:12)")
                    .into(),
            )
            .with_field("traceId", "t1")
            .with_field("foo", "bar")
            .with_field("orderId", "o1")
    }

    #[test]
    fn test_full_scope_keeps_everything_but_stack() {
        let optimizer = ScopeOptimizer::new(false, true);
        let out = optimizer.optimize(sample_entry());

        assert_eq!(out.extra.get("foo"), Some(&json!("bar")));
        assert_eq!(out.extra.get("orderId"), Some(&json!("o1")));
        assert!(out.meta.is_none());

        let value = serde_json::to_value(&out).unwrap();
        assert_eq!(value["error"]["name"], json!("GatewayError"));
        assert!(value["error"].get("stack").is_none());
        assert_eq!(value["statusCode"], json!(502));
    }

    #[test]
    fn test_minimal_scope_keeps_essentials_only() {
        let optimizer = ScopeOptimizer::new(true, true);
        let out = optimizer.optimize(sample_entry());
        let value = serde_json::to_value(&out).unwrap();

        assert_eq!(value["message"], json!("payment failed"));
        assert_eq!(value["component"], json!("billing"));
        assert_eq!(value["requestId"], json!("req-42"));
        assert_eq!(value["method"], json!("POST"));
        assert_eq!(value["durationMs"], json!(812.5));
        assert_eq!(value["meta"], json!({"traceId": "t1", "orderId": "o1"}));
        assert!(value.get("foo").is_none());
        assert!(value["error"].get("stack").is_none());
        assert_eq!(value["error"]["code"], json!("E_UPSTREAM"));
    }

    #[test]
    fn test_minimal_scope_without_metadata() {
        let optimizer = ScopeOptimizer::new(true, false);
        let out = optimizer.optimize(sample_entry());
        assert!(out.meta.is_none());
        assert!(out.extra.is_empty());
    }

    #[test]
    fn test_minimal_scope_omits_empty_meta() {
        let optimizer = ScopeOptimizer::new(true, true);
        let entry = LogEntry::new(LogLevel::Info, "ping").with_field("foo", "bar");
        let value = serde_json::to_value(optimizer.optimize(entry)).unwrap();
        assert!(value.get("meta").is_none());
        assert!(value.get("foo").is_none());
    }

    #[test]
    fn test_optimize_value_rejects_non_entries() {
        let optimizer = ScopeOptimizer::new(false, true);
        assert!(matches!(
            optimizer.optimize_value(json!([1, 2])),
            Err(OptimizationError::NotAnObject("an array"))
        ));
        assert!(matches!(
            optimizer.optimize_value(json!({"message": "no level"})),
            Err(OptimizationError::InvalidJson(_))
        ));

        let ok = optimizer.optimize_value(json!({
            "timestamp": "2024-05-01T10:00:00Z",
            "level": "info",
            "message": "ok",
            "region": "eu"
        }));
        assert_eq!(ok.unwrap().extra.get("region"), Some(&json!("eu")));
    }

    #[test]
    fn test_raw_entries_with_loose_types_survive_both_scopes() {
        let raw = json!({
            "timestamp": "2024-05-01T10:00:00Z",
            "level": "error",
            "message": "checkout failed",
            "userId": 42,
            "statusCode": "200",
            "durationMs": 1532,
            "error": {"message": "declined", "name": "CardError", "statusCode": "500"}
        });

        for minimal in [false, true] {
            let optimizer = ScopeOptimizer::new(minimal, true);
            let out = optimizer.optimize_value(raw.clone()).unwrap();
            let value = serde_json::to_value(&out).unwrap();

            assert_eq!(value["userId"], json!(42));
            assert_eq!(value["statusCode"], json!("200"));
            assert_eq!(value["durationMs"].to_string(), "1532");
            assert_eq!(value["error"]["statusCode"], json!("500"));
        }
    }

    #[test]
    fn test_stack_fields_never_leave_in_either_scope() {
        let raw = json!({
            "timestamp": "2024-05-01T10:00:00Z",
            "level": "error",
            "message": "boom",
            "stack": "Error: boom\n    at f (a.js:1)",
            "cause": {"message": "inner", "stack": "at g (b.js:2)"},
            "error": {
                "message": "boom",
                "stack": "at f (a.js:1)",
                "cause": {"message": "inner", "stack": "at g (b.js:2)"}
            },
            "service": {"message": "checkout", "stack": "at h (c.js:3)"}
        });

        for minimal in [false, true] {
            let optimizer = ScopeOptimizer::new(minimal, true);
            let out = optimizer.optimize_value(raw.clone()).unwrap();
            let text = serde_json::to_string(&out).unwrap();
            assert!(!text.contains("stack"), "minimal={minimal}: {text}");
        }

        let full = ScopeOptimizer::new(false, true).optimize_value(raw).unwrap();
        assert_eq!(full.extra["cause"], json!({"message": "inner"}));
    }

    #[test]
    fn test_minimal_scope_skips_empty_context() {
        let optimizer = ScopeOptimizer::new(true, false);
        let mut entry = LogEntry::new(LogLevel::Info, "ping")
            .with_component("")
            .with_request_id("")
            .with_http("", "", 0, 0.0);
        entry.user_id = Some(Value::Null);

        let value = serde_json::to_value(optimizer.optimize(entry)).unwrap();
        assert_eq!(value.as_object().unwrap().len(), 3);
        assert_eq!(value["message"], json!("ping"));
    }
}
