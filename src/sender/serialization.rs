//! Wire formats for the supported log intake services.
//!
//! The destination URL decides the format; nothing is cached between calls.

use crate::config::Scope;
use crate::domain::LogLevel;
use crate::scope::OutboundEntry;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::io::Write;
use thiserror::Error;
use url::Url;

const ESTIMATED_ENTRY_SIZE: usize = 256; // bytes per entry
const ENVELOPE_OVERHEAD: usize = 64; // bytes
const ELASTICSEARCH_INDEX_ACTION: &[u8] = br#"{"index":{}}"#;

#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("JSON serialization failed: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("IO error during serialization: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Batch is empty")]
    EmptyBatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceType {
    Generic,
    Datadog,
    Elasticsearch,
    Splunk,
}

impl ServiceType {
    /// Picks the wire format from the destination host and path.
    pub fn detect(url: &Url) -> Self {
        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();

        if host.contains("datadog") {
            ServiceType::Datadog
        } else if host.contains("elastic") || url.path().contains("_bulk") {
            ServiceType::Elasticsearch
        } else if host.contains("splunk") {
            ServiceType::Splunk
        } else {
            ServiceType::Generic
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceType::Generic => "generic",
            ServiceType::Datadog => "datadog",
            ServiceType::Elasticsearch => "elasticsearch",
            ServiceType::Splunk => "splunk",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A serialized batch ready to be sent.
#[derive(Debug, Clone)]
pub struct Payload {
    body: Bytes,
    service_type: ServiceType,
    entries: usize,
}

impl Payload {
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn service_type(&self) -> ServiceType {
        self.service_type
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    pub fn as_str(&self) -> &str {
        // Always built from serde_json output.
        std::str::from_utf8(&self.body).unwrap_or_default()
    }
}

#[derive(Serialize)]
struct GenericEnvelope<'a> {
    logs: &'a [OutboundEntry],
    scope: Scope,
    count: usize,
}

#[derive(Serialize)]
struct DatadogEnvelope<'a> {
    logs: Vec<DatadogLog<'a>>,
}

#[derive(Serialize)]
struct DatadogLog<'a> {
    timestamp: &'a DateTime<Utc>,
    level: LogLevel,
    message: &'a str,
    attributes: DatadogAttributes<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum DatadogAttributes<'a> {
    Full(&'a OutboundEntry),
    Minimal(Map<String, Value>),
}

#[derive(Serialize)]
struct SplunkEvent<'a> {
    time: f64,
    event: &'a OutboundEntry,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BatchSerializer;

impl BatchSerializer {
    pub fn new() -> Self {
        Self
    }

    pub fn serialize(
        &self,
        entries: &[OutboundEntry],
        scope: Scope,
        url: &Url,
    ) -> Result<Payload, SerializationError> {
        self.serialize_as(entries, scope, ServiceType::detect(url))
    }

    pub fn serialize_as(
        &self,
        entries: &[OutboundEntry],
        scope: Scope,
        service_type: ServiceType,
    ) -> Result<Payload, SerializationError> {
        if entries.is_empty() {
            return Err(SerializationError::EmptyBatch);
        }

        let mut buffer = Vec::with_capacity(self.estimate_serialized_size(entries.len()));
        match service_type {
            ServiceType::Generic => write_generic(&mut buffer, entries, scope)?,
            ServiceType::Datadog => write_datadog(&mut buffer, entries, scope)?,
            ServiceType::Elasticsearch => write_elasticsearch(&mut buffer, entries)?,
            ServiceType::Splunk => write_splunk(&mut buffer, entries)?,
        }

        Ok(Payload {
            body: Bytes::from(buffer),
            service_type,
            entries: entries.len(),
        })
    }

    pub fn estimate_serialized_size(&self, entries: usize) -> usize {
        entries
            .saturating_mul(ESTIMATED_ENTRY_SIZE)
            .saturating_add(ENVELOPE_OVERHEAD)
    }
}

fn write_generic(
    buffer: &mut Vec<u8>,
    entries: &[OutboundEntry],
    scope: Scope,
) -> Result<(), SerializationError> {
    let envelope = GenericEnvelope {
        logs: entries,
        scope,
        count: entries.len(),
    };
    serde_json::to_writer(buffer, &envelope)?;
    Ok(())
}

fn write_datadog(
    buffer: &mut Vec<u8>,
    entries: &[OutboundEntry],
    scope: Scope,
) -> Result<(), SerializationError> {
    let logs = entries
        .iter()
        .map(|entry| DatadogLog {
            timestamp: &entry.timestamp,
            level: entry.level,
            message: &entry.message,
            attributes: match scope {
                Scope::Full => DatadogAttributes::Full(entry),
                Scope::Minimal => DatadogAttributes::Minimal(datadog_attributes(entry)),
            },
        })
        .collect();

    serde_json::to_writer(buffer, &DatadogEnvelope { logs })?;
    Ok(())
}

/// Minimal-scope attributes: well-known fields with `meta` flattened on top.
fn datadog_attributes(entry: &OutboundEntry) -> Map<String, Value> {
    let mut attributes = Map::new();
    attributes.insert("service".to_string(), Value::from("unknown"));

    let mut put = |key: &str, value: Option<Value>| {
        if let Some(value) = value {
            attributes.insert(key.to_string(), value);
        }
    };
    put("component", entry.component.clone().map(Value::from));
    put("requestId", entry.request_id.clone());
    put("userId", entry.user_id.clone());
    put("method", entry.method.clone().map(Value::from));
    put("url", entry.url.clone().map(Value::from));
    put("statusCode", entry.status_code.clone());
    put("durationMs", entry.duration_ms.clone());

    if let Some(meta) = &entry.meta {
        for (key, value) in meta {
            attributes.insert(key.clone(), value.clone());
        }
    }
    attributes
}

fn write_elasticsearch(
    buffer: &mut Vec<u8>,
    entries: &[OutboundEntry],
) -> Result<(), SerializationError> {
    for entry in entries {
        buffer.write_all(ELASTICSEARCH_INDEX_ACTION)?;
        buffer.write_all(b"\n")?;
        serde_json::to_writer(&mut *buffer, entry)?;
        buffer.write_all(b"\n")?;
    }
    Ok(())
}

fn write_splunk(buffer: &mut Vec<u8>, entries: &[OutboundEntry]) -> Result<(), SerializationError> {
    for (index, entry) in entries.iter().enumerate() {
        if index > 0 {
            buffer.write_all(b"\n")?;
        }
        let event = SplunkEvent {
            time: entry.timestamp.timestamp_millis() as f64 / 1000.0,
            event: entry,
        };
        serde_json::to_writer(&mut *buffer, &event)?;
    }
    Ok(())
}
