use serde_json::{Map, Value};

/// Correlation and monitoring keys forwarded in minimal scope.
pub const ESSENTIAL_METADATA_KEYS: [&str; 9] = [
    "traceId",
    "spanId",
    "sessionId",
    "tenantId",
    "appName",
    "environment",
    "service",
    "version",
    "ip",
];

/// Keeps the allow-listed keys plus any other key ending in `Id`.
pub fn filter_essential_metadata(extra: &Map<String, Value>) -> Map<String, Value> {
    let mut essential = Map::new();

    for key in ESSENTIAL_METADATA_KEYS {
        if let Some(value) = extra.get(key) {
            essential.insert(key.to_string(), value.clone());
        }
    }

    for (key, value) in extra {
        if key.ends_with("Id") && !essential.contains_key(key) {
            essential.insert(key.clone(), value.clone());
        }
    }

    essential
}
