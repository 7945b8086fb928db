use crate::domain::{ErrorDetails, LogError};
use serde_json::{Map, Value};

const GENERIC_ERROR_NAME: &str = "Error";
const STACK_KEY: &str = "stack";

/// Reduces an error to what minimal scope transmits.
///
/// Text passes through. Objects keep `message`, a non-generic `name`, and
/// `code` and `statusCode` when they carry a value.
pub fn sanitize_error(error: LogError) -> LogError {
    match error {
        LogError::Message(message) => LogError::Message(message),
        LogError::Details(details) => LogError::Details(ErrorDetails {
            message: details.message,
            name: details.name.filter(|name| name != GENERIC_ERROR_NAME),
            code: details.code.filter(is_present),
            status_code: details.status_code.filter(is_present),
            stack: None,
            extra: Map::new(),
        }),
    }
}

/// Removes stack traces from an error and from any error nested inside it,
/// leaving everything else intact.
pub fn strip_stack(error: LogError) -> LogError {
    match error {
        LogError::Message(message) => LogError::Message(message),
        LogError::Details(mut details) => {
            details.stack = None;
            strip_stacks(&mut details.extra);
            LogError::Details(details)
        }
    }
}

/// Drops `stack` from `fields` itself and from every error-shaped object
/// (one with a `message`) nested below it.
pub fn strip_stacks(fields: &mut Map<String, Value>) {
    fields.remove(STACK_KEY);
    for value in fields.values_mut() {
        strip_nested(value);
    }
}

fn strip_nested(value: &mut Value) {
    match value {
        Value::Object(object) => {
            if object.contains_key("message") {
                object.remove(STACK_KEY);
            }
            for nested in object.values_mut() {
                strip_nested(nested);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(strip_nested),
        _ => {}
    }
}

/// Whether a context value is worth sending: not null, `false`, zero or an
/// empty string.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
