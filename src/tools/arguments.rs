//! Normalisation of raw tool call arguments.

use serde_json::{Map, Value};

use crate::error::BridgeError;

/// JSON object passed to a tool.
pub type JsonObject = Map<String, Value>;

/// Coerce model-supplied arguments into a JSON object.
///
/// Models sometimes send `null` for "no arguments" or a JSON-encoded string
/// instead of an object; both are accepted.
pub fn coerce_arguments(value: Value) -> Result<JsonObject, BridgeError> {
    match value {
        Value::Null => Ok(JsonObject::new()),
        Value::Object(map) => Ok(map),
        Value::String(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(JsonObject::new());
            }
            let parsed: Value = serde_json::from_str(trimmed).map_err(|e| {
                BridgeError::InvalidArgument(format!("tool arguments must be valid JSON: {e}"))
            })?;
            match parsed {
                Value::String(_) => Err(BridgeError::InvalidArgument(
                    "tool arguments must be a JSON object; got a string".into(),
                )),
                other => coerce_arguments(other),
            }
        }
        other => Err(BridgeError::InvalidArgument(format!(
            "tool arguments must be a JSON object; got {other}"
        ))),
    }
}
