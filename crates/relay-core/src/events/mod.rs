//! Change events relayed to streaming clients.
//!
//! An [`Event`] is an ordered JSON object. Events coming from the
//! database carry an `event` discriminator (`INSERT`, `UPDATE`, `DELETE`)
//! or a domain action; events injected through direct publish only need
//! to be well-formed objects.

pub mod kind;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, ErrorKind};
use crate::result::AppResult;

pub use kind::EventKind;

/// Name of the discriminator field.
pub const EVENT_FIELD: &str = "event";

/// An immutable change event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event(Map<String, Value>);

impl Event {
    /// Decode an event from a raw source payload.
    ///
    /// Anything other than a JSON object is a decode error.
    pub fn decode(payload: &str) -> AppResult<Self> {
        let value: Value = serde_json::from_str(payload)
            .map_err(|e| AppError::with_source(ErrorKind::Decode, "Malformed event payload", e))?;
        Self::from_value(value)
    }

    /// Build an event from an already-parsed JSON value.
    pub fn from_value(value: Value) -> AppResult<Self> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(AppError::decode(format!(
                "Event payload must be a JSON object, got {}",
                json_type(&other)
            ))),
        }
    }

    /// The discriminator, if present.
    pub fn kind(&self) -> Option<EventKind> {
        self.0
            .get(EVENT_FIELD)
            .and_then(Value::as_str)
            .map(EventKind::parse)
    }

    /// Look up a payload field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Textual form of a scalar field (strings as-is, numbers formatted).
    pub fn field_text(&self, field: &str) -> Option<String> {
        match self.0.get(field)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Whether `field` holds `expected`.
    pub fn correlates_with(&self, field: &str, expected: &str) -> bool {
        self.field_text(field).as_deref() == Some(expected)
    }

    /// Serialize to compact JSON, preserving field order.
    pub fn to_json(&self) -> AppResult<String> {
        Ok(serde_json::to_string(&self.0)?)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the event has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Value> for Event {
    type Error = AppError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
