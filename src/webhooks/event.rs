use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A webhook event envelope.
///
/// Only the envelope is typed; `data.object` stays a JSON value since its
/// shape depends on the event type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub livemode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    pub data: EventData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    pub object: Value,
    /// Present on `*.updated` events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_attributes: Option<Value>,
}

impl Event {
    pub fn new(id: impl Into<String>, event_type: impl Into<String>, object: Value) -> Self {
        Self {
            id: id.into(),
            event_type: event_type.into(),
            created: 0,
            livemode: false,
            api_version: None,
            data: EventData {
                object,
                previous_attributes: None,
            },
        }
    }

    /// Parse an event from the raw delivery body.
    pub fn from_slice(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    /// The `id` of the embedded object, if it has one.
    pub fn object_id(&self) -> Option<&str> {
        self.data.object.get("id").and_then(Value::as_str)
    }
}
