use crate::error::{ConfirmError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// A device-management operation handed to the waiter by the workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub topic: String,
    pub payload: Value,
}

impl Operation {
    /// Build an operation from its topic and the raw JSON text of its payload.
    pub fn parse(topic: impl Into<String>, payload: &str) -> Result<Self> {
        let payload = serde_json::from_str(payload).map_err(ConfirmError::InvalidPayload)?;
        Ok(Self {
            topic: topic.into(),
            payload,
        })
    }
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// Message body handed to a publisher.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Serialized as compact JSON.
    Json(Value),
    /// Published verbatim.
    Raw(String),
}

impl Payload {
    pub fn encode(&self) -> Result<String> {
        match self {
            Payload::Json(value) => Ok(serde_json::to_string(value)?),
            Payload::Raw(text) => Ok(text.clone()),
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Raw(text.to_string())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Raw(text)
    }
}

// ---------------------------------------------------------------------------
// Qos
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Qos {
    AtMostOnce,
    #[default]
    AtLeastOnce,
    ExactlyOnce,
}

impl Qos {
    pub fn as_u8(self) -> u8 {
        match self {
            Qos::AtMostOnce => 0,
            Qos::AtLeastOnce => 1,
            Qos::ExactlyOnce => 2,
        }
    }
}

impl TryFrom<u8> for Qos {
    type Error = ConfirmError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Qos::AtMostOnce),
            1 => Ok(Qos::AtLeastOnce),
            2 => Ok(Qos::ExactlyOnce),
            other => Err(ConfirmError::InvalidQos(other)),
        }
    }
}

impl From<Qos> for u8 {
    fn from(qos: Qos) -> Self {
        qos.as_u8()
    }
}

impl fmt::Display for Qos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

impl std::str::FromStr for Qos {
    type Err = ConfirmError;

    fn from_str(s: &str) -> Result<Self> {
        let value: u8 = s
            .trim()
            .parse()
            .map_err(|_| ConfirmError::InvalidConfig(format!("qos must be a number, got '{s}'")))?;
        Qos::try_from(value)
    }
}

// ---------------------------------------------------------------------------
// TopicScheme
// ---------------------------------------------------------------------------

/// Local MQTT topic layout: `<root>/<topic id>/<channel>`.
///
/// The topic id of the main device is `device/main//`, which yields topics
/// such as `te/device/main///e/confirm`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicScheme {
    root: String,
    topic_id: String,
}

impl TopicScheme {
    pub fn new(root: impl Into<String>, topic_id: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            topic_id: topic_id.into(),
        }
    }

    /// Event topic on which "waiting for confirmation" notices are published.
    pub fn confirm_topic(&self) -> String {
        format!("{}/{}/e/confirm", self.root, self.topic_id)
    }
}
