//! Logical request and response messages.
//!
//! Each message carries both a protobuf layout (for binary frames) and a serde
//! layout (for text frames). Tags are stable; tag 2 of `SendEventRequest` is
//! reserved for the client send timestamp, which the gateway does not read.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Key under which responses echo the request id.
pub const REQ_GUID_KEY: &str = "req_guid";

/// A batch of events sent by a client in one frame.
#[derive(Clone, PartialEq, Eq, ::prost::Message, Serialize, Deserialize)]
pub struct SendEventRequest {
    /// Client-chosen batch id, echoed back in the response.
    #[prost(string, tag = "1")]
    #[serde(default)]
    pub req_guid: String,
    /// Events in client order.
    #[prost(message, repeated, tag = "3")]
    #[serde(default)]
    pub events: Vec<Event>,
}

/// A single opaque event.
#[derive(Clone, PartialEq, Eq, ::prost::Message, Serialize, Deserialize)]
pub struct Event {
    /// Opaque payload. Base64 in the JSON layout.
    #[prost(bytes = "vec", tag = "1")]
    #[serde(default, with = "base64_bytes")]
    pub event_bytes: Vec<u8>,
    /// Event type used for routing and metric tags.
    #[prost(string, tag = "2")]
    #[serde(default)]
    pub r#type: String,
}

/// Response written for every batch, and for rejected upgrades.
#[derive(Clone, PartialEq, Eq, ::prost::Message, Serialize, Deserialize)]
pub struct SendEventResponse {
    /// [`Status`] as its wire integer.
    #[prost(enumeration = "Status", tag = "1")]
    pub status: i32,
    /// [`Code`] as its wire integer.
    #[prost(enumeration = "Code", tag = "2")]
    pub code: i32,
    /// Unix seconds at which the response was built.
    #[prost(int64, tag = "3")]
    pub sent_time: i64,
    /// Human-readable failure description; empty on success.
    #[prost(string, tag = "4")]
    #[serde(default)]
    pub reason: String,
    /// Echo data, keyed by [`REQ_GUID_KEY`].
    #[prost(map = "string, string", tag = "5")]
    #[serde(default)]
    pub data: HashMap<String, String>,
}

/// Coarse outcome of a batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Status {
    /// Never sent by the gateway.
    Unspecified = 0,
    /// The batch was accepted (or delivered, in synchronous mode).
    Success = 1,
    /// The batch or the connection was refused.
    Error = 2,
}

/// Detailed outcome of a batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Code {
    /// Never sent by the gateway.
    Unspecified = 0,
    /// Accepted.
    Ok = 1,
    /// The frame could not be decoded.
    BadRequest = 2,
    /// Downstream processing failed.
    InternalError = 3,
    /// The gateway is at its connection capacity.
    MaxConnectionLimitReached = 4,
    /// The connection identifier is already connected.
    MaxUserLimitReached = 5,
}

mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text).map_err(D::Error::custom)
    }
}
