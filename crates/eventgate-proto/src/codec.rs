//! Frame codecs keyed by WebSocket frame type.
//!
//! Binary frames carry protobuf and text frames carry JSON in the standard
//! registry. A registry may omit either entry; frames of an unregistered type
//! abort the connection that sent them.

use std::fmt;

use prost::Message as _;
use thiserror::Error;

use crate::schema::{REQ_GUID_KEY, SendEventRequest, SendEventResponse};

/// WebSocket data frame kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameType {
    /// UTF-8 text frame.
    Text,
    /// Binary frame.
    Binary,
}

impl FrameType {
    /// Lower-case name used in logs and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Binary => "binary",
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure to encode or decode a frame payload.
#[derive(Debug, Error)]
pub enum CodecError {
    /// JSON text was malformed or did not match the schema.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// Protobuf bytes were malformed.
    #[error("{0}")]
    Protobuf(#[from] prost::DecodeError),
}

/// Serialises a response into a frame payload.
pub type SerializeFn = fn(&SendEventResponse) -> Result<Vec<u8>, CodecError>;
/// Deserialises a frame payload into a request.
pub type DeserializeFn = fn(&[u8]) -> Result<SendEventRequest, CodecError>;

/// Serializer and deserializer pair bound to one frame type.
#[derive(Clone, Copy, Debug)]
pub struct Codec {
    frame_type: FrameType,
    serialize: SerializeFn,
    deserialize: DeserializeFn,
}

impl Codec {
    /// Protobuf over binary frames.
    pub const PROTOBUF: Self = Self::new(FrameType::Binary, encode_protobuf, decode_protobuf);
    /// JSON over text frames.
    pub const JSON: Self = Self::new(FrameType::Text, encode_json, decode_json);

    /// Builds a codec from explicit functions.
    #[must_use]
    pub const fn new(
        frame_type: FrameType,
        serialize: SerializeFn,
        deserialize: DeserializeFn,
    ) -> Self {
        Self {
            frame_type,
            serialize,
            deserialize,
        }
    }

    /// Frame type this codec handles.
    #[must_use]
    pub const fn frame_type(&self) -> FrameType {
        self.frame_type
    }

    /// Encodes a response.
    ///
    /// # Errors
    ///
    /// Returns the serializer's failure.
    pub fn encode(&self, response: &SendEventResponse) -> Result<Vec<u8>, CodecError> {
        (self.serialize)(response)
    }

    /// Decodes a request.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] when the payload does not match the schema.
    pub fn decode(&self, payload: &[u8]) -> Result<SendEventRequest, CodecError> {
        (self.deserialize)(payload)
    }
}

fn encode_protobuf(response: &SendEventResponse) -> Result<Vec<u8>, CodecError> {
    Ok(response.encode_to_vec())
}

fn decode_protobuf(payload: &[u8]) -> Result<SendEventRequest, CodecError> {
    Ok(SendEventRequest::decode(payload)?)
}

fn encode_json(response: &SendEventResponse) -> Result<Vec<u8>, CodecError> {
    Ok(serde_json::to_vec(response)?)
}

fn decode_json(payload: &[u8]) -> Result<SendEventRequest, CodecError> {
    Ok(serde_json::from_slice(payload)?)
}

/// Reads `req_guid` from JSON text that did not decode as a request.
///
/// Returns `None` when the payload is not a JSON object or the field is not a
/// string.
#[must_use]
pub fn json_req_guid(payload: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(payload).ok()?;
    value.get(REQ_GUID_KEY)?.as_str().map(str::to_owned)
}

/// Immutable lookup of codecs by frame type.
#[derive(Clone, Copy, Debug, Default)]
pub struct CodecRegistry {
    text: Option<Codec>,
    binary: Option<Codec>,
}

impl CodecRegistry {
    /// JSON for text frames, protobuf for binary frames.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            text: Some(Codec::JSON),
            binary: Some(Codec::PROTOBUF),
        }
    }

    /// Builds a registry from codecs; a later codec replaces an earlier one
    /// for the same frame type.
    #[must_use]
    pub fn from_codecs(codecs: impl IntoIterator<Item = Codec>) -> Self {
        codecs
            .into_iter()
            .fold(Self::default(), |mut registry, codec| {
                match codec.frame_type {
                    FrameType::Text => registry.text = Some(codec),
                    FrameType::Binary => registry.binary = Some(codec),
                }
                registry
            })
    }

    /// Codec registered for `frame_type`.
    #[must_use]
    pub const fn resolve(&self, frame_type: FrameType) -> Option<&Codec> {
        match frame_type {
            FrameType::Text => self.text.as_ref(),
            FrameType::Binary => self.binary.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use prost::Message as _;
    use rstest::rstest;

    use super::*;
    use crate::schema::Event;

    fn sample_request() -> SendEventRequest {
        SendEventRequest {
            req_guid: "r-1".to_owned(),
            events: vec![Event {
                event_bytes: vec![0, 1, 2, 255],
                r#type: "page".to_owned(),
            }],
        }
    }

    #[rstest]
    #[case::text(FrameType::Text)]
    #[case::binary(FrameType::Binary)]
    fn standard_registry_resolves_both_frame_types(#[case] frame_type: FrameType) {
        let registry = CodecRegistry::standard();
        let codec = registry.resolve(frame_type).expect("codec registered");
        assert_eq!(codec.frame_type(), frame_type);
    }

    #[test]
    fn json_codec_decodes_client_payload() {
        let payload = br#"{"req_guid":"r-1","events":[{"event_bytes":"AAEC/w==","type":"page"}]}"#;
        let request = Codec::JSON.decode(payload).expect("decode json");
        assert_eq!(request, sample_request());
    }

    #[test]
    fn protobuf_codec_decodes_client_payload() {
        let payload = sample_request().encode_to_vec();
        let request = Codec::PROTOBUF.decode(&payload).expect("decode protobuf");
        assert_eq!(request, sample_request());
    }

    #[rstest]
    #[case::json(Codec::JSON, b"{not json".as_slice())]
    #[case::protobuf(Codec::PROTOBUF, &[0x0a, 0x05, b'a'][..])]
    fn malformed_payloads_fail(#[case] codec: Codec, #[case] payload: &[u8]) {
        assert!(codec.decode(payload).is_err());
    }

    #[test]
    fn json_responses_encode_enums_as_integers() {
        let response = SendEventResponse::success("r-1");
        let bytes = Codec::JSON.encode(&response).expect("encode json");
        let value: serde_json::Value = serde_json::from_slice(&bytes).expect("parse json");
        assert_eq!(value["status"], 1);
        assert_eq!(value["code"], 1);
        assert_eq!(value["data"]["req_guid"], "r-1");
    }

    #[rstest]
    #[case::wrong_events_type(br#"{"req_guid":"r-9","events":"oops"}"#.as_slice(), Some("r-9"))]
    #[case::bad_base64(
        br#"{"req_guid":"r-9","events":[{"event_bytes":"***"}]}"#.as_slice(),
        Some("r-9")
    )]
    #[case::numeric_id(br#"{"req_guid":5}"#.as_slice(), None)]
    #[case::not_an_object(br#""r-9""#.as_slice(), None)]
    #[case::truncated(br#"{"req_guid":"r-9""#.as_slice(), None)]
    fn request_id_is_recovered_from_rejected_json(
        #[case] payload: &[u8],
        #[case] expected: Option<&str>,
    ) {
        assert!(Codec::JSON.decode(payload).is_err());
        assert_eq!(json_req_guid(payload).as_deref(), expected);
    }

    #[test]
    fn partial_registry_leaves_missing_type_unresolved() {
        let registry = CodecRegistry::from_codecs([Codec::PROTOBUF]);
        assert!(registry.resolve(FrameType::Binary).is_some());
        assert!(registry.resolve(FrameType::Text).is_none());
    }
}
