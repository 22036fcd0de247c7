//! Wire schema and frame codecs for the eventgate gateway.
//!
//! Clients send [`SendEventRequest`] batches over WebSocket frames and receive
//! one [`SendEventResponse`] per batch. The [`CodecRegistry`] selects how a
//! payload is decoded from the frame type it arrived on, and responses are
//! written back using the same codec.

mod codec;
mod response;
mod schema;

pub use codec::{
    Codec, CodecError, CodecRegistry, DeserializeFn, FrameType, SerializeFn, json_req_guid,
};
pub use schema::{Code, Event, REQ_GUID_KEY, SendEventRequest, SendEventResponse, Status};
