//! Response encoding.

use eventgate_proto::{CodecRegistry, FrameType, SendEventResponse};

use super::frame::{FrameSocket, Outbound, WriteError};

/// Encodes `response` with the codec for `frame_type` and writes it.
pub(crate) fn write_response(
    socket: &dyn FrameSocket,
    codecs: &CodecRegistry,
    frame_type: FrameType,
    response: &SendEventResponse,
) -> Result<(), WriteError> {
    let codec = codecs
        .resolve(frame_type)
        .ok_or(WriteError::UnknownFrameType(frame_type))?;
    let payload = codec.encode(response)?;
    socket.send_frame(Outbound::Data {
        frame_type,
        payload,
    })
}
