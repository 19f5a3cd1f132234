//! Builders for outbound frames. Each returns an owned [`ByteBuf`] sized
//! exactly to the frame; HEADERS/CONTINUATION builders emit only the nine
//! header bytes since the HPACK fragment follows as separate buffers, and
//! the DATA builder hands back the writable payload range so body bytes are
//! copied in place exactly once.

use crate::buffer::ByteBuf;
use crate::flags::{ContinuationFlags, DataFlags, HeadersFlags, PingFlags, SettingsFlags};
use crate::types::*;
use num_traits::ToPrimitive;
use std::ops::Range;

fn frame_header(out: &mut ByteBuf, length: usize, typ: FrameType, flags: u8, stream_id: StreamId) {
    let length = u32::try_from(length).expect("frame payload fits 24 bits");
    out.commit_slice(&length.to_be_bytes()[1..]);
    // unwrap: FrameType is repr(u8)
    out.commit_slice(&[typ.to_u8().unwrap(), flags]);
    out.commit_slice(&(stream_id & (u32::MAX >> 1)).to_be_bytes());
}

#[must_use]
pub fn settings(items: &[(SettingsParameter, u32)]) -> ByteBuf {
    let payload_len = items.len() * 6;
    let mut buf = ByteBuf::with_capacity(FRAME_HEADER_LEN + payload_len);
    frame_header(&mut buf, payload_len, FrameType::Settings, 0, 0);
    for &(param, value) in items {
        // unwrap: SettingsParameter is repr(u16)
        buf.commit_slice(&param.to_u16().unwrap().to_be_bytes());
        buf.commit_slice(&value.to_be_bytes());
    }
    buf
}

#[must_use]
pub fn settings_ack() -> ByteBuf {
    let mut buf = ByteBuf::with_capacity(FRAME_HEADER_LEN);
    frame_header(
        &mut buf,
        0,
        FrameType::Settings,
        SettingsFlags::ACK.bits(),
        0,
    );
    buf
}

#[must_use]
pub fn ping(opaque: [u8; 8], ack: bool) -> ByteBuf {
    let mut buf = ByteBuf::with_capacity(FRAME_HEADER_LEN + 8);
    let flags = if ack { PingFlags::ACK.bits() } else { 0 };
    frame_header(&mut buf, 8, FrameType::Ping, flags, 0);
    buf.commit_slice(&opaque);
    buf
}

#[must_use]
pub fn rst_stream(stream_id: StreamId, code: ErrorCode) -> ByteBuf {
    let mut buf = ByteBuf::with_capacity(FRAME_HEADER_LEN + 4);
    frame_header(&mut buf, 4, FrameType::ResetStream, 0, stream_id);
    // unwrap: ErrorCode is repr(u32)
    buf.commit_slice(&code.to_u32().unwrap().to_be_bytes());
    buf
}

#[must_use]
pub fn goaway(code: ErrorCode, last_stream_id: StreamId, debug: &[u8]) -> ByteBuf {
    let mut buf = ByteBuf::with_capacity(FRAME_HEADER_LEN + 8 + debug.len());
    frame_header(&mut buf, 8 + debug.len(), FrameType::GoAway, 0, 0);
    buf.commit_slice(&(last_stream_id & (u32::MAX >> 1)).to_be_bytes());
    // unwrap: ErrorCode is repr(u32)
    buf.commit_slice(&code.to_u32().unwrap().to_be_bytes());
    buf.commit_slice(debug);
    buf
}

#[must_use]
pub fn window_update(stream_id: StreamId, increment: u32) -> ByteBuf {
    let mut buf = ByteBuf::with_capacity(FRAME_HEADER_LEN + 4);
    frame_header(&mut buf, 4, FrameType::WindowUpdate, 0, stream_id);
    buf.commit_slice(&(increment & (u32::MAX >> 1)).to_be_bytes());
    buf
}

/// HEADERS frame header announcing `payload_len` bytes of HPACK fragment.
#[must_use]
pub fn headers(stream_id: StreamId, flags: HeadersFlags, payload_len: usize) -> ByteBuf {
    let mut buf = ByteBuf::with_capacity(FRAME_HEADER_LEN);
    frame_header(
        &mut buf,
        payload_len,
        FrameType::Headers,
        flags.bits(),
        stream_id,
    );
    buf
}

/// CONTINUATION frame header announcing `payload_len` bytes of fragment.
#[must_use]
pub fn continuation(stream_id: StreamId, flags: ContinuationFlags, payload_len: usize) -> ByteBuf {
    let mut buf = ByteBuf::with_capacity(FRAME_HEADER_LEN);
    frame_header(
        &mut buf,
        payload_len,
        FrameType::Continuation,
        flags.bits(),
        stream_id,
    );
    buf
}

/// Complete DATA frame with a zeroed payload; the returned range addresses
/// the payload region inside the buffer for in-place filling.
#[must_use]
pub fn data(stream_id: StreamId, flags: DataFlags, payload_len: usize) -> (ByteBuf, Range<usize>) {
    let mut buf = ByteBuf::with_capacity(FRAME_HEADER_LEN + payload_len);
    frame_header(&mut buf, payload_len, FrameType::Data, flags.bits(), stream_id);
    buf.commit(payload_len);
    (buf, FRAME_HEADER_LEN..FRAME_HEADER_LEN + payload_len)
}
