//! Frame parsing and validation (RFC 7540 §4). A [`FrameView`] is a
//! read-only window over wire bytes: the nine header bytes are always
//! decoded, typed payload accessors borrow from the underlying buffer so
//! nothing is copied.

use crate::error::Error;
use crate::flags::*;
use crate::types::*;
use num_traits::FromPrimitive;

/// The decoded 9-byte frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub length: usize,
    pub raw_type: u8,
    pub flags: u8,
    pub stream_id: StreamId,
}

impl FrameHeader {
    /// Reads the header fields if at least nine bytes are present.
    #[must_use]
    pub fn parse(src: &[u8]) -> Option<Self> {
        if src.len() < FRAME_HEADER_LEN {
            return None;
        }
        let length = usize::from(src[0]) << 16 | usize::from(src[1]) << 8 | usize::from(src[2]);
        let stream_id = u32::from_be_bytes([src[5], src[6], src[7], src[8]]) & (u32::MAX >> 1);
        Some(Self {
            length,
            raw_type: src[3],
            flags: src[4],
            stream_id,
        })
    }

    #[must_use]
    pub fn frame_type(&self) -> Option<FrameType> {
        FrameType::from_u8(self.raw_type)
    }

    /// Full frame size on the wire, header included.
    #[must_use]
    pub fn frame_len(&self) -> usize {
        FRAME_HEADER_LEN + self.length
    }
}

/// A frame (possibly still incomplete) viewed in place over a byte span.
#[derive(Debug)]
pub struct FrameView<'a> {
    header: FrameHeader,
    buf: &'a [u8],
}

impl<'a> FrameView<'a> {
    /// Requires at least the nine header bytes. The view is clamped to the
    /// declared frame size when more data follows in `src`.
    #[must_use]
    pub fn parse(src: &'a [u8]) -> Option<Self> {
        let header = FrameHeader::parse(src)?;
        Some(Self {
            buf: &src[..src.len().min(header.frame_len())],
            header,
        })
    }

    #[must_use]
    pub fn header(&self) -> &FrameHeader {
        &self.header
    }

    #[must_use]
    pub fn frame_len(&self) -> usize {
        self.header.frame_len()
    }

    /// Whether the span holds the whole declared payload.
    #[must_use]
    pub fn complete(&self) -> bool {
        self.buf.len() == self.header.frame_len()
    }

    /// Payload bytes present so far.
    #[must_use]
    pub fn payload(&self) -> &'a [u8] {
        &self.buf[FRAME_HEADER_LEN..]
    }

    /// Structural validation per frame type. Checks that need payload bytes
    /// (padding bounds) run only once the frame is complete.
    pub fn validate(&self, max_frame_size: usize) -> Result<(), Error> {
        let h = &self.header;
        let typ = h
            .frame_type()
            .ok_or_else(|| Error::conn(ErrorCode::ProtocolError, "unknown frame type"))?;

        if h.length > max_frame_size {
            return Err(Error::conn(
                ErrorCode::FrameSizeError,
                "payload exceeds SETTINGS_MAX_FRAME_SIZE",
            ));
        }

        let allowed_flags = match typ {
            FrameType::Data => DataFlags::all().bits(),
            FrameType::Headers => HeadersFlags::all().bits(),
            FrameType::Settings | FrameType::Ping => SettingsFlags::ACK.bits(),
            FrameType::Continuation => ContinuationFlags::END_HEADERS.bits(),
            _ => 0,
        };
        if h.flags & !allowed_flags != 0 {
            return Err(Error::conn(
                ErrorCode::ProtocolError,
                "invalid flags for frame type",
            ));
        }

        match typ {
            FrameType::Data | FrameType::Headers | FrameType::Continuation
                if h.stream_id == 0 =>
            {
                return Err(Error::conn(
                    ErrorCode::ProtocolError,
                    "stream frame on stream 0",
                ));
            }
            FrameType::Settings | FrameType::Ping | FrameType::GoAway if h.stream_id != 0 => {
                return Err(Error::conn(
                    ErrorCode::ProtocolError,
                    "connection frame with nonzero stream id",
                ));
            }
            _ => {}
        }

        match typ {
            FrameType::Priority => {
                if h.stream_id == 0 {
                    return Err(Error::conn(ErrorCode::ProtocolError, "PRIORITY on stream 0"));
                }
                if h.length != 5 {
                    return Err(Error::conn(
                        ErrorCode::FrameSizeError,
                        "PRIORITY payload must be 5 bytes",
                    ));
                }
            }
            FrameType::ResetStream => {
                if h.stream_id == 0 {
                    return Err(Error::conn(
                        ErrorCode::ProtocolError,
                        "RST_STREAM on stream 0",
                    ));
                }
                if h.length != 4 {
                    return Err(Error::conn(
                        ErrorCode::FrameSizeError,
                        "RST_STREAM payload must be 4 bytes",
                    ));
                }
            }
            FrameType::Settings => {
                if h.length % 6 != 0 {
                    return Err(Error::conn(
                        ErrorCode::FrameSizeError,
                        "SETTINGS payload must be a multiple of 6",
                    ));
                }
                if h.flags & SettingsFlags::ACK.bits() != 0 && h.length != 0 {
                    return Err(Error::conn(
                        ErrorCode::FrameSizeError,
                        "SETTINGS ACK with payload",
                    ));
                }
            }
            FrameType::PushPromise => {
                // push is disabled in our SETTINGS, so any PUSH_PROMISE is a violation
                return Err(Error::conn(
                    ErrorCode::ProtocolError,
                    "PUSH_PROMISE with push disabled",
                ));
            }
            FrameType::Ping => {
                if h.length != 8 {
                    return Err(Error::conn(
                        ErrorCode::FrameSizeError,
                        "PING payload must be 8 bytes",
                    ));
                }
            }
            FrameType::GoAway => {
                if h.length < 8 {
                    return Err(Error::conn(
                        ErrorCode::FrameSizeError,
                        "GOAWAY payload must be at least 8 bytes",
                    ));
                }
            }
            FrameType::WindowUpdate => {
                if h.length != 4 {
                    return Err(Error::conn(
                        ErrorCode::FrameSizeError,
                        "WINDOW_UPDATE payload must be 4 bytes",
                    ));
                }
            }
            _ => {}
        }

        if self.complete() {
            match typ {
                FrameType::Data => {
                    self.data_payload()?;
                }
                FrameType::Headers => {
                    self.header_block()?;
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// DATA payload with padding stripped.
    pub fn data_payload(&self) -> Result<&'a [u8], Error> {
        let range = self.data_payload_range()?;
        Ok(&self.buf[range])
    }

    /// Range of the DATA payload within the whole frame, for callers that
    /// keep the frame buffer and index into it later.
    pub fn data_payload_range(&self) -> Result<std::ops::Range<usize>, Error> {
        let payload = self.payload();
        if self.header.flags & DataFlags::PADDED.bits() == 0 {
            return Ok(FRAME_HEADER_LEN..FRAME_HEADER_LEN + payload.len());
        }
        let pad = usize::from(*payload.first().ok_or_else(padding_error)?);
        if pad >= payload.len() {
            return Err(padding_error());
        }
        Ok(FRAME_HEADER_LEN + 1..FRAME_HEADER_LEN + payload.len() - pad)
    }

    /// HEADERS/CONTINUATION header-block fragment, with padding and the
    /// optional priority section skipped.
    pub fn header_block(&self) -> Result<&'a [u8], Error> {
        let payload = self.payload();
        if self.header.frame_type() == Some(FrameType::Continuation) {
            return Ok(payload);
        }

        let mut offset = 0;
        let mut pad = 0;
        if self.header.flags & HeadersFlags::PADDED.bits() != 0 {
            pad = usize::from(*payload.first().ok_or_else(padding_error)?);
            offset += 1;
        }
        if self.header.flags & HeadersFlags::PRIORITY.bits() != 0 {
            offset += 5;
        }
        if offset + pad > payload.len() {
            return Err(padding_error());
        }
        Ok(&payload[offset..payload.len() - pad])
    }

    /// Recognized SETTINGS items in payload order; unknown identifiers are
    /// skipped per RFC.
    #[must_use]
    pub fn settings_items(&self) -> Vec<(SettingsParameter, u32)> {
        self.payload()
            .chunks_exact(6)
            .filter_map(|chunk| {
                let id = u16::from_be_bytes([chunk[0], chunk[1]]);
                let value = u32::from_be_bytes([chunk[2], chunk[3], chunk[4], chunk[5]]);
                SettingsParameter::from_u16(id).map(|param| (param, value))
            })
            .collect()
    }

    #[must_use]
    pub fn window_increment(&self) -> u32 {
        let p = self.payload();
        u32::from_be_bytes([p[0], p[1], p[2], p[3]]) & (u32::MAX >> 1)
    }

    #[must_use]
    pub fn rst_error(&self) -> ErrorCode {
        let p = self.payload();
        let raw = u32::from_be_bytes([p[0], p[1], p[2], p[3]]);
        ErrorCode::from_u32(raw).unwrap_or(ErrorCode::InternalError)
    }

    #[must_use]
    pub fn goaway_last_stream_id(&self) -> StreamId {
        let p = self.payload();
        u32::from_be_bytes([p[0], p[1], p[2], p[3]]) & (u32::MAX >> 1)
    }

    #[must_use]
    pub fn goaway_error(&self) -> ErrorCode {
        let p = self.payload();
        let raw = u32::from_be_bytes([p[4], p[5], p[6], p[7]]);
        ErrorCode::from_u32(raw).unwrap_or(ErrorCode::InternalError)
    }

    /// Opaque debug data after the fixed GOAWAY fields.
    #[must_use]
    pub fn goaway_debug(&self) -> &'a [u8] {
        &self.payload()[8..]
    }

    #[must_use]
    pub fn ping_payload(&self) -> [u8; 8] {
        let mut opaque = [0u8; 8];
        opaque.copy_from_slice(&self.payload()[..8]);
        opaque
    }

    #[must_use]
    pub fn end_stream(&self) -> bool {
        match self.header.frame_type() {
            Some(FrameType::Data) => self.header.flags & DataFlags::END_STREAM.bits() != 0,
            Some(FrameType::Headers) => self.header.flags & HeadersFlags::END_STREAM.bits() != 0,
            _ => false,
        }
    }

    #[must_use]
    pub fn end_headers(&self) -> bool {
        self.header.flags & HeadersFlags::END_HEADERS.bits() != 0
    }

    #[must_use]
    pub fn is_ack(&self) -> bool {
        self.header.flags & SettingsFlags::ACK.bits() != 0
    }
}

fn padding_error() -> Error {
    Error::conn(ErrorCode::ProtocolError, "padding exceeds payload")
}
