//! HPACK header compression (RFC 7541): integer/string primitives, the
//! Huffman code, static/dynamic tables with joined addressing, and the
//! stateful encoder/decoder pair used by the session.

pub mod decoder;
pub mod encoder;
pub mod huffman;
pub mod integer;
pub mod string;
pub mod table;

pub use decoder::Decoder;
pub use encoder::Encoder;

use crate::error::Error;
use crate::types::ErrorCode;
use bytes::Bytes;

/// How a header field may interact with the dynamic table.
///
/// `NeverIndex` is sticky: an intermediary re-encoding the field must keep
/// the never-indexed representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexPolicy {
    #[default]
    Default,
    WithoutIndex,
    NeverIndex,
}

/// One header name/value pair plus its indexing policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    name: Bytes,
    value: Bytes,
    policy: IndexPolicy,
}

impl HeaderField {
    pub fn new(name: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            policy: IndexPolicy::Default,
        }
    }

    pub fn without_index(name: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            policy: IndexPolicy::WithoutIndex,
            ..Self::new(name, value)
        }
    }

    /// A field that must never enter any dynamic table (e.g. credentials).
    pub fn never_indexed(name: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            policy: IndexPolicy::NeverIndex,
            ..Self::new(name, value)
        }
    }

    #[must_use]
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    #[must_use]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    #[must_use]
    pub fn policy(&self) -> IndexPolicy {
        self.policy
    }

    pub(crate) fn name_bytes(&self) -> Bytes {
        self.name.clone()
    }

    pub(crate) fn value_bytes(&self) -> Bytes {
        self.value.clone()
    }

    /// Table occupancy cost of this field (RFC 7541 §4.1).
    #[must_use]
    pub fn hpack_size(&self) -> usize {
        self.name.len() + self.value.len() + 32
    }
}

/// Decode-side failures. All of them are fatal for the connection and map
/// to COMPRESSION_ERROR on the wire.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HpackError {
    #[error("integer exceeds the 2^24-1 limit")]
    IntegerOverflow,
    #[error("input ends inside an encoded element")]
    Truncated,
    #[error("invalid table index {0}")]
    InvalidIndex(usize),
    #[error("invalid huffman sequence")]
    InvalidHuffman,
    #[error("table size update beyond the advertised maximum")]
    TableSizeExceeded,
    #[error("table size update after a header field")]
    LateTableSizeUpdate,
}

impl From<HpackError> for Error {
    fn from(_: HpackError) -> Self {
        Error::conn(ErrorCode::CompressionError, "header block decode failed")
    }
}
