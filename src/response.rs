use crate::buffer::ByteBuf;
use crate::types::Headers;
use bytes::Bytes;
use std::ops::Range;

/// One DATA frame moved into the response without copying; the range
/// addresses the payload inside the frame envelope.
#[derive(Debug)]
pub(crate) struct BodyBlock {
    pub buf: ByteBuf,
    pub payload: Range<usize>,
}

/// A completed response: status, the full header list (trailers included,
/// in arrival order) and the body as the received DATA blocks.
#[derive(Debug, Default)]
pub struct Response {
    pub(crate) status: Option<u16>,
    pub(crate) headers: Headers,
    pub(crate) blocks: Vec<BodyBlock>,
    pub(crate) body_len: usize,
}

impl Response {
    /// The `:status` pseudo-header; 0 if the peer never sent one.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status.unwrap_or(0)
    }

    /// First header with this name, compared ASCII case-insensitively.
    #[must_use]
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        let name = name.as_ref();
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    #[must_use]
    pub fn body_len(&self) -> usize {
        self.body_len
    }

    /// Assembles the body out of the received blocks.
    #[must_use]
    pub fn body(&self) -> Bytes {
        let mut body = Vec::with_capacity(self.body_len);
        for block in &self.blocks {
            body.extend_from_slice(&block.buf.readable()[block.payload.clone()]);
        }
        body.into()
    }

    /// The body as lossily-decoded UTF-8.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body()).into_owned()
    }

    /// Deserializes the body as JSON.
    #[cfg(feature = "json")]
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body())
    }

    pub(crate) fn insert_headers(&mut self, headers: impl IntoIterator<Item = (String, String)>) {
        for (name, value) in headers {
            if self.status.is_none() && name == ":status" {
                self.status = value.parse().ok();
            }
            self.headers.push((name, value));
        }
    }

    pub(crate) fn insert_body(&mut self, buf: ByteBuf, payload: Range<usize>) {
        self.body_len += payload.len();
        self.blocks.push(BodyBlock { buf, payload });
    }
}
