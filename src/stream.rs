//! Per-stream state machine (RFC 7540 §5.1, client view): request
//! serialization into HEADERS/CONTINUATION/DATA under flow-control and
//! frame-size budgets, and response assembly from decoded headers and
//! moved-in DATA frames.

use crate::buffer::ByteBuf;
use crate::error::Error;
use crate::flags::{ContinuationFlags, DataFlags, HeadersFlags};
use crate::frame_builder;
use crate::hpack::{Encoder, HeaderField};
use crate::request::Request;
use crate::response::Response;
use crate::types::*;
use crate::window::{RecvWindow, SendWindow};
use bytes::Bytes;
use derivative::Derivative;
use log::trace;
use std::collections::VecDeque;
use std::ops::Range;
use std::time::Duration;
use tokio::sync::oneshot;

pub(crate) type Completion = oneshot::Sender<Result<Response, Error>>;

/// https://httpwg.org/specs/rfc7540.html#StreamStates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StreamState {
    Idle,
    Open,
    HalfClosedLocal,
    HalfClosedRemote,
    Closed,
}

/// Bytes a stream put into the outbound queue; `data` is the share that
/// consumed flow-control credit.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct TxBytes {
    pub total: usize,
    pub data: usize,
}

#[derive(Derivative)]
#[derivative(Debug)]
pub(crate) struct Stream {
    id: StreamId,
    state: StreamState,
    send_window: SendWindow,
    recv_window: RecvWindow,
    /// Request fields not yet handed to the HPACK encoder.
    pending_fields: VecDeque<HeaderField>,
    body: VecDeque<Bytes>,
    /// Read offset into the front body slice.
    body_offset: usize,
    body_remaining: usize,
    /// The initial HEADERS frame went out.
    headers_started: bool,
    /// END_HEADERS not emitted yet; the scheduler must keep serving this
    /// stream exclusively until it is.
    continuing: bool,
    timeout: Duration,
    response: Response,
    #[derivative(Debug = "ignore")]
    completion: Option<Completion>,
    pub(crate) scheduled: bool,
}

impl Stream {
    pub fn new(
        id: StreamId,
        remote_window: u32,
        local_window: u32,
        request: &Request,
        completion: Completion,
    ) -> Self {
        Self {
            id,
            state: StreamState::Idle,
            send_window: SendWindow::new(remote_window),
            recv_window: RecvWindow::new(local_window),
            pending_fields: request.field_list(),
            body_remaining: request.body_len(),
            body: request.body.iter().cloned().collect(),
            body_offset: 0,
            headers_started: false,
            continuing: false,
            timeout: request.timeout_value(),
            response: Response::default(),
            completion: Some(completion),
            scheduled: false,
        }
    }

    #[must_use]
    pub fn id(&self) -> StreamId {
        self.id
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state == StreamState::Closed
    }

    #[must_use]
    pub fn is_continuing(&self) -> bool {
        self.continuing
    }

    /// Whether a scheduler pass could make progress for this stream.
    #[must_use]
    pub fn has_tx_data(&self) -> bool {
        if self.state == StreamState::Closed {
            return false;
        }
        !self.pending_fields.is_empty()
            || self.continuing
            || (self.body_remaining > 0
                && self.headers_started
                && self.send_window.available() > 0)
            || self.recv_window.update_pending()
    }

    /// Produces at most one frame (plus a possible WINDOW_UPDATE) into
    /// `out`. `limit` bounds total bytes, `data_credit` the connection
    /// flow-control share DATA may spend.
    pub fn produce_tx(
        &mut self,
        out: &mut Vec<ByteBuf>,
        encoder: &mut Encoder,
        limit: usize,
        data_credit: usize,
    ) -> TxBytes {
        self.scheduled = false;
        let mut used = TxBytes::default();
        if self.state == StreamState::Closed {
            return used;
        }

        // replenish our receive window first; the frame is tiny and not
        // flow controlled. Must not interleave an unfinished header block.
        if !self.continuing {
            if let Some(increment) = self.recv_window.replenish() {
                let frame = frame_builder::window_update(self.id, increment);
                used.total += frame.len();
                out.push(frame);
            }
        }

        if !self.pending_fields.is_empty() {
            used = self.produce_header_frame(out, encoder, limit, used);
            return used;
        }

        if self.headers_started && !self.continuing && self.body_remaining > 0 {
            used = self.produce_data_frame(out, limit, data_credit, used);
        }
        used
    }

    fn produce_header_frame(
        &mut self,
        out: &mut Vec<ByteBuf>,
        encoder: &mut Encoder,
        limit: usize,
        mut used: TxBytes,
    ) -> TxBytes {
        let budget = limit.saturating_sub(used.total + FRAME_HEADER_LEN);
        if budget == 0 {
            return used;
        }

        let (fragment, count) = encoder.encode(&mut self.pending_fields, budget);
        if count == 0 && fragment.is_empty() {
            // not even one field fits this round
            return used;
        }

        let block_done = self.pending_fields.is_empty();
        let end_stream = self.body_remaining == 0;
        let frame = if self.headers_started {
            let mut flags = ContinuationFlags::empty();
            if block_done {
                flags |= ContinuationFlags::END_HEADERS;
            }
            frame_builder::continuation(self.id, flags, fragment.len())
        } else {
            let mut flags = HeadersFlags::empty();
            if block_done {
                flags |= HeadersFlags::END_HEADERS;
            }
            if end_stream {
                flags |= HeadersFlags::END_STREAM;
            }
            self.headers_started = true;
            // END_STREAM transitions on the HEADERS frame even when the
            // block continues
            self.state = match (self.state, end_stream) {
                (StreamState::HalfClosedRemote, true) => StreamState::Closed,
                (StreamState::HalfClosedRemote, false) => StreamState::HalfClosedRemote,
                (_, true) => StreamState::HalfClosedLocal,
                (_, false) => StreamState::Open,
            };
            trace!("stream {} opened (end_stream={end_stream})", self.id);
            frame_builder::headers(self.id, flags, fragment.len())
        };
        self.continuing = !block_done;

        used.total += frame.len() + fragment.len();
        out.push(frame);
        out.push(fragment);
        used
    }

    fn produce_data_frame(
        &mut self,
        out: &mut Vec<ByteBuf>,
        limit: usize,
        data_credit: usize,
        mut used: TxBytes,
    ) -> TxBytes {
        let payload_len = limit
            .saturating_sub(used.total + FRAME_HEADER_LEN)
            .min(self.body_remaining)
            .min(self.send_window.available())
            .min(data_credit);
        if payload_len == 0 {
            return used;
        }

        let last = payload_len == self.body_remaining;
        let flags = if last {
            DataFlags::END_STREAM
        } else {
            DataFlags::empty()
        };
        let (mut frame, payload) = frame_builder::data(self.id, flags, payload_len);
        self.fill_payload(frame.span_mut(payload));

        self.body_remaining -= payload_len;
        self.send_window.consume(payload_len);
        used.data += payload_len;
        used.total += frame.len();
        out.push(frame);

        if last {
            self.state = match self.state {
                StreamState::HalfClosedRemote => StreamState::Closed,
                _ => StreamState::HalfClosedLocal,
            };
            trace!("stream {} request complete", self.id);
        }
        used
    }

    /// Copies body bytes into a DATA payload span, crossing slice
    /// boundaries as needed.
    fn fill_payload(&mut self, mut span: &mut [u8]) {
        while !span.is_empty() {
            let front = self.body.front().expect("body bytes accounted");
            let take = (front.len() - self.body_offset).min(span.len());
            span[..take].copy_from_slice(&front[self.body_offset..self.body_offset + take]);
            self.body_offset += take;
            if self.body_offset == front.len() {
                self.body.pop_front();
                self.body_offset = 0;
            }
            span = &mut span[take..];
        }
    }

    /// A whole DATA frame moved in from the transport; `payload` addresses
    /// the flow-controlled bytes inside it.
    pub fn on_data(
        &mut self,
        buf: ByteBuf,
        payload: Range<usize>,
        end_stream: bool,
    ) -> Result<(), ErrorCode> {
        if matches!(self.state, StreamState::HalfClosedRemote | StreamState::Closed) {
            return Err(ErrorCode::StreamClosed);
        }
        self.recv_window
            .consume(payload.len())
            .map_err(|_| ErrorCode::FlowControlError)?;
        if !payload.is_empty() {
            self.response.insert_body(buf, payload);
        }
        if end_stream {
            self.recv_end_stream();
        }
        Ok(())
    }

    /// A decoded header block (initial headers or trailers).
    pub fn on_headers(&mut self, fields: Vec<HeaderField>, end_stream: bool) -> Result<(), ErrorCode> {
        if self.state == StreamState::Closed {
            return Err(ErrorCode::StreamClosed);
        }
        self.response.insert_headers(fields.iter().map(|field| {
            (
                String::from_utf8_lossy(field.name()).into_owned(),
                String::from_utf8_lossy(field.value()).into_owned(),
            )
        }));
        if end_stream {
            self.recv_end_stream();
        }
        Ok(())
    }

    pub fn on_reset(&mut self, code: ErrorCode) {
        self.state = StreamState::Closed;
        self.finish(Err(Error::Reset(code)));
    }

    pub fn on_window_update(&mut self, increment: u32) -> Result<(), ErrorCode> {
        self.send_window
            .add(increment)
            .map_err(|_| ErrorCode::FlowControlError)
    }

    /// Retroactive SETTINGS_INITIAL_WINDOW_SIZE change.
    pub fn adjust_send_window(&mut self, delta: i64) -> Result<(), Error> {
        self.send_window.adjust(delta)
    }

    /// Local failure (timeout, connection teardown, stream error).
    pub fn fail(&mut self, error: Error) {
        self.state = StreamState::Closed;
        self.finish(Err(error));
    }

    fn recv_end_stream(&mut self) {
        self.state = match self.state {
            StreamState::HalfClosedLocal => StreamState::Closed,
            _ => StreamState::HalfClosedRemote,
        };
        trace!("stream {} response complete", self.id);
        let response = std::mem::take(&mut self.response);
        self.finish(Ok(response));
    }

    fn finish(&mut self, result: Result<Response, Error>) {
        if let Some(completion) = self.completion.take() {
            // the caller may have dropped the future; that is not an error
            completion.send(result).ok();
        }
    }
}
