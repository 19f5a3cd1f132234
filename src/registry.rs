//! Stream registry and round-robin TX scheduler. The map owns every
//! stream; the FIFO holds ids only, so there is no shared ownership to
//! manage. A stream with an unfinished header block pins the scheduler
//! until its END_HEADERS goes out, keeping header blocks contiguous on the
//! wire.

use crate::buffer::ByteBuf;
use crate::error::Error;
use crate::hpack::Encoder;
use crate::stream::{Stream, TxBytes};
use crate::types::{StreamId, FRAME_HEADER_LEN};
use log::trace;
use std::collections::{HashMap, VecDeque};

/// Smallest budget a scheduling round can use: one frame header plus one
/// payload byte.
pub(crate) const MIN_TX_BUDGET: usize = FRAME_HEADER_LEN + 1;

#[derive(Default)]
pub(crate) struct StreamRegistry {
    streams: HashMap<StreamId, Stream>,
    queue: VecDeque<StreamId>,
    /// Stream owed CONTINUATION frames; nothing else may be written first.
    pinned: Option<StreamId>,
}

impl StreamRegistry {
    #[must_use]
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    #[must_use]
    pub fn is_pinned(&self) -> bool {
        self.pinned.is_some()
    }

    pub fn insert(&mut self, stream: Stream) {
        let id = stream.id();
        self.streams.insert(id, stream);
        self.enqueue(id);
    }

    pub fn get_mut(&mut self, id: StreamId) -> Option<&mut Stream> {
        self.streams.get_mut(&id)
    }

    pub fn remove(&mut self, id: StreamId) -> Option<Stream> {
        if self.pinned == Some(id) {
            self.pinned = None;
        }
        self.streams.remove(&id)
    }

    /// Schedules the stream for the next TX round if it has work and is
    /// not already queued.
    pub fn enqueue(&mut self, id: StreamId) {
        if let Some(stream) = self.streams.get_mut(&id) {
            if !stream.scheduled && stream.has_tx_data() {
                stream.scheduled = true;
                self.queue.push_back(id);
            }
        }
    }

    /// Whether a drain could produce anything.
    #[must_use]
    pub fn has_tx_data(&self) -> bool {
        self.pinned.is_some() || !self.queue.is_empty()
    }

    /// Puts every stream that can progress back on the queue; called when
    /// connection-level send credit returns.
    pub fn reschedule_all(&mut self) {
        let ids: Vec<StreamId> = self.streams.keys().copied().collect();
        for id in ids {
            self.enqueue(id);
        }
    }

    /// Applies an INITIAL_WINDOW_SIZE delta to every live stream.
    pub fn apply_window_delta(&mut self, delta: i64) -> Result<(), Error> {
        for stream in self.streams.values_mut() {
            stream.adjust_send_window(delta)?;
        }
        self.reschedule_all();
        Ok(())
    }

    /// One scheduling round: serves a pinned continuation to completion
    /// first, then round-robins the FIFO. `limit` bounds total bytes,
    /// `frame_limit` bounds one stream's turn (peer MAX_FRAME_SIZE plus
    /// header), `data_credit` bounds flow-controlled DATA bytes.
    pub fn drain(
        &mut self,
        out: &mut Vec<ByteBuf>,
        encoder: &mut Encoder,
        mut limit: usize,
        frame_limit: usize,
        mut data_credit: usize,
    ) -> TxBytes {
        let mut produced = TxBytes::default();
        let mut carry: Vec<StreamId> = Vec::new();

        loop {
            if limit < MIN_TX_BUDGET {
                break;
            }

            let id = match self.pinned.or_else(|| self.queue.pop_front()) {
                Some(id) => id,
                None => break,
            };
            let Some(stream) = self.streams.get_mut(&id) else {
                // closed and removed while queued
                if self.pinned == Some(id) {
                    self.pinned = None;
                }
                continue;
            };

            let was_pinned = self.pinned == Some(id);
            if !was_pinned && !stream.has_tx_data() {
                stream.scheduled = false;
                continue;
            }

            let bytes = stream.produce_tx(out, encoder, limit.min(frame_limit), data_credit);
            limit -= bytes.total.min(limit);
            data_credit -= bytes.data;
            produced.total += bytes.total;
            produced.data += bytes.data;

            if stream.is_continuing() {
                self.pinned = Some(id);
                if bytes.total == 0 {
                    // budget exhausted mid-block; everything else waits
                    break;
                }
                continue;
            }
            if self.pinned == Some(id) {
                self.pinned = None;
            }

            if stream.is_closed() {
                trace!("stream {id} closed, dropping from registry");
                self.streams.remove(&id);
            } else if stream.has_tx_data() {
                carry.push(id);
            }
        }

        for id in carry {
            if let Some(stream) = self.streams.get_mut(&id) {
                if !stream.scheduled {
                    stream.scheduled = true;
                    self.queue.push_back(id);
                }
            }
        }
        produced
    }

    /// Fails every stream with a copy of `error` and empties the registry.
    pub fn fail_all(&mut self, error: &Error) {
        for (_, mut stream) in self.streams.drain() {
            stream.fail(error.replicate());
        }
        self.queue.clear();
        self.pinned = None;
    }
}
