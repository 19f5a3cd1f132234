//! The session engine: one driver task owns every piece of connection
//! state and multiplexes user requests over the transport. User-facing
//! calls post commands onto the driver's event channel and await oneshot
//! completions; a separate writer task keeps at most one transport write
//! in flight.

use crate::buffer::ByteBuf;
use crate::error::Error;
use crate::frame::FrameView;
use crate::frame_builder;
use crate::hpack;
use crate::registry::StreamRegistry;
use crate::request::Request;
use crate::response::Response;
use crate::settings::{Settings, SettingsManager, SETTINGS_SYNC_TIMEOUT};
use crate::stream::Stream;
use crate::types::*;
use crate::window::{RecvWindow, SendWindow};
use log::{debug, error, trace, warn};
use std::io::IoSlice;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};

/// Frame budget multiplier for one write batch: several streams get a
/// full-size frame each before the batch is handed to the transport.
const TX_FAIRNESS: usize = 4;

const RX_BUF_CAPACITY: usize = 16 * 1024 + FRAME_HEADER_LEN;

/// Upper bound on an assembled HEADERS + CONTINUATION block, against
/// CONTINUATION floods.
const MAX_HEADER_BLOCK: usize = 256 * 1024;

/// Invoked exactly once when the connection ends; `None` for a clean,
/// user-initiated close.
pub type ShutdownHook = Box<dyn FnOnce(Option<Error>) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Connecting,
    PrefaceSent,
    SettingsSyncing,
    Active,
    GoingAway,
    Closed,
}

pub(crate) enum Command {
    Send {
        request: Request,
        tx: oneshot::Sender<Result<Response, Error>>,
    },
    Ping {
        tx: oneshot::Sender<Result<(), Error>>,
    },
    UpdateSettings {
        settings: Settings,
        tx: oneshot::Sender<Result<(), Error>>,
    },
    Disconnect {
        tx: oneshot::Sender<()>,
    },
}

pub(crate) enum Event {
    Command(Command),
    WriteDone(std::io::Result<()>),
    SettingsTimeout(u64),
    StreamTimeout(StreamId),
}

/// Handle to a running HTTP/2 session. Cheap to clone; all clones talk to
/// the same connection.
#[derive(Clone)]
pub struct Session {
    events: mpsc::UnboundedSender<Event>,
}

impl Session {
    /// Establishes an HTTP/2 session over an already-connected transport
    /// (TLS with ALPN `h2` in production, an in-memory duplex in tests).
    /// Resolves once the SETTINGS handshake completes.
    pub async fn connect<T>(transport: T) -> Result<Self, Error>
    where
        T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        Self::connect_with(transport, Settings::local_default(), None).await
    }

    pub async fn connect_with<T>(
        transport: T,
        local: Settings,
        on_shutdown: Option<ShutdownHook>,
    ) -> Result<Self, Error>
    where
        T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let (read_half, write_half) = tokio::io::split(transport);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (batches_tx, batches_rx) = mpsc::channel(1);
        let (connect_tx, connect_rx) = oneshot::channel();

        tokio::spawn(write_loop(write_half, batches_rx, events_tx.clone()));

        let mut driver = Driver::new(events_tx.clone(), events_rx, batches_tx, on_shutdown);
        driver.sync_pending = Some(connect_tx);
        driver.start(local)?;
        tokio::spawn(driver.run(read_half));

        connect_rx.await.map_err(|_| Error::Closed)??;
        Ok(Self { events: events_tx })
    }

    /// Sends one request and resolves with its response.
    pub async fn send(&self, request: Request) -> Result<Response, Error> {
        let (tx, rx) = oneshot::channel();
        self.events
            .send(Event::Command(Command::Send { request, tx }))
            .map_err(|_| Error::Closed)?;
        rx.await.map_err(|_| Error::Closed)?
    }

    /// Round-trips a PING; at most one may be outstanding.
    pub async fn ping(&self) -> Result<(), Error> {
        let (tx, rx) = oneshot::channel();
        self.events
            .send(Event::Command(Command::Ping { tx }))
            .map_err(|_| Error::Closed)?;
        rx.await.map_err(|_| Error::Closed)?
    }

    /// Pushes a new local SETTINGS frame and resolves once the peer ACKs
    /// it. One synchronization may be pending at a time.
    pub async fn update_settings(&self, settings: Settings) -> Result<(), Error> {
        let (tx, rx) = oneshot::channel();
        self.events
            .send(Event::Command(Command::UpdateSettings { settings, tx }))
            .map_err(|_| Error::Closed)?;
        rx.await.map_err(|_| Error::Closed)?
    }

    /// Graceful shutdown: GOAWAY, drain, close. Resolves when the
    /// connection is fully down.
    pub async fn disconnect(&self) {
        let (tx, rx) = oneshot::channel();
        if self
            .events
            .send(Event::Command(Command::Disconnect { tx }))
            .is_err()
        {
            return;
        }
        rx.await.ok();
    }
}

/// An in-flight HEADERS + CONTINUATION block being reassembled.
struct PendingBlock {
    stream_id: StreamId,
    end_stream: bool,
    fragment: Vec<u8>,
}

struct Driver {
    events_tx: mpsc::UnboundedSender<Event>,
    events: mpsc::UnboundedReceiver<Event>,
    /// Capacity-1 channel to the writer; `None` once shutdown begins the
    /// final close (the writer exits when it drains).
    batches: Option<mpsc::Sender<Vec<ByteBuf>>>,
    write_in_flight: bool,

    phase: Phase,
    rx_buf: ByteBuf,
    rx_open: bool,
    pending_block: Option<PendingBlock>,

    encoder: hpack::Encoder,
    decoder: hpack::Decoder,
    settings: SettingsManager,
    registry: StreamRegistry,
    conn_send: SendWindow,
    conn_recv: RecvWindow,
    commands: std::collections::VecDeque<ByteBuf>,

    next_stream_id: StreamId,
    /// Highest peer-initiated stream processed; stays 0 for this client
    /// since push is rejected, and is what GOAWAY advertises.
    last_peer_stream: StreamId,
    ping_counter: u64,
    ping_pending: Option<oneshot::Sender<Result<(), Error>>>,
    sync_pending: Option<oneshot::Sender<Result<(), Error>>>,
    disconnect_waiters: Vec<oneshot::Sender<()>>,
    shutdown_hook: Option<ShutdownHook>,
    shutdown_cause: Option<Error>,
}

enum Step {
    Event(Option<Event>),
    Read(std::io::Result<usize>),
}

impl Driver {
    fn new(
        events_tx: mpsc::UnboundedSender<Event>,
        events: mpsc::UnboundedReceiver<Event>,
        batches: mpsc::Sender<Vec<ByteBuf>>,
        shutdown_hook: Option<ShutdownHook>,
    ) -> Self {
        Self {
            events_tx,
            events,
            batches: Some(batches),
            write_in_flight: false,
            phase: Phase::Connecting,
            rx_buf: ByteBuf::with_capacity(RX_BUF_CAPACITY),
            rx_open: true,
            pending_block: None,
            encoder: hpack::Encoder::new(),
            decoder: hpack::Decoder::new(),
            settings: SettingsManager::new(),
            registry: StreamRegistry::default(),
            conn_send: SendWindow::new(DEFAULT_WINDOW_SIZE),
            conn_recv: RecvWindow::new(DEFAULT_WINDOW_SIZE),
            commands: std::collections::VecDeque::new(),
            next_stream_id: 1,
            last_peer_stream: 0,
            ping_counter: 0,
            ping_pending: None,
            sync_pending: None,
            disconnect_waiters: Vec::new(),
            shutdown_hook,
            shutdown_cause: None,
        }
    }

    /// Queues the preface and initial SETTINGS and arms the sync timer.
    fn start(&mut self, local: Settings) -> Result<(), Error> {
        self.decoder = hpack::Decoder::with_capacity(local.header_table_size() as usize);
        self.push_command(ByteBuf::from_slice(PREFACE));
        self.phase = Phase::PrefaceSent;

        let (frame, epoch) = self.settings.begin(local, true)?;
        self.push_command(frame);
        self.phase = Phase::SettingsSyncing;
        self.spawn_settings_timer(epoch);
        Ok(())
    }

    async fn run<R>(mut self, mut read_half: R)
    where
        R: AsyncRead + Send + Unpin,
    {
        loop {
            self.init_write();
            if self.phase == Phase::Closed {
                break;
            }
            self.ensure_rx_capacity();

            let rx_open = self.rx_open;
            let step = {
                let Self { events, rx_buf, .. } = &mut self;
                tokio::select! {
                    maybe = events.recv() => Step::Event(maybe),
                    result = read_half.read(rx_buf.writable()), if rx_open => Step::Read(result),
                }
            };

            match step {
                Step::Event(None) => break,
                Step::Event(Some(event)) => self.on_event(event),
                Step::Read(Ok(0)) => {
                    self.rx_open = false;
                    self.initiate_shutdown(Some(Error::Closed));
                }
                Step::Read(Ok(count)) => {
                    self.rx_buf.commit(count);
                    if let Err(err) = self.process_frames() {
                        error!("receive path failed: {err}");
                        self.initiate_shutdown(Some(err));
                    }
                }
                Step::Read(Err(err)) => {
                    self.rx_open = false;
                    if self.phase != Phase::GoingAway {
                        self.initiate_shutdown(Some(Error::Io(err)));
                    }
                }
            }
        }
    }

    fn on_event(&mut self, event: Event) {
        match event {
            Event::Command(command) => self.on_command(command),
            Event::WriteDone(Ok(())) => {
                self.write_in_flight = false;
            }
            Event::WriteDone(Err(err)) => {
                self.write_in_flight = false;
                debug!("transport write failed: {err}");
                if self.shutdown_cause.is_none() {
                    self.shutdown_cause = Some(Error::Io(err));
                }
                self.phase = Phase::GoingAway;
                self.finish_close();
            }
            Event::SettingsTimeout(epoch) => {
                if self.settings.on_timer(epoch) {
                    warn!("settings synchronization timed out");
                    self.initiate_shutdown(Some(Error::SettingsTimeout));
                }
            }
            Event::StreamTimeout(id) => self.on_stream_timeout(id),
        }
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::Send { request, tx } => {
                if self.phase != Phase::Active {
                    tx.send(Err(Error::NotConnected)).ok();
                    return;
                }
                if let Err(err) = request.check_valid() {
                    tx.send(Err(err)).ok();
                    return;
                }
                let limit = self.settings.remote().max_concurrent_streams();
                if self.registry.len() as u64 >= u64::from(limit) {
                    tx.send(Err(Error::StreamLimit)).ok();
                    return;
                }

                let id = self.next_stream_id;
                self.next_stream_id += 2;
                let stream = Stream::new(
                    id,
                    self.settings.remote().initial_window_size(),
                    self.settings.local().initial_window_size(),
                    &request,
                    tx,
                );
                trace!("stream {id}: {} {}", request.method, request.url);
                self.spawn_stream_timer(id, stream.timeout());
                self.registry.insert(stream);
            }
            Command::Ping { tx } => {
                if self.phase != Phase::Active {
                    tx.send(Err(Error::NotConnected)).ok();
                    return;
                }
                if self.ping_pending.is_some() {
                    tx.send(Err(Error::Busy)).ok();
                    return;
                }
                self.ping_counter += 1;
                self.ping_pending = Some(tx);
                self.push_command(frame_builder::ping(self.ping_counter.to_be_bytes(), false));
            }
            Command::UpdateSettings { settings, tx } => {
                if self.phase != Phase::Active {
                    tx.send(Err(Error::NotConnected)).ok();
                    return;
                }
                if self.sync_pending.is_some() {
                    tx.send(Err(Error::Busy)).ok();
                    return;
                }
                match self.settings.begin(settings, false) {
                    Ok((frame, epoch)) => {
                        // the peer's size updates are now bounded by the
                        // table size we just advertised
                        self.decoder
                            .set_max_capacity(self.settings.local().header_table_size() as usize);
                        self.sync_pending = Some(tx);
                        self.push_command(frame);
                        self.spawn_settings_timer(epoch);
                    }
                    Err(err) => {
                        tx.send(Err(err)).ok();
                    }
                }
            }
            Command::Disconnect { tx } => {
                self.disconnect_waiters.push(tx);
                self.initiate_shutdown(None);
            }
        }
    }

    fn on_stream_timeout(&mut self, id: StreamId) {
        let Some(stream) = self.registry.get_mut(id) else {
            return;
        };
        if stream.is_continuing() {
            self.abort_header_block(id);
            return;
        }
        warn!("stream {id} timed out");
        stream.fail(Error::Timeout);
        self.registry.remove(id);
        self.push_command(frame_builder::rst_stream(id, ErrorCode::Cancel));
    }

    // ---- receive path -----------------------------------------------

    fn process_frames(&mut self) -> Result<(), Error> {
        let mut rx = std::mem::take(&mut self.rx_buf);
        let result = self.parse_frames(&mut rx);
        if self.rx_buf.capacity() == 0 {
            self.rx_buf = rx;
        }
        result
    }

    fn parse_frames(&mut self, rx: &mut ByteBuf) -> Result<(), Error> {
        let max_frame_size = self.settings.local().max_frame_size() as usize;
        let mut used = 0;

        loop {
            let readable = &rx.readable()[used..];
            let Some(view) = FrameView::parse(readable) else {
                break;
            };
            view.validate(max_frame_size)?;

            if !view.complete() {
                let frame_len = view.frame_len();
                if rx.capacity() < frame_len {
                    // the frame is bigger than the buffer; regrow around it
                    let mut grown = ByteBuf::with_capacity(frame_len);
                    grown.commit_slice(readable);
                    *rx = grown;
                    used = 0;
                }
                break;
            }

            let frame_len = view.frame_len();
            let is_data = view.header().frame_type() == Some(FrameType::Data);
            drop(view);

            if is_data {
                if used == 0 && rx.len() == frame_len {
                    // the buffer holds exactly this frame: move it whole
                    let whole = std::mem::take(rx);
                    self.rx_buf = ByteBuf::with_capacity(RX_BUF_CAPACITY);
                    self.on_data_frame(whole)?;
                    return Ok(());
                }
                let mut copy = ByteBuf::with_capacity(frame_len);
                copy.commit_slice(&rx.readable()[used..used + frame_len]);
                self.on_data_frame(copy)?;
            } else {
                self.on_frame(used, rx)?;
            }
            used += frame_len;
        }

        rx.consume(used);
        Ok(())
    }

    /// A DATA frame in its own buffer, moved into the stream untouched.
    fn on_data_frame(&mut self, buf: ByteBuf) -> Result<(), Error> {
        if self.pending_block.is_some() {
            return Err(Error::conn(
                ErrorCode::ProtocolError,
                "DATA inside a header block",
            ));
        }
        let (stream_id, end_stream, payload) = {
            let view = FrameView::parse(buf.readable())
                .ok_or_else(|| Error::conn(ErrorCode::InternalError, "truncated DATA frame"))?;
            (
                view.header().stream_id,
                view.end_stream(),
                view.data_payload_range()?,
            )
        };

        self.conn_recv.consume(payload.len())?;
        if let Some(increment) = self.conn_recv.replenish() {
            self.push_command(frame_builder::window_update(0, increment));
        }

        self.with_stream(stream_id, move |stream| {
            stream.on_data(buf, payload, end_stream)
        });
        Ok(())
    }

    /// Any complete non-DATA frame, parsed in place inside the rx buffer.
    fn on_frame(&mut self, offset: usize, rx: &ByteBuf) -> Result<(), Error> {
        let view = FrameView::parse(&rx.readable()[offset..])
            .ok_or_else(|| Error::conn(ErrorCode::InternalError, "truncated frame"))?;
        let typ = view
            .header()
            .frame_type()
            .ok_or_else(|| Error::conn(ErrorCode::ProtocolError, "unknown frame type"))?;

        if self.pending_block.is_some() && typ != FrameType::Continuation {
            return Err(Error::conn(
                ErrorCode::ProtocolError,
                "interleaved frame inside a header block",
            ));
        }

        match typ {
            FrameType::Headers => self.on_headers(&view),
            FrameType::Continuation => self.on_continuation(&view),
            FrameType::Settings => self.on_settings(&view),
            FrameType::Ping => {
                if view.is_ack() {
                    if let Some(tx) = self.ping_pending.take() {
                        tx.send(Ok(())).ok();
                    }
                } else {
                    self.push_command(frame_builder::ping(view.ping_payload(), true));
                }
                Ok(())
            }
            FrameType::GoAway => {
                let code = view.goaway_error();
                let debug_data = view.goaway_debug();
                error!("peer sent GOAWAY: {code:?}");
                if !debug_data.is_empty() {
                    debug!("GOAWAY debug: {}", String::from_utf8_lossy(debug_data));
                }
                let cause = (code != ErrorCode::NoError)
                    .then(|| Error::conn(code, "peer closed the connection"));
                self.initiate_shutdown(cause);
                Ok(())
            }
            FrameType::WindowUpdate => self.on_window_update(&view),
            FrameType::ResetStream => {
                let code = view.rst_error();
                let stream_id = view.header().stream_id;
                self.with_stream(stream_id, |stream| {
                    stream.on_reset(code);
                    Ok(())
                });
                Ok(())
            }
            // accepted, validated, deliberately not acted upon
            FrameType::Priority => Ok(()),
            // validate() rejects these before dispatch
            FrameType::Data | FrameType::PushPromise => Err(Error::conn(
                ErrorCode::InternalError,
                "unreachable frame dispatch",
            )),
        }
    }

    fn on_headers(&mut self, view: &FrameView<'_>) -> Result<(), Error> {
        let stream_id = view.header().stream_id;
        let end_stream = view.end_stream();
        let block = view.header_block()?;

        if view.end_headers() {
            let fields = self.decoder.decode(block)?;
            self.with_stream(stream_id, |stream| stream.on_headers(fields, end_stream));
        } else {
            if block.len() > MAX_HEADER_BLOCK {
                return Err(Error::conn(
                    ErrorCode::EnhanceYourCalm,
                    "header block too large",
                ));
            }
            self.pending_block = Some(PendingBlock {
                stream_id,
                end_stream,
                fragment: block.to_vec(),
            });
        }
        Ok(())
    }

    fn on_continuation(&mut self, view: &FrameView<'_>) -> Result<(), Error> {
        let stream_id = view.header().stream_id;
        let Some(pending) = self.pending_block.as_mut() else {
            return Err(Error::conn(
                ErrorCode::ProtocolError,
                "CONTINUATION without preceding HEADERS",
            ));
        };
        if pending.stream_id != stream_id {
            return Err(Error::conn(
                ErrorCode::ProtocolError,
                "CONTINUATION on the wrong stream",
            ));
        }
        let block = view.header_block()?;
        if pending.fragment.len() + block.len() > MAX_HEADER_BLOCK {
            return Err(Error::conn(
                ErrorCode::EnhanceYourCalm,
                "header block too large",
            ));
        }
        pending.fragment.extend_from_slice(block);

        if view.end_headers() {
            let pending = self.pending_block.take().expect("checked above");
            let fields = self.decoder.decode(&pending.fragment)?;
            self.with_stream(pending.stream_id, |stream| {
                stream.on_headers(fields, pending.end_stream)
            });
        }
        Ok(())
    }

    fn on_settings(&mut self, view: &FrameView<'_>) -> Result<(), Error> {
        let outcome = self.settings.on_frame(view)?;
        if let Some(ack) = outcome.ack {
            self.push_command(ack);
        }
        if let Some(delta) = outcome.window_delta {
            self.registry.apply_window_delta(delta)?;
        }
        if !view.is_ack() {
            // our encoder may not exceed the table the peer's decoder keeps
            let remote_table = self.settings.remote().header_table_size() as usize;
            if remote_table < self.encoder.table().dynamic().capacity() {
                self.encoder.set_capacity(remote_table);
            }
        }
        if outcome.completed {
            self.on_settings_synced();
        }
        Ok(())
    }

    fn on_window_update(&mut self, view: &FrameView<'_>) -> Result<(), Error> {
        let stream_id = view.header().stream_id;
        let increment = view.window_increment();
        if stream_id == 0 {
            if increment == 0 {
                return Err(Error::conn(
                    ErrorCode::ProtocolError,
                    "zero connection window increment",
                ));
            }
            self.conn_send.add(increment)?;
            self.registry.reschedule_all();
        } else {
            self.with_stream(stream_id, |stream| {
                if increment == 0 {
                    return Err(ErrorCode::ProtocolError);
                }
                stream.on_window_update(increment)
            });
        }
        Ok(())
    }

    /// A SETTINGS exchange completed: widen the connection receive window
    /// for the stream parallelism we advertised and go (or stay) active.
    /// The window only ever grows here, since the peer still holds the
    /// credit a previous capacity extended.
    fn on_settings_synced(&mut self) {
        let local = self.settings.local();
        let target = u64::from(local.initial_window_size()) * u64::from(local.max_concurrent_streams());
        let capacity = u32::try_from(target)
            .unwrap_or(MAX_WINDOW_SIZE)
            .min(MAX_WINDOW_SIZE);
        if capacity > self.conn_recv.capacity() {
            let increment = capacity - self.conn_recv.current();
            self.conn_recv = RecvWindow::with_threshold(capacity, capacity / 2);
            self.push_command(frame_builder::window_update(0, increment));
        }

        self.phase = Phase::Active;
        debug!("settings synchronized, session active");
        if let Some(tx) = self.sync_pending.take() {
            tx.send(Ok(())).ok();
        }
    }

    /// Runs a handler against one stream, then sweeps it: closed streams
    /// leave the registry, productive ones get rescheduled, and a
    /// stream-scoped error turns into RST_STREAM without touching the
    /// connection.
    fn with_stream<F>(&mut self, id: StreamId, handler: F)
    where
        F: FnOnce(&mut Stream) -> Result<(), ErrorCode>,
    {
        let Some(stream) = self.registry.get_mut(id) else {
            trace!("frame for unknown stream {id}");
            return;
        };
        match handler(stream) {
            Ok(()) => {
                if stream.is_closed() {
                    let continuing = stream.is_continuing();
                    self.registry.remove(id);
                    if continuing {
                        self.abort_header_block(id);
                    }
                } else {
                    self.registry.enqueue(id);
                }
            }
            Err(code) => {
                warn!("stream {id} failed: {code:?}");
                let continuing = stream.is_continuing();
                stream.fail(Error::Stream(code));
                self.registry.remove(id);
                if continuing {
                    self.abort_header_block(id);
                    return;
                }
                self.push_command(frame_builder::rst_stream(id, code));
            }
        }
    }

    /// A stream died between its HEADERS and END_HEADERS. The fragments
    /// already chosen cannot be unpicked from the shared encoder state, so
    /// the only sound exit is tearing the connection down.
    fn abort_header_block(&mut self, id: StreamId) {
        warn!("stream {id} terminated inside an outgoing header block");
        self.initiate_shutdown(Some(Error::conn(
            ErrorCode::InternalError,
            "stream terminated inside a header block",
        )));
    }

    // ---- send path --------------------------------------------------

    fn push_command(&mut self, frame: ByteBuf) {
        self.commands.push_back(frame);
    }

    /// Single-fire write arming: hand the writer a batch only when no
    /// write is in flight and there is something to send.
    fn init_write(&mut self) {
        if self.write_in_flight || self.phase == Phase::Connecting {
            return;
        }
        let batch = self.collect_tx();
        if batch.is_empty() {
            if self.phase == Phase::GoingAway {
                self.finish_close();
            }
            return;
        }
        let Some(batches) = self.batches.as_ref() else {
            return;
        };
        // capacity 1 and single-fire make this send infallible
        if batches.try_send(batch).is_ok() {
            self.write_in_flight = true;
        }
    }

    /// One write batch: command frames first, then scheduled streams.
    /// When a header block is mid-flight its CONTINUATIONs preempt
    /// everything, commands included.
    fn collect_tx(&mut self) -> Vec<ByteBuf> {
        let mut out = Vec::new();
        let pinned = self.registry.is_pinned();
        if !pinned {
            out.extend(self.commands.drain(..));
        }

        let frame_limit =
            self.settings.remote().max_frame_size() as usize + FRAME_HEADER_LEN;
        let budget = frame_limit * TX_FAIRNESS;
        let credit = self.conn_send.available();
        let produced = self
            .registry
            .drain(&mut out, &mut self.encoder, budget, frame_limit, credit);
        self.conn_send.consume(produced.data);

        if pinned && !self.registry.is_pinned() {
            out.extend(self.commands.drain(..));
        }
        out
    }

    // ---- lifecycle --------------------------------------------------

    fn initiate_shutdown(&mut self, cause: Option<Error>) {
        match self.phase {
            Phase::Closed => {
                self.resolve_disconnects();
                return;
            }
            Phase::GoingAway => return,
            _ => {}
        }
        self.phase = Phase::GoingAway;

        if self.settings.cancel() {
            if let Some(tx) = self.sync_pending.take() {
                let err = cause
                    .as_ref()
                    .map_or(Error::Cancelled, Error::replicate);
                tx.send(Err(err)).ok();
            }
        }

        let code = cause.as_ref().map_or(ErrorCode::NoError, Error::wire_code);
        debug!("shutting down: {code:?}");
        self.shutdown_cause = cause;
        self.push_command(frame_builder::goaway(code, self.last_peer_stream, b""));
    }

    /// Outbound queue fully drained (or the transport died): tear
    /// everything down and fire the continuations exactly once.
    fn finish_close(&mut self) {
        if self.phase == Phase::Closed {
            return;
        }
        self.phase = Phase::Closed;
        // writer exits once the channel drains, then shuts the socket down
        self.batches.take();

        let cause = self.shutdown_cause.take();
        let stream_error = cause.as_ref().map_or(Error::Cancelled, Error::replicate);
        self.registry.fail_all(&stream_error);

        if let Some(tx) = self.ping_pending.take() {
            tx.send(Err(Error::Closed)).ok();
        }
        if let Some(tx) = self.sync_pending.take() {
            tx.send(Err(cause.as_ref().map_or(Error::Closed, Error::replicate)))
                .ok();
        }
        self.resolve_disconnects();
        if let Some(hook) = self.shutdown_hook.take() {
            hook(cause);
        }
        debug!("session closed");
    }

    fn resolve_disconnects(&mut self) {
        for tx in self.disconnect_waiters.drain(..) {
            tx.send(()).ok();
        }
    }

    fn ensure_rx_capacity(&mut self) {
        if self.rx_buf.capacity() == 0 {
            self.rx_buf = ByteBuf::with_capacity(RX_BUF_CAPACITY);
        } else if self.rx_buf.writable().is_empty() {
            let mut grown = ByteBuf::with_capacity(self.rx_buf.capacity() * 2);
            grown.commit_slice(self.rx_buf.readable());
            self.rx_buf = grown;
        }
    }

    fn spawn_settings_timer(&self, epoch: u64) {
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(SETTINGS_SYNC_TIMEOUT).await;
            events.send(Event::SettingsTimeout(epoch)).ok();
        });
    }

    fn spawn_stream_timer(&self, id: StreamId, timeout: Duration) {
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            events.send(Event::StreamTimeout(id)).ok();
        });
    }
}

/// Writer task: one batch at a time, scatter-gathered to the transport.
async fn write_loop<W>(
    mut write_half: W,
    mut batches: mpsc::Receiver<Vec<ByteBuf>>,
    events: mpsc::UnboundedSender<Event>,
) where
    W: AsyncWrite + Send + Unpin,
{
    while let Some(batch) = batches.recv().await {
        let result = write_vectored_all(&mut write_half, &batch).await;
        let failed = result.is_err();
        if events.send(Event::WriteDone(result)).is_err() || failed {
            break;
        }
    }
    write_half.shutdown().await.ok();
}

async fn write_vectored_all<W>(write_half: &mut W, batch: &[ByteBuf]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut index = 0;
    let mut offset = 0;
    loop {
        while index < batch.len() && offset >= batch[index].len() {
            index += 1;
            offset = 0;
        }
        if index == batch.len() {
            break;
        }

        let slices: Vec<IoSlice<'_>> =
            std::iter::once(IoSlice::new(&batch[index].readable()[offset..]))
                .chain(
                    batch[index + 1..]
                        .iter()
                        .filter(|buf| !buf.is_empty())
                        .map(|buf| IoSlice::new(buf.readable())),
                )
                .collect();
        let mut written = write_half.write_vectored(&slices).await?;
        if written == 0 {
            return Err(std::io::ErrorKind::WriteZero.into());
        }
        while written > 0 && index < batch.len() {
            let remaining = batch[index].len() - offset;
            if written >= remaining {
                written -= remaining;
                index += 1;
                offset = 0;
            } else {
                offset += written;
                written = 0;
            }
        }
    }
    write_half.flush().await
}
