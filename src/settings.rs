//! SETTINGS state plus the synchronization handshake of RFC 7540 §6.5.3:
//! our SETTINGS must be acknowledged and (on connect) the peer's SETTINGS
//! must arrive, all within a deadline.

use crate::buffer::ByteBuf;
use crate::error::Error;
use crate::frame::FrameView;
use crate::frame_builder;
use crate::types::*;
use enum_map::{enum_map, EnumMap};
use log::trace;
use std::time::Duration;

pub const SETTINGS_SYNC_TIMEOUT: Duration = Duration::from_secs(5);

/// One endpoint's settings with named accessors over the raw parameter map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings(EnumMap<SettingsParameter, u32>);

impl Settings {
    /// The values this client advertises: push disabled, a bounded number
    /// of concurrent streams.
    #[must_use]
    pub fn local_default() -> Self {
        Self(enum_map! {
            SettingsParameter::HeaderTableSize => 4096,
            SettingsParameter::EnablePush => 0,
            SettingsParameter::MaxConcurrentStreams => 100,
            SettingsParameter::InitialWindowSize => DEFAULT_WINDOW_SIZE,
            SettingsParameter::MaxFrameSize => DEFAULT_MAX_FRAME_SIZE,
            SettingsParameter::MaxHeaderListSize => u32::MAX,
            SettingsParameter::EnableConnectProtocol => 0,
        })
    }

    /// RFC defaults assumed for the peer until its SETTINGS arrive.
    #[must_use]
    pub fn remote_default() -> Self {
        Self(enum_map! {
            SettingsParameter::HeaderTableSize => 4096,
            SettingsParameter::EnablePush => 1,
            SettingsParameter::MaxConcurrentStreams => u32::MAX,
            SettingsParameter::InitialWindowSize => DEFAULT_WINDOW_SIZE,
            SettingsParameter::MaxFrameSize => DEFAULT_MAX_FRAME_SIZE,
            SettingsParameter::MaxHeaderListSize => u32::MAX,
            SettingsParameter::EnableConnectProtocol => 0,
        })
    }

    #[must_use]
    pub fn get(&self, param: SettingsParameter) -> u32 {
        self.0[param]
    }

    pub fn set(&mut self, param: SettingsParameter, value: u32) {
        self.0[param] = value;
    }

    #[must_use]
    pub fn header_table_size(&self) -> u32 {
        self.0[SettingsParameter::HeaderTableSize]
    }

    #[must_use]
    pub fn max_concurrent_streams(&self) -> u32 {
        self.0[SettingsParameter::MaxConcurrentStreams]
    }

    #[must_use]
    pub fn initial_window_size(&self) -> u32 {
        self.0[SettingsParameter::InitialWindowSize]
    }

    #[must_use]
    pub fn max_frame_size(&self) -> u32 {
        self.0[SettingsParameter::MaxFrameSize]
    }

    /// The six RFC 7540 parameters, in identifier order, for the wire.
    #[must_use]
    pub fn items(&self) -> Vec<(SettingsParameter, u32)> {
        [
            SettingsParameter::HeaderTableSize,
            SettingsParameter::EnablePush,
            SettingsParameter::MaxConcurrentStreams,
            SettingsParameter::InitialWindowSize,
            SettingsParameter::MaxFrameSize,
            SettingsParameter::MaxHeaderListSize,
        ]
        .into_iter()
        .map(|param| (param, self.0[param]))
        .collect()
    }

    /// Overwrites parameters from a received SETTINGS frame, validating
    /// each value. Returns the send-window delta when the peer changed
    /// INITIAL_WINDOW_SIZE.
    pub fn apply(&mut self, items: &[(SettingsParameter, u32)]) -> Result<Option<i64>, Error> {
        let mut window_delta = None;
        for &(param, value) in items {
            match param {
                SettingsParameter::EnablePush if value > 1 => {
                    return Err(Error::conn(
                        ErrorCode::ProtocolError,
                        "ENABLE_PUSH must be 0 or 1",
                    ));
                }
                SettingsParameter::InitialWindowSize if value > MAX_WINDOW_SIZE => {
                    return Err(Error::conn(
                        ErrorCode::FlowControlError,
                        "INITIAL_WINDOW_SIZE exceeds 2^31-1",
                    ));
                }
                SettingsParameter::MaxFrameSize
                    if !(DEFAULT_MAX_FRAME_SIZE..=MAX_FRAME_SIZE_LIMIT).contains(&value) =>
                {
                    return Err(Error::conn(
                        ErrorCode::ProtocolError,
                        "MAX_FRAME_SIZE out of range",
                    ));
                }
                SettingsParameter::InitialWindowSize => {
                    let old = i64::from(self.0[param]);
                    window_delta = Some(i64::from(value) - old);
                }
                _ => {}
            }
            self.0[param] = value;
        }
        Ok(window_delta)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::local_default()
    }
}

/// What a received SETTINGS frame requires of the session.
#[derive(Debug, Default)]
pub struct SettingsOutcome {
    /// SETTINGS_ACK to enqueue, for a non-ACK frame.
    pub ack: Option<ByteBuf>,
    /// Retroactive send-window adjustment for every live stream.
    pub window_delta: Option<i64>,
    /// The pending synchronization finished with this frame.
    pub completed: bool,
}

/// Tracks one in-flight settings exchange; a second `begin` while one is
/// pending is refused.
#[derive(Debug)]
pub struct SettingsManager {
    local: Settings,
    remote: Settings,
    syncing: bool,
    need_remote: bool,
    local_acked: bool,
    remote_seen: bool,
    /// Distinguishes the current sync's timer from stale ones.
    epoch: u64,
}

impl SettingsManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            local: Settings::local_default(),
            remote: Settings::remote_default(),
            syncing: false,
            need_remote: false,
            local_acked: false,
            remote_seen: false,
            epoch: 0,
        }
    }

    #[must_use]
    pub fn local(&self) -> &Settings {
        &self.local
    }

    #[must_use]
    pub fn remote(&self) -> &Settings {
        &self.remote
    }

    #[must_use]
    pub fn is_syncing(&self) -> bool {
        self.syncing
    }

    /// Starts a synchronization: installs `local`, returns the SETTINGS
    /// frame to send and the timer epoch to arm. `require_remote` demands
    /// the peer's own SETTINGS as well (first exchange on a connection).
    pub fn begin(&mut self, local: Settings, require_remote: bool) -> Result<(ByteBuf, u64), Error> {
        if self.syncing {
            return Err(Error::Busy);
        }
        self.local = local;
        self.syncing = true;
        self.need_remote = require_remote;
        self.local_acked = false;
        self.remote_seen = !require_remote;
        self.epoch += 1;

        Ok((frame_builder::settings(&self.local.items()), self.epoch))
    }

    /// Handles a validated SETTINGS frame (ACK or not).
    pub fn on_frame(&mut self, view: &FrameView<'_>) -> Result<SettingsOutcome, Error> {
        let mut outcome = SettingsOutcome::default();

        if view.is_ack() {
            trace!("local settings acknowledged");
            self.local_acked = true;
        } else {
            let items = view.settings_items();
            outcome.window_delta = self.remote.apply(&items)?;
            trace!("remote settings updated: {:?}", items);
            self.remote_seen = true;
            outcome.ack = Some(frame_builder::settings_ack());
        }

        if self.syncing && self.local_acked && self.remote_seen {
            self.syncing = false;
            outcome.completed = true;
        }
        Ok(outcome)
    }

    /// A timer with this epoch fired; true when it ends the pending sync.
    pub fn on_timer(&mut self, epoch: u64) -> bool {
        if self.syncing && epoch == self.epoch {
            self.syncing = false;
            return true;
        }
        false
    }

    /// Abandons a pending sync (connection going down). True when one was
    /// in fact pending.
    pub fn cancel(&mut self) -> bool {
        let was_syncing = self.syncing;
        self.syncing = false;
        was_syncing
    }
}

impl Default for SettingsManager {
    fn default() -> Self {
        Self::new()
    }
}
