//! Flow-control accounting (RFC 7540 §5.2). Only DATA payload bytes move
//! these counters; frame headers and control frames are free.

use crate::error::Error;
use crate::types::{ErrorCode, MAX_WINDOW_SIZE};

/// Receive-side credit we have extended to the peer, replenished in bulk
/// once the consumed share crosses a threshold.
#[derive(Debug, Clone)]
pub struct RecvWindow {
    capacity: u32,
    current: u32,
    threshold: u32,
}

impl RecvWindow {
    /// Default replenish trigger: a quarter of the window consumed.
    #[must_use]
    pub fn new(capacity: u32) -> Self {
        Self::with_threshold(capacity, capacity / 4)
    }

    #[must_use]
    pub fn with_threshold(capacity: u32, threshold: u32) -> Self {
        Self {
            capacity,
            current: capacity,
            threshold,
        }
    }

    #[must_use]
    pub fn current(&self) -> u32 {
        self.current
    }

    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Accounts for received payload bytes. The peer overrunning the credit
    /// we extended is a flow-control violation.
    pub fn consume(&mut self, count: usize) -> Result<(), Error> {
        let count = u32::try_from(count).map_err(|_| underflow())?;
        self.current = self.current.checked_sub(count).ok_or_else(underflow)?;
        Ok(())
    }

    /// Whether [`replenish`](Self::replenish) would emit an update now.
    #[must_use]
    pub fn update_pending(&self) -> bool {
        let deficit = self.capacity - self.current;
        deficit > 0 && deficit >= self.threshold
    }

    /// Once enough credit is consumed, returns the exact deficit to put in
    /// a WINDOW_UPDATE and restores the window to capacity.
    pub fn replenish(&mut self) -> Option<u32> {
        if !self.update_pending() {
            return None;
        }
        let deficit = self.capacity - self.current;
        self.current = self.capacity;
        Some(deficit)
    }
}

fn underflow() -> Error {
    Error::conn(ErrorCode::FlowControlError, "receive window underflow")
}

/// Send-side credit granted by the peer. Signed: a retroactive
/// INITIAL_WINDOW_SIZE change may push it below zero, after which the
/// scheduler simply defers emission until WINDOW_UPDATEs arrive.
#[derive(Debug, Clone)]
pub struct SendWindow {
    current: i64,
}

impl SendWindow {
    #[must_use]
    pub fn new(initial: u32) -> Self {
        Self {
            current: i64::from(initial),
        }
    }

    /// Credit usable right now.
    #[must_use]
    pub fn available(&self) -> usize {
        usize::try_from(self.current).unwrap_or(0)
    }

    #[must_use]
    pub fn current(&self) -> i64 {
        self.current
    }

    /// Spends credit for emitted DATA payload bytes. Callers never emit
    /// beyond `available`, so this cannot underflow.
    pub fn consume(&mut self, count: usize) {
        debug_assert!(count <= self.available());
        self.current -= count as i64;
    }

    /// Applies a WINDOW_UPDATE increment.
    pub fn add(&mut self, increment: u32) -> Result<(), Error> {
        self.adjust(i64::from(increment))
    }

    /// Applies a signed delta from a SETTINGS_INITIAL_WINDOW_SIZE change.
    pub fn adjust(&mut self, delta: i64) -> Result<(), Error> {
        let next = self.current + delta;
        if next > i64::from(MAX_WINDOW_SIZE) {
            return Err(Error::conn(
                ErrorCode::FlowControlError,
                "send window exceeds 2^31-1",
            ));
        }
        self.current = next;
        Ok(())
    }
}
