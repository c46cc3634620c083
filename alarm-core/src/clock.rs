//! # Clock Source
//! Wall-clock time that only exists once network time synchronisation has succeeded.
//!
//! The clock is anchored by an SNTP result: the Unix time reported by the server and
//! the monotonic [`Instant`] at which it was taken. Wall time afterwards is derived
//! from the monotonic clock, so reading it never blocks and never touches the network.
//! Until the first anchor exists, [`SyncedClock::current_time`] returns `None`.

use crate::time::{CurrentTime, UtcOffset};
use core::cell::RefCell;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Instant;

/// 2016-01-01T00:00:00Z. Anything older is a clock that has not been set.
pub const MIN_PLAUSIBLE_UNIX_SECS: u64 = 1_451_606_400;

/// Something that can tell the local calendar time, if it knows it.
pub trait ClockSource {
    /// Returns the local time at the monotonic instant `now`, or `None` while unsynchronized.
    fn current_time(&self, now: Instant) -> Option<CurrentTime>;
}

/// Errors when applying a synchronisation result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockError {
    /// The reported time lies before [`MIN_PLAUSIBLE_UNIX_SECS`]
    Implausible {
        /// The rejected Unix time
        unix_secs: u64,
    },
}

impl core::fmt::Display for ClockError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Implausible { unix_secs } => {
                write!(f, "implausible time {unix_secs}, clock not updated")
            }
        }
    }
}

impl core::error::Error for ClockError {}

/// What the caller must do after reporting connectivity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SyncRequest {
    /// Nothing to do
    None,
    /// Connectivity is available for the first time, start time synchronisation now
    Start,
}

/// Pairing of a Unix time with the monotonic instant it was observed at
#[derive(Debug, Clone, Copy)]
struct SyncAnchor {
    /// Unix seconds reported by the time server
    unix_secs: u64,
    /// Monotonic instant at which `unix_secs` was valid
    at: Instant,
}

/// A wall clock backed by network time synchronisation.
#[derive(Debug)]
pub struct SyncedClock {
    /// Fixed offset applied to derive local time
    offset: UtcOffset,
    /// Latest synchronisation result, `None` until the first one succeeds
    anchor: Option<SyncAnchor>,
    /// Set once time synchronisation has been requested
    sync_started: bool,
}

impl SyncedClock {
    /// Creates an unsynchronized clock that will report local time with `offset`.
    pub const fn new(offset: UtcOffset) -> Self {
        Self {
            offset,
            anchor: None,
            sync_started: false,
        }
    }

    /// Reports the current connectivity state.
    /// Returns [`SyncRequest::Start`] exactly once, the first time `connected` is true.
    pub fn on_connectivity(&mut self, connected: bool) -> SyncRequest {
        if !connected || self.sync_started {
            return SyncRequest::None;
        }
        self.sync_started = true;
        info!("connectivity available, requesting time sync");
        SyncRequest::Start
    }

    /// Anchors the clock at `unix_secs`, observed at the monotonic instant `at`.
    /// A later call replaces the anchor, which is how periodic re-syncs correct drift.
    pub fn apply_sync(&mut self, unix_secs: u64, at: Instant) -> Result<(), ClockError> {
        if unix_secs < MIN_PLAUSIBLE_UNIX_SECS {
            warn!("rejecting implausible sync result {}", unix_secs);
            return Err(ClockError::Implausible { unix_secs });
        }
        if self.anchor.is_none() {
            info!("clock synchronized");
        }
        self.anchor = Some(SyncAnchor { unix_secs, at });
        Ok(())
    }

    /// Returns true once a synchronisation result has been applied.
    pub const fn is_synchronized(&self) -> bool {
        self.anchor.is_some()
    }

    /// Returns the Unix time at `now`, or `None` while unsynchronized.
    pub fn unix_now(&self, now: Instant) -> Option<u64> {
        let anchor = self.anchor?;
        let elapsed = now.saturating_duration_since(anchor.at).as_secs();
        Some(anchor.unix_secs.saturating_add(elapsed))
    }

    /// Returns the configured offset from UTC.
    pub const fn offset(&self) -> UtcOffset {
        self.offset
    }
}

impl ClockSource for SyncedClock {
    fn current_time(&self, now: Instant) -> Option<CurrentTime> {
        self.unix_now(now)
            .map(|unix_secs| CurrentTime::from_unix(unix_secs, self.offset))
    }
}

/// A [`SyncedClock`] shared between the time sync task and the poll loop.
/// Every access is a short critical section, readers never see a half-written anchor.
pub struct SharedClock {
    /// The guarded clock
    inner: Mutex<CriticalSectionRawMutex, RefCell<SyncedClock>>,
}

impl SharedClock {
    /// Creates a shared, unsynchronized clock.
    pub const fn new(offset: UtcOffset) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(SyncedClock::new(offset))),
        }
    }

    /// See [`SyncedClock::on_connectivity`].
    pub fn on_connectivity(&self, connected: bool) -> SyncRequest {
        self.inner
            .lock(|clock| clock.borrow_mut().on_connectivity(connected))
    }

    /// See [`SyncedClock::apply_sync`].
    pub fn apply_sync(&self, unix_secs: u64, at: Instant) -> Result<(), ClockError> {
        self.inner
            .lock(|clock| clock.borrow_mut().apply_sync(unix_secs, at))
    }

    /// See [`SyncedClock::is_synchronized`].
    pub fn is_synchronized(&self) -> bool {
        self.inner.lock(|clock| clock.borrow().is_synchronized())
    }
}

impl ClockSource for SharedClock {
    fn current_time(&self, now: Instant) -> Option<CurrentTime> {
        self.inner.lock(|clock| clock.borrow().current_time(now))
    }
}
