//! # alarm-core
//! The platform-agnostic heart of the MQTT scheduled alarm.
//!
//! - [`clock`]: wall-clock time that exists only after network time sync
//! - [`schedule`]: parsing of remote `YYYY-MM-DD HH:MM` payloads into the alarm target
//! - [`alarm`]: the Armed / Firing / Cooldown trigger state machine
//! - [`io`]: the actuator, indicator and button collaborators the alarm drives
//! - [`controller`]: one poll-loop iteration tying the above together
//! - [`sntp`]: the SNTP request and reply packets the clock is synchronized from
//!
//! Nothing in here touches hardware, so the whole crate is tested on the host.
//! Enable the `defmt` feature to get log output and `defmt::Format` on the public types.
#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod alarm;
pub mod clock;
pub mod controller;
pub mod io;
pub mod schedule;
pub mod sntp;
pub mod time;

#[cfg(test)]
mod testing;

pub use alarm::{AlarmState, AlarmTrigger, DismissReason, Tick, Transition, TriggerConfig};
pub use clock::{ClockError, ClockSource, SharedClock, SyncRequest, SyncedClock};
pub use controller::AlarmController;
pub use io::{Color, IndicatorSink, InputEvent, InputSource, OutputSink};
pub use schedule::{ParseError, ScheduleReceiver, ScheduleSlot, TargetTime, parse_target};
pub use time::{CurrentTime, MinuteStamp, UtcOffset};
