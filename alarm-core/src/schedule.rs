//! # Schedule Receiver
//! Turns inbound message payloads into the alarm target.
//!
//! A payload must start with `YYYY-MM-DD HH:MM`; whatever follows the minute is ignored.
//! Each number may be preceded by whitespace and may have any number of digits, as long
//! as it fits its field. Payloads that do not parse completely are dropped and the
//! previously stored target stays in place.

use crate::time::MinuteStamp;
use core::cell::Cell;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

/// The remotely supplied minute the alarm is scheduled against
pub type TargetTime = MinuteStamp;

/// The fields of a schedule payload, in the order they appear
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Field {
    /// The year
    Year,
    /// The month
    Month,
    /// The day of the month
    Day,
    /// The hour
    Hour,
    /// The minute
    Minute,
}

/// Reasons a payload is not a schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// No digits where the field was expected
    MissingField(Field),
    /// The digits do not fit the field
    Overflow(Field),
    /// The separator after a field is not the expected one
    UnexpectedSeparator {
        /// The field the separator follows
        after: Field,
        /// The separator that was expected
        expected: u8,
    },
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing {field:?}"),
            Self::Overflow(field) => write!(f, "{field:?} out of range"),
            Self::UnexpectedSeparator { after, expected } => {
                write!(f, "expected '{}' after {after:?}", char::from(*expected))
            }
        }
    }
}

impl core::error::Error for ParseError {}

/// Byte cursor over a payload
struct Cursor<'a> {
    /// The payload
    bytes: &'a [u8],
    /// Index of the next unread byte
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Starts reading at the beginning of `bytes`.
    const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Returns the next byte without consuming it.
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    /// Skips whitespace and returns how many bytes were skipped.
    fn skip_whitespace(&mut self) -> usize {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
        self.pos - start
    }

    /// Reads an unsigned decimal number into `T`.
    fn number<T: TryFrom<u32>>(&mut self, field: Field) -> Result<T, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut value: u32 = 0;
        while let Some(digit) = self.peek().filter(u8::is_ascii_digit) {
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(u32::from(digit - b'0')))
                .ok_or(ParseError::Overflow(field))?;
            self.pos += 1;
        }
        if self.pos == start {
            return Err(ParseError::MissingField(field));
        }
        T::try_from(value).map_err(|_| ParseError::Overflow(field))
    }

    /// Consumes `separator` or fails.
    fn separator(&mut self, after: Field, expected: u8) -> Result<(), ParseError> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(ParseError::UnexpectedSeparator { after, expected })
        }
    }

    /// Consumes at least one whitespace byte or fails.
    fn whitespace(&mut self, after: Field) -> Result<(), ParseError> {
        if self.skip_whitespace() == 0 {
            return Err(ParseError::UnexpectedSeparator {
                after,
                expected: b' ',
            });
        }
        Ok(())
    }
}

/// Parses the leading `YYYY-MM-DD HH:MM` of `payload`.
pub fn parse_target(payload: &[u8]) -> Result<TargetTime, ParseError> {
    let mut cursor = Cursor::new(payload);

    let year = cursor.number(Field::Year)?;
    cursor.separator(Field::Year, b'-')?;
    let month = cursor.number(Field::Month)?;
    cursor.separator(Field::Month, b'-')?;
    let day = cursor.number(Field::Day)?;
    cursor.whitespace(Field::Day)?;
    let hour = cursor.number(Field::Hour)?;
    cursor.separator(Field::Hour, b':')?;
    let minute = cursor.number(Field::Minute)?;

    Ok(TargetTime::new(year, month, day, hour, minute))
}

/// Holds the latest target. Written by the message task, read by the poll loop.
/// Reads and writes swap the whole record inside a critical section,
/// so a reader sees either the old or the new target, never a mix.
pub struct ScheduleSlot {
    /// The stored target, `None` until the first schedule arrives
    target: Mutex<CriticalSectionRawMutex, Cell<Option<TargetTime>>>,
}

impl ScheduleSlot {
    /// Creates an empty slot.
    pub const fn new() -> Self {
        Self {
            target: Mutex::new(Cell::new(None)),
        }
    }

    /// Replaces the stored target.
    pub fn store(&self, target: TargetTime) {
        self.target.lock(|cell| cell.set(Some(target)));
    }

    /// Returns a copy of the stored target.
    pub fn snapshot(&self) -> Option<TargetTime> {
        self.target.lock(Cell::get)
    }
}

impl Default for ScheduleSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Feeds message payloads into a [`ScheduleSlot`].
pub struct ScheduleReceiver<'a> {
    /// Where parsed targets go
    slot: &'a ScheduleSlot,
}

impl<'a> ScheduleReceiver<'a> {
    /// Creates a receiver writing into `slot`.
    pub const fn new(slot: &'a ScheduleSlot) -> Self {
        Self { slot }
    }

    /// Handles one payload. Returns true if it replaced the target.
    /// Malformed payloads are dropped without touching the stored target.
    pub fn on_message(&self, payload: &[u8]) -> bool {
        match parse_target(payload) {
            Ok(target) => {
                info!("new alarm target {}", target);
                self.slot.store(target);
                true
            }
            Err(e) => {
                debug!("ignoring payload: {}", e);
                false
            }
        }
    }
}
