//! # SNTP packets
//! Building the client request and decoding the server reply (RFC 4330).
//! The UDP exchange itself belongs to the firmware; this module only deals in bytes.

use embassy_time::Duration;

/// Length of an SNTP packet without extensions
pub const PACKET_LEN: usize = 48;

/// Seconds between the NTP epoch (1900-01-01) and the Unix epoch (1970-01-01)
pub const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

/// Stratum values above this are treated as unsynchronized servers
pub const DEFAULT_MAX_STRATUM: u8 = 15;

/// Errors decoding a server reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SntpError {
    /// The reply is shorter than [`PACKET_LEN`]
    Truncated {
        /// Bytes received
        len: usize,
    },
    /// The reply is not a server reply
    NotServerMode {
        /// The mode field received
        mode: u8,
    },
    /// Kiss-of-death or an unsynchronized server
    BadStratum {
        /// The stratum field received
        stratum: u8,
    },
    /// The transmit timestamp is zero
    NoTimestamp,
}

impl core::fmt::Display for SntpError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Truncated { len } => write!(f, "reply truncated to {len} bytes"),
            Self::NotServerMode { mode } => write!(f, "unexpected mode {mode}"),
            Self::BadStratum { stratum } => write!(f, "unusable stratum {stratum}"),
            Self::NoTimestamp => write!(f, "reply carries no timestamp"),
        }
    }
}

impl core::error::Error for SntpError {}

/// A Unix time with microsecond resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timestamp {
    /// Whole seconds since the Unix epoch
    pub unix_secs: u64,
    /// Microseconds within the second
    pub micros: u32,
}

impl Timestamp {
    /// Converts an NTP timestamp (seconds since 1900 plus a 2^-32 fraction).
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_ntp(ntp_secs: u32, ntp_frac: u32) -> Self {
        Self {
            unix_secs: (ntp_secs as u64).saturating_sub(NTP_UNIX_OFFSET),
            micros: ((ntp_frac as u64 * 1_000_000) >> 32) as u32,
        }
    }

    /// Shifts the timestamp forward by `delay`, carrying into the seconds.
    #[allow(clippy::cast_possible_truncation)]
    pub const fn advanced_by(self, delay: Duration) -> Self {
        let total = self.micros as u64 + delay.as_micros();
        Self {
            unix_secs: self.unix_secs.saturating_add(total / 1_000_000),
            micros: (total % 1_000_000) as u32,
        }
    }

    /// Whole Unix seconds, rounded to the nearest second.
    pub const fn rounded_secs(self) -> u64 {
        if self.micros >= 500_000 {
            self.unix_secs.saturating_add(1)
        } else {
            self.unix_secs
        }
    }
}

/// Builds a client request: LI = 0, VN = 3, Mode = 3.
pub const fn request_packet() -> [u8; PACKET_LEN] {
    let mut packet = [0u8; PACKET_LEN];
    packet[0] = 0x1B;
    packet
}

/// Decodes the transmit timestamp from a server reply.
pub fn parse_reply(reply: &[u8], max_stratum: u8) -> Result<Timestamp, SntpError> {
    if reply.len() < PACKET_LEN {
        return Err(SntpError::Truncated { len: reply.len() });
    }

    // mode 4 is a server reply, 5 a broadcast
    let mode = reply[0] & 0x07;
    if mode != 4 && mode != 5 {
        return Err(SntpError::NotServerMode { mode });
    }

    let stratum = reply[1];
    if stratum == 0 || stratum > max_stratum {
        return Err(SntpError::BadStratum { stratum });
    }

    let secs = u32::from_be_bytes([reply[40], reply[41], reply[42], reply[43]]);
    let frac = u32::from_be_bytes([reply[44], reply[45], reply[46], reply[47]]);
    if secs == 0 && frac == 0 {
        return Err(SntpError::NoTimestamp);
    }
    Ok(Timestamp::from_ntp(secs, frac))
}
