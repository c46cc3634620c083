//! Errors of the network tasks. All of them are logged and retried.

use alarm_core::ClockError;
use alarm_core::sntp::SntpError;
use defmt::Format;

/// Failures talking to the network
#[derive(Debug, Clone, Copy, Format)]
pub enum NetworkError {
    /// Host name resolution failed or returned no address
    Dns,
    /// Socket bind, connect or transfer failed
    Socket,
    /// No answer in time
    Timeout,
    /// The reply came from somewhere else or could not be decoded
    InvalidResponse(SntpError),
    /// The server time was rejected by the clock
    Implausible(ClockError),
    /// The MQTT session could not be set up or broke down
    Mqtt,
}

impl core::fmt::Display for NetworkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Dns => write!(f, "DNS resolution failed"),
            Self::Socket => write!(f, "socket error"),
            Self::Timeout => write!(f, "request timeout"),
            Self::InvalidResponse(e) => write!(f, "invalid response: {e}"),
            Self::Implausible(e) => write!(f, "rejected server time: {e}"),
            Self::Mqtt => write!(f, "MQTT session failed"),
        }
    }
}

impl core::error::Error for NetworkError {}

impl From<SntpError> for NetworkError {
    fn from(e: SntpError) -> Self {
        Self::InvalidResponse(e)
    }
}

impl From<ClockError> for NetworkError {
    fn from(e: ClockError) -> Self {
        Self::Implausible(e)
    }
}
