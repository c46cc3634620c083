//! # Configuration
//! Build-time settings generated by `build.rs` from the JSON files in `config/`,
//! plus the fixed timings the tasks run on.
//!
//! `config/wifi_config.json`:
//! ```json
//! { "ssid": "some_ssid_here", "password": "some_password_here" }
//! ```
//!
//! `config/alarm_config.json`:
//! ```json
//! {
//!     "mqtt_broker": "test.mosquitto.org",
//!     "mqtt_port": 1883,
//!     "mqtt_topic": "/topic/a159236",
//!     "mqtt_client_id": "pico-mqtt-alarm",
//!     "ntp_server": "pool.ntp.org",
//!     "utc_offset_minutes": 720,
//!     "firing_timeout_secs": 0
//! }
//! ```

include!(concat!(env!("OUT_DIR"), "/wifi_secrets.rs"));
include!(concat!(env!("OUT_DIR"), "/alarm_config.rs"));

use alarm_core::{TriggerConfig, UtcOffset};
use embassy_time::Duration;

/// Fixed local offset applied to synchronized time.
/// There is no daylight saving rule: set `utc_offset_minutes` to the summer offset
/// by hand when it applies (780 for NZDT).
pub const UTC_OFFSET: UtcOffset = UtcOffset::from_minutes(UTC_OFFSET_MINUTES);

/// DHCP host name of the device
pub const HOSTNAME: &str = "pico-alarm";

/// Period of the alarm poll loop
pub const POLL_PERIOD: Duration = Duration::from_millis(50);

/// Upper bound for joining the network, waiting for DHCP and each SNTP exchange
pub const NETWORK_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause before retrying a failed network operation
pub const RETRY_AFTER: Duration = Duration::from_secs(30);

/// Interval between clock resynchronizations
pub const TIME_REFRESH_AFTER: Duration = Duration::from_secs(21_600); // 6 hours


/// Trigger settings, with the firing timeout taken from the config file
pub fn trigger_config() -> TriggerConfig {
    TriggerConfig {
        firing_timeout: (FIRING_TIMEOUT_SECS > 0).then(|| Duration::from_secs(FIRING_TIMEOUT_SECS)),
        ..TriggerConfig::default()
    }
}
