//! # Time Sync Task
//! Synchronizes the shared clock over SNTP once the network is up, then refreshes it
//! periodically. Until the first successful exchange the clock reports no time at all.

use crate::CLOCK;
use crate::config::{NETWORK_TIMEOUT, NTP_SERVER, RETRY_AFTER, TIME_REFRESH_AFTER};
use crate::error::NetworkError;
use alarm_core::sntp::{self, DEFAULT_MAX_STRATUM, PACKET_LEN};
use defmt::{Debug2Format, info, warn};
use embassy_net::dns::DnsQueryType;
use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::{IpEndpoint, Stack};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Instant, Timer, with_timeout};

/// Well-known SNTP port
const NTP_PORT: u16 = 123;

/// Signal for starting the first synchronization
static TIME_SYNC_START_SIGNAL: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Signals the time sync task to start
pub fn signal_time_sync_start() {
    TIME_SYNC_START_SIGNAL.signal(());
}

/// One SNTP exchange. Returns the server time, corrected by half the round trip,
/// and the local instant it corresponds to.
async fn request_time(stack: Stack<'static>) -> Result<(u64, Instant), NetworkError> {
    let server_ip = stack
        .dns_query(NTP_SERVER, DnsQueryType::A)
        .await
        .map_err(|_| NetworkError::Dns)?
        .first()
        .copied()
        .ok_or(NetworkError::Dns)?;
    let server = IpEndpoint::new(server_ip, NTP_PORT);
    info!("Resolved {} to {}", NTP_SERVER, Debug2Format(&server));

    let mut rx_meta = [PacketMetadata::EMPTY; 2];
    let mut rx_buffer = [0u8; 64];
    let mut tx_meta = [PacketMetadata::EMPTY; 2];
    let mut tx_buffer = [0u8; 64];
    let mut socket = UdpSocket::new(
        stack,
        &mut rx_meta,
        &mut rx_buffer,
        &mut tx_meta,
        &mut tx_buffer,
    );
    socket.bind(0).map_err(|_| NetworkError::Socket)?;

    let sent_at = Instant::now();
    socket
        .send_to(&sntp::request_packet(), server)
        .await
        .map_err(|_| NetworkError::Socket)?;

    let mut reply = [0u8; PACKET_LEN];
    let (len, from) = with_timeout(NETWORK_TIMEOUT, socket.recv_from(&mut reply))
        .await
        .map_err(|_| NetworkError::Timeout)?
        .map_err(|_| NetworkError::Socket)?;
    let received_at = Instant::now();

    if from.endpoint.addr != server_ip {
        warn!("Ignoring reply from {}", Debug2Format(&from));
        return Err(NetworkError::Socket);
    }

    let round_trip = received_at.saturating_duration_since(sent_at);
    let timestamp = sntp::parse_reply(&reply[..len], DEFAULT_MAX_STRATUM)?.advanced_by(round_trip / 2);
    info!(
        "NTP timestamp: {}.{:06} UTC (round trip {} ms)",
        timestamp.unix_secs,
        timestamp.micros,
        round_trip.as_millis()
    );
    Ok((timestamp.rounded_secs(), received_at))
}

/// Waits for the alarm loop to report connectivity, then keeps the clock synchronized.
#[embassy_executor::task]
pub async fn time_sync(stack: Stack<'static>) {
    info!("time sync task started");
    TIME_SYNC_START_SIGNAL.wait().await;

    loop {
        if !stack.is_config_up() {
            stack.wait_config_up().await;
        }

        let result = match request_time(stack).await {
            Ok((unix_secs, at)) => CLOCK.apply_sync(unix_secs, at).map_err(NetworkError::from),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                info!(
                    "Clock synchronized, next refresh in {} seconds",
                    TIME_REFRESH_AFTER.as_secs()
                );
                Timer::after(TIME_REFRESH_AFTER).await;
            }
            Err(e) => {
                warn!(
                    "Time sync failed: {}, retrying in {} seconds",
                    e,
                    RETRY_AFTER.as_secs()
                );
                Timer::after(RETRY_AFTER).await;
            }
        }
    }
}
