//! # Schedule Task
//! Keeps an MQTT session with the broker, announces the device on the schedule topic and
//! hands every payload on that topic to the [`ScheduleReceiver`]. Liveness is left to TCP
//! keep-alive so the receive path is never interrupted mid-packet.
//!
//! Broker, port, topic and client id come from `config/alarm_config.json`, see [`crate::config`].

use crate::SCHEDULE;
use crate::config::{
    MQTT_BROKER, MQTT_CLIENT_ID, MQTT_PORT, MQTT_TOPIC, NETWORK_TIMEOUT, RETRY_AFTER,
};
use crate::error::NetworkError;
use alarm_core::ScheduleReceiver;
use core::fmt::Write;
use core::net::Ipv4Addr;
use defmt::{Debug2Format, error, info, warn};
use embassy_net::dns::DnsQueryType;
use embassy_net::tcp::TcpSocket;
use embassy_net::{IpAddress, IpEndpoint, Stack};
use embassy_time::{Duration, Timer, with_timeout};
use heapless::String;
use rust_mqtt::client::client::MqttClient;
use rust_mqtt::client::client_config::{ClientConfig, MqttVersion};
use rust_mqtt::packet::v5::publish_packet::QualityOfService;
use rust_mqtt::utils::rng_generator::CountingRng;

/// TCP and MQTT buffer size; schedule payloads are a few dozen bytes
const BUFFER_SIZE: usize = 1024;

/// Most MQTT properties the client keeps per packet
const MAX_PROPERTIES: usize = 5;

/// Idle time after which the TCP stack probes the broker
const TCP_KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Unacknowledged time after which the connection is considered dead
const TCP_TIMEOUT: Duration = Duration::from_secs(90);

/// Resolves the broker, accepting a dotted IPv4 address without a DNS query.
async fn resolve_broker(stack: Stack<'static>) -> Result<IpAddress, NetworkError> {
    if let Ok(addr) = MQTT_BROKER.parse::<Ipv4Addr>() {
        return Ok(IpAddress::Ipv4(addr));
    }
    stack
        .dns_query(MQTT_BROKER, DnsQueryType::A)
        .await
        .map_err(|_| NetworkError::Dns)?
        .first()
        .copied()
        .ok_or(NetworkError::Dns)
}

/// The announcement published right after connecting
fn connected_message(stack: Stack<'static>) -> String<32> {
    let mut message = String::new();
    let _ = match stack.config_v4() {
        Some(config) => write!(message, "Connected:{}", config.address.address()),
        None => write!(message, "Connected"),
    };
    message
}

/// One MQTT session: connect, announce, subscribe and feed payloads to the receiver
/// until something fails.
async fn run_session(stack: Stack<'static>) -> Result<(), NetworkError> {
    let broker = IpEndpoint::new(resolve_broker(stack).await?, MQTT_PORT);
    info!("Connecting to MQTT broker at {}", Debug2Format(&broker));

    let mut rx_buffer = [0u8; BUFFER_SIZE];
    let mut tx_buffer = [0u8; BUFFER_SIZE];
    let mut socket = TcpSocket::new(stack, &mut rx_buffer, &mut tx_buffer);
    socket.set_timeout(Some(TCP_TIMEOUT));
    socket.set_keep_alive(Some(TCP_KEEP_ALIVE));
    with_timeout(NETWORK_TIMEOUT, socket.connect(broker))
        .await
        .map_err(|_| NetworkError::Timeout)?
        .map_err(|e| {
            warn!("TCP connect failed: {}", e);
            NetworkError::Socket
        })?;

    let mut config = ClientConfig::new(MqttVersion::MQTTv5, CountingRng(20_000));
    config.add_max_subscribe_qos(QualityOfService::QoS0);
    config.add_client_id(MQTT_CLIENT_ID);
    config.max_packet_size = BUFFER_SIZE as u32;
    // MQTT keep-alive off, the TCP keep-alive above detects a dead broker
    config.keep_alive = 0;

    let mut write_buffer = [0u8; BUFFER_SIZE];
    let mut recv_buffer = [0u8; BUFFER_SIZE];
    let mut client = MqttClient::<_, MAX_PROPERTIES, _>::new(
        socket,
        &mut write_buffer,
        BUFFER_SIZE,
        &mut recv_buffer,
        BUFFER_SIZE,
        config,
    );

    client.connect_to_broker().await.map_err(|e| {
        warn!("MQTT connect failed: {}", Debug2Format(&e));
        NetworkError::Mqtt
    })?;

    let announcement = connected_message(stack);
    client
        .send_message(
            MQTT_TOPIC,
            announcement.as_bytes(),
            QualityOfService::QoS0,
            false,
        )
        .await
        .map_err(|e| {
            warn!("MQTT publish failed: {}", Debug2Format(&e));
            NetworkError::Mqtt
        })?;
    info!("Published {} to {}", announcement.as_str(), MQTT_TOPIC);

    client.subscribe_to_topic(MQTT_TOPIC).await.map_err(|e| {
        warn!("MQTT subscribe failed: {}", Debug2Format(&e));
        NetworkError::Mqtt
    })?;
    info!("Subscribed to {}", MQTT_TOPIC);

    // receive is never cancelled; a dead link surfaces as a socket timeout error
    let receiver = ScheduleReceiver::new(&SCHEDULE);
    loop {
        let (topic, payload) = client.receive_message().await.map_err(|e| {
            warn!("MQTT receive failed: {}", Debug2Format(&e));
            NetworkError::Mqtt
        })?;
        info!("Message on {}: {} bytes", topic, payload.len());
        // the announcement comes back to us on the same topic and is not a schedule
        receiver.on_message(payload);
    }
}

/// Keeps the schedule subscription alive for as long as the firmware runs.
#[embassy_executor::task]
pub async fn schedule_subscriber(stack: Stack<'static>) {
    info!("schedule subscriber task started");
    loop {
        stack.wait_config_up().await;
        if let Err(e) = run_session(stack).await {
            error!(
                "MQTT session ended: {}, reconnecting in {} seconds",
                e,
                RETRY_AFTER.as_secs()
            );
        }
        Timer::after(RETRY_AFTER).await;
    }
}
