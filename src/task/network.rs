//! # Network Task
//! Brings up the CYW43 radio and the embassy-net stack, then keeps the device joined to the
//! configured WPA2 network, rejoining whenever the link drops.
//!
//! The credentials come from `config/wifi_config.json`, see [`crate::config`].

use crate::config::{HOSTNAME, NETWORK_TIMEOUT, PASSWORD, RETRY_AFTER, SSID};
use crate::task::resources::{Irqs, WifiResources};
use cyw43::JoinOptions;
use cyw43_pio::{DEFAULT_CLOCK_DIVIDER, PioSpi};
use defmt::{Debug2Format, error, info, unwrap, warn};
use embassy_executor::Spawner;
use embassy_net::{Config, DhcpConfig, Stack, StackResources};
use embassy_rp::clocks::RoscRng;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::{DMA_CH0, PIO0};
use embassy_rp::pio::Pio;
use embassy_time::{Timer, with_timeout};
use portable_atomic::{AtomicBool, Ordering};
use rand::RngCore;
use static_cell::StaticCell;

/// Sockets the stack can hold: DHCP, DNS, the SNTP socket and the MQTT socket
const SOCKET_COUNT: usize = 5;

/// Set while the device holds a DHCP lease on a joined network
static CONNECTED: AtomicBool = AtomicBool::new(false);

/// Whether the network is currently usable
pub fn is_connected() -> bool {
    CONNECTED.load(Ordering::Relaxed)
}

/// Records a connectivity change
fn set_connected(connected: bool) {
    if CONNECTED.swap(connected, Ordering::Relaxed) != connected {
        info!("network {}", if connected { "up" } else { "down" });
    }
}

#[embassy_executor::task]
async fn cyw43_task(
    runner: cyw43::Runner<'static, Output<'static>, PioSpi<'static, PIO0, 0, DMA_CH0>>,
) -> ! {
    runner.run().await
}

#[embassy_executor::task]
async fn net_task(mut runner: embassy_net::Runner<'static, cyw43::NetDriver<'static>>) -> ! {
    runner.run().await
}

/// Initializes the radio and the network stack and spawns their runners.
/// Returns the stack for the socket users and the radio control for [`wifi_connection`].
pub async fn init(spawner: Spawner, r: WifiResources) -> (Stack<'static>, cyw43::Control<'static>) {
    info!("init wifi");
    let pwr = Output::new(r.pwr_pin, Level::Low);
    let cs = Output::new(r.cs_pin, Level::High);
    let mut pio = Pio::new(r.pio_sm, Irqs);
    let spi = PioSpi::new(
        &mut pio.common,
        pio.sm0,
        DEFAULT_CLOCK_DIVIDER,
        pio.irq0,
        cs,
        r.dio_pin,
        r.clk_pin,
        r.dma_ch,
    );

    // firmware and CLM are flashed separately, see memory.x
    // SAFETY: both regions are reserved in memory.x and never written at runtime
    let fw = unsafe { core::slice::from_raw_parts(0x1010_0000 as *const u8, 230_321) };
    let clm = unsafe { core::slice::from_raw_parts(0x1014_0000 as *const u8, 4752) };

    static STATE: StaticCell<cyw43::State> = StaticCell::new();
    let state = STATE.init(cyw43::State::new());

    let (net_device, mut control, runner) = cyw43::new(state, pwr, spi, fw).await;
    unwrap!(spawner.spawn(cyw43_task(runner)));

    info!("init control");
    control.init(clm).await;
    control
        .set_power_management(cyw43::PowerManagementMode::PowerSave)
        .await;

    let mut dhcp_config = DhcpConfig::default();
    dhcp_config.hostname = HOSTNAME.try_into().ok();
    let config = Config::dhcpv4(dhcp_config);

    // random seed
    let seed = RoscRng.next_u64();

    static RESOURCES: StaticCell<StackResources<SOCKET_COUNT>> = StaticCell::new();
    let (stack, net_runner) = embassy_net::new(
        net_device,
        config,
        RESOURCES.init(StackResources::new()),
        seed,
    );
    unwrap!(spawner.spawn(net_task(net_runner)));

    (stack, control)
}

/// Joins the network, waits for DHCP and then watches the link, starting over when it drops.
#[embassy_executor::task]
pub async fn wifi_connection(stack: Stack<'static>, mut control: cyw43::Control<'static>) {
    info!("wifi connection task started");
    loop {
        info!("Joining WPA2 network with SSID: {}", SSID);
        match with_timeout(
            NETWORK_TIMEOUT,
            control.join(SSID, JoinOptions::new(PASSWORD.as_bytes())),
        )
        .await
        {
            Ok(Ok(())) => info!("Joined {}", SSID),
            Ok(Err(e)) => {
                error!("Error joining wifi: {}", Debug2Format(&e));
                control.leave().await;
                Timer::after(RETRY_AFTER).await;
                continue;
            }
            Err(_) => {
                error!("Timeout while trying to join wifi");
                control.leave().await;
                Timer::after(RETRY_AFTER).await;
                continue;
            }
        }

        if with_timeout(NETWORK_TIMEOUT, stack.wait_config_up())
            .await
            .is_err()
        {
            warn!(
                "Waiting for DHCP timed out, retrying in {} seconds",
                RETRY_AFTER.as_secs()
            );
            control.leave().await;
            Timer::after(RETRY_AFTER).await;
            continue;
        }

        if let Some(config) = stack.config_v4() {
            info!("Got address {}", Debug2Format(&config.address));
        }
        control.gpio_set(0, true).await; // onboard LED shows the link
        set_connected(true);

        stack.wait_link_down().await;

        set_connected(false);
        control.gpio_set(0, false).await;
        warn!("Link lost, rejoining");
        control.leave().await;
    }
}
