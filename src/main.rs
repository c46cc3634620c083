//! # Pico W MQTT alarm
//! Fires an alarm at the minute published on an MQTT topic, once the clock has been
//! synchronized over SNTP. While firing, the alarm output is driven high and the LED ring
//! alternates red and green until the green or blue button is pressed.

// we are in an environment with constrained resources, so we do not use the standard library and we define a different entry point.
#![no_std]
#![no_main]

use crate::task::alarm_loop::alarm_loop;
use crate::task::buttons::{Button, button_handler};
use crate::task::indicator::indicator_handler;
use crate::task::network::{self, wifi_connection};
use crate::task::resources::{AlarmOutputResources, NeopixelResources, WifiResources};
use crate::task::schedule::schedule_subscriber;
use crate::task::time_sync::time_sync;
use alarm_core::{ScheduleSlot, SharedClock};
use defmt::{info, unwrap};
use embassy_executor::Spawner;
use embassy_rp::gpio::{Input, Pull};
use {defmt_rtt as _, panic_probe as _};

mod config;
mod error;
mod event;
mod task;

/// Wall-clock time, empty until the first SNTP synchronization
pub static CLOCK: SharedClock = SharedClock::new(config::UTC_OFFSET);

/// The alarm target as last received over MQTT
pub static SCHEDULE: ScheduleSlot = ScheduleSlot::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Program start");
    let p = embassy_rp::init(Default::default());

    // buttons
    unwrap!(spawner.spawn(button_handler(
        Input::new(p.PIN_20, Pull::Up),
        Button::Green
    )));
    unwrap!(spawner.spawn(button_handler(
        Input::new(p.PIN_21, Pull::Up),
        Button::Blue
    )));
    unwrap!(spawner.spawn(button_handler(
        Input::new(p.PIN_22, Pull::Up),
        Button::Yellow
    )));

    // actuators
    unwrap!(spawner.spawn(indicator_handler(NeopixelResources {
        inner_spi: p.SPI0,
        clk_pin: p.PIN_18,
        mosi_pin: p.PIN_19,
        tx_dma_ch: p.DMA_CH1,
    })));
    unwrap!(spawner.spawn(alarm_loop(AlarmOutputResources {
        output_pin: p.PIN_15,
    })));

    // network
    let wifi = WifiResources {
        pwr_pin: p.PIN_23,
        cs_pin: p.PIN_25,
        pio_sm: p.PIO0,
        dio_pin: p.PIN_24,
        clk_pin: p.PIN_29,
        dma_ch: p.DMA_CH0,
    };
    let (stack, control) = network::init(spawner, wifi).await;
    unwrap!(spawner.spawn(wifi_connection(stack, control)));
    unwrap!(spawner.spawn(time_sync(stack)));
    unwrap!(spawner.spawn(schedule_subscriber(stack)));
}
