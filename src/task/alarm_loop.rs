//! # Alarm Loop
//! The cooperative poll loop: every [`POLL_PERIOD`] it reports connectivity to the clock,
//! then lets the [`AlarmController`] compare the clock to the scheduled target and drive
//! the alarm output, the indicator ring and the button dismissal.

use crate::config::{POLL_PERIOD, trigger_config};
use crate::event::ChannelInput;
use crate::task::indicator::SignalIndicator;
use crate::task::network;
use crate::task::resources::AlarmOutputResources;
use crate::task::time_sync::signal_time_sync_start;
use crate::{CLOCK, SCHEDULE};
use alarm_core::{AlarmController, OutputSink, SyncRequest};
use defmt::info;
use embassy_rp::gpio::{Level, Output};
use embassy_time::{Instant, Ticker};

/// The alarm actuator on a GPIO line, active high
pub struct GpioOutput(Output<'static>);

impl OutputSink for GpioOutput {
    fn set_output(&mut self, active: bool) {
        self.0.set_level(Level::from(active));
    }
}

#[embassy_executor::task]
pub async fn alarm_loop(r: AlarmOutputResources) {
    info!("alarm loop started");
    let output = GpioOutput(Output::new(r.output_pin, Level::Low));
    let mut controller = AlarmController::new(
        trigger_config(),
        &CLOCK,
        &SCHEDULE,
        output,
        SignalIndicator::new(),
        ChannelInput,
    );

    let mut ticker = Ticker::every(POLL_PERIOD);
    loop {
        if CLOCK.on_connectivity(network::is_connected()) == SyncRequest::Start {
            info!("network available, starting time sync");
            signal_time_sync_start();
        }

        // presses queued before the alarm fires are drained by the trigger itself
        controller.poll(Instant::now());

        ticker.next().await;
    }
}
