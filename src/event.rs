//! Button input channel shared by the button tasks and the alarm loop

use alarm_core::{InputEvent, InputSource};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

/// The capacity of the input channel
const INPUT_CHANNEL_CAPACITY: usize = 4;

/// Button presses waiting for the alarm loop
static INPUT_CHANNEL: Channel<CriticalSectionRawMutex, InputEvent, INPUT_CHANNEL_CAPACITY> =
    Channel::new();

/// Queues a button press, dropping it when the alarm loop is behind
pub fn send_input(event: InputEvent) {
    if INPUT_CHANNEL.try_send(event).is_err() {
        defmt::debug!("input channel full, dropping {}", event);
    }
}

/// Non-blocking view of the input channel for the alarm trigger
pub struct ChannelInput;

impl InputSource for ChannelInput {
    fn poll_input(&mut self) -> Option<InputEvent> {
        INPUT_CHANNEL.try_receive().ok()
    }
}
