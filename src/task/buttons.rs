//! # Button Tasks
//! This module contains the tasks for the buttons. Each button has its own task.
//! A debounced press is forwarded to the alarm loop as an [`InputEvent`].

use crate::event::send_input;
use alarm_core::InputEvent;
use defmt::{Format, debug, info};
use embassy_rp::gpio::{Input, Level};
use embassy_time::{Duration, Timer};

/// Debounces one button and reports its presses
pub struct ButtonManager<'a> {
    /// The input pin for the button
    input: Input<'a>,
    /// The debounce duration
    debounce_duration: Duration,
    /// The input reported when the button is pressed
    event: InputEvent,
    /// The button being managed
    button: Button,
}

/// The buttons of the system
#[derive(Debug, Format, Eq, PartialEq, Clone, Copy)]
pub enum Button {
    /// Green button, first dismissal input
    Green,
    /// Blue button, second dismissal input
    Blue,
    /// Yellow button, not a dismissal
    Yellow,
}

impl Button {
    /// The input this button stands for
    pub const fn input_event(self) -> InputEvent {
        match self {
            Self::Green => InputEvent::DismissA,
            Self::Blue => InputEvent::DismissB,
            Self::Yellow => InputEvent::Other,
        }
    }
}

impl<'a> ButtonManager<'a> {
    /// Create a new `ButtonManager`
    pub const fn new(input: Input<'a>, button: Button) -> Self {
        Self {
            input,
            debounce_duration: Duration::from_millis(80), // hardcoding, all buttons have the same debounce duration
            event: button.input_event(),
            button,
        }
    }

    /// Waits for debounced level changes forever and reports each press.
    /// The button is normally high and goes low when pressed, so a press is reported
    /// as soon as it settles instead of on release.
    pub async fn handle_button_press(&mut self) {
        loop {
            if self.debounce().await == Level::Low {
                debug!("{} pressed", self.button);
                send_input(self.event);
            }
        }
    }

    /// Debounce the button press by waiting for the button to be stable for a given duration. We determine the input level, then await any edge,
    /// then wait for the debounce duration, then check if the input level has changed. If it has, we break the loop and return the new level.
    pub async fn debounce(&mut self) -> Level {
        loop {
            let l1 = self.input.get_level();

            self.input.wait_for_any_edge().await;

            Timer::after(self.debounce_duration).await;

            let l2 = self.input.get_level();
            if l1 != l2 {
                break l2;
            }
        }
    }
}

#[embassy_executor::task(pool_size = 3)]
pub async fn button_handler(input: Input<'static>, button: Button) {
    let mut btn = ButtonManager::new(input, button);
    info!("{} task started", btn.button);
    btn.handle_button_press().await;
}
