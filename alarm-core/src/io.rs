//! # Alarm collaborators
//! The actuator, the colour indicator and the button input the alarm talks to.
//! Implementations live with the platform drivers; they are assumed never to fail.

/// A colour for the indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Color {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
}

impl Color {
    /// Indicator off
    pub const OFF: Self = Self::new(0, 0, 0);
    /// Full red
    pub const RED: Self = Self::new(255, 0, 0);
    /// Full green
    pub const GREEN: Self = Self::new(0, 255, 0);

    /// Creates a colour from its channels.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// An input observed by the alarm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputEvent {
    /// The first dismissal button was pressed
    DismissA,
    /// The second dismissal button was pressed
    DismissB,
    /// Any other button, which never dismisses an alarm
    Other,
}

impl InputEvent {
    /// Returns true for the inputs that end a firing alarm.
    pub const fn is_dismissal(self) -> bool {
        matches!(self, Self::DismissA | Self::DismissB)
    }
}

/// The discrete actuator line
pub trait OutputSink {
    /// Drives the actuator to its active level, or releases it.
    fn set_output(&mut self, active: bool);
}

/// The colour indicator
pub trait IndicatorSink {
    /// Shows `color`.
    fn set_indicator(&mut self, color: Color);
}

/// Button-like input, sampled without blocking
pub trait InputSource {
    /// Returns the next pending input, if any.
    fn poll_input(&mut self) -> Option<InputEvent>;
}

impl<T: OutputSink + ?Sized> OutputSink for &mut T {
    fn set_output(&mut self, active: bool) {
        (**self).set_output(active);
    }
}

impl<T: IndicatorSink + ?Sized> IndicatorSink for &mut T {
    fn set_indicator(&mut self, color: Color) {
        (**self).set_indicator(color);
    }
}

impl<T: InputSource + ?Sized> InputSource for &mut T {
    fn poll_input(&mut self) -> Option<InputEvent> {
        (**self).poll_input()
    }
}
