//! Recording collaborators for the unit tests.

use crate::io::{Color, IndicatorSink, InputEvent, InputSource, OutputSink};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

/// Records every actuator level it is driven to
#[derive(Debug, Default)]
pub struct RecordingOutput {
    /// Levels in the order they were set
    pub levels: Vec<bool>,
}

impl RecordingOutput {
    /// The level set last
    pub fn last(&self) -> Option<bool> {
        self.levels.last().copied()
    }
}

impl OutputSink for RecordingOutput {
    fn set_output(&mut self, active: bool) {
        self.levels.push(active);
    }
}

/// Records every colour it is asked to show
#[derive(Debug, Default)]
pub struct RecordingIndicator {
    /// Colours in the order they were set
    pub colors: Vec<Color>,
}

impl RecordingIndicator {
    /// The colour set last
    pub fn last(&self) -> Option<Color> {
        self.colors.last().copied()
    }
}

impl IndicatorSink for RecordingIndicator {
    fn set_indicator(&mut self, color: Color) {
        self.colors.push(color);
    }
}

/// Both sinks together
#[derive(Debug, Default)]
pub struct Actuators {
    /// The actuator line
    pub output: RecordingOutput,
    /// The colour indicator
    pub indicator: RecordingIndicator,
}

/// Hands out queued inputs, one per poll.
/// Clones share the queue, so a test can keep pressing buttons while a controller owns the input.
#[derive(Debug, Default, Clone)]
pub struct ScriptedInput {
    /// Inputs not yet handed out
    pending: Rc<RefCell<VecDeque<InputEvent>>>,
}

impl ScriptedInput {
    /// Queues `events`.
    pub fn new(events: &[InputEvent]) -> Self {
        Self {
            pending: Rc::new(RefCell::new(events.iter().copied().collect())),
        }
    }

    /// No input at all.
    pub fn idle() -> Self {
        Self::default()
    }

    /// Inputs not yet consumed
    pub fn remaining(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Queues one more input.
    pub fn push(&self, event: InputEvent) {
        self.pending.borrow_mut().push_back(event);
    }
}

impl InputSource for ScriptedInput {
    fn poll_input(&mut self) -> Option<InputEvent> {
        self.pending.borrow_mut().pop_front()
    }
}
