//! # Alarm Controller
//! One iteration of the cooperative poll loop: read the clock, snapshot the target,
//! run the trigger against the collaborators and log what changed.

use crate::alarm::{AlarmState, AlarmTrigger, Tick, Transition, TriggerConfig};
use crate::clock::ClockSource;
use crate::io::{IndicatorSink, InputSource, OutputSink};
use crate::schedule::ScheduleSlot;
use embassy_time::Instant;

/// Wires the trigger to its clock, its schedule and its collaborators.
pub struct AlarmController<'a, C, O, N, I> {
    /// The state machine
    trigger: AlarmTrigger,
    /// Where local time comes from
    clock: &'a C,
    /// Where the target comes from
    schedule: &'a ScheduleSlot,
    /// Actuator line
    output: O,
    /// Colour indicator
    indicator: N,
    /// Dismissal buttons
    input: I,
}

impl<'a, C, O, N, I> AlarmController<'a, C, O, N, I>
where
    C: ClockSource,
    O: OutputSink,
    N: IndicatorSink,
    I: InputSource,
{
    /// Creates an armed controller.
    pub const fn new(
        config: TriggerConfig,
        clock: &'a C,
        schedule: &'a ScheduleSlot,
        output: O,
        indicator: N,
        input: I,
    ) -> Self {
        Self {
            trigger: AlarmTrigger::new(config),
            clock,
            schedule,
            output,
            indicator,
            input,
        }
    }

    /// Runs one poll cycle at the monotonic instant `now`.
    pub fn poll(&mut self, now: Instant) -> Option<Transition> {
        let tick = Tick {
            now,
            time: self.clock.current_time(now),
            target: self.schedule.snapshot(),
        };
        let transition = self.trigger.poll(
            &tick,
            &mut self.output,
            &mut self.indicator,
            &mut self.input,
        )?;

        match transition {
            Transition::Fired { at } => info!("alarm firing for {}", at),
            Transition::Dismissed { reason, fired_at } => {
                info!("alarm for {} dismissed: {}", fired_at, reason);
            }
            Transition::Rearmed => info!("alarm re-armed"),
        }
        Some(transition)
    }

    /// Returns the alarm state.
    pub const fn state(&self) -> AlarmState {
        self.trigger.state()
    }

    /// Returns the trigger, for inspection.
    pub const fn trigger(&self) -> &AlarmTrigger {
        &self.trigger
    }
}
