//! # Alarm Trigger
//! The state machine that decides when the alarm goes off and when it stops.
//!
//! ```text
//!            target minute == current minute
//!   Armed ───────────────────────────────────▶ Firing
//!     ▲                                          │ dismissal input
//!     │ minute advanced                          │ (or optional timeout)
//!     └──────────────── Cooldown ◀───────────────┘
//! ```
//!
//! Matching happens at minute granularity, so the match condition holds for a whole
//! minute. `Cooldown` keeps the alarm from firing again after a dismissal until the clock
//! has left the minute it fired in.
//!
//! While firing, the output is held active and the indicator alternates between two
//! colours. The colour flips on a monotonic deadline that is checked on every poll, the
//! state machine itself never waits.

use crate::io::{Color, IndicatorSink, InputEvent, InputSource, OutputSink};
use crate::schedule::TargetTime;
use crate::time::{CurrentTime, MinuteStamp};
use embassy_time::{Duration, Instant};

/// Time each indicator colour is shown while firing
pub const DEFAULT_FLASH_PERIOD: Duration = Duration::from_millis(300);

/// Tunables for [`AlarmTrigger`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TriggerConfig {
    /// Time each flash colour is shown
    pub flash_period: Duration,
    /// The two colours the indicator alternates between while firing
    pub flash_colors: [Color; 2],
    /// Stop firing on its own after this long. `None` waits for a dismissal forever.
    pub firing_timeout: Option<Duration>,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            flash_period: DEFAULT_FLASH_PERIOD,
            flash_colors: [Color::RED, Color::GREEN],
            firing_timeout: None,
        }
    }
}

/// The externally visible state of the alarm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlarmState {
    /// Waiting for the clock to reach the target
    Armed,
    /// Signalling, waiting for a dismissal
    Firing,
    /// Dismissed, waiting for the fired minute to pass
    Cooldown,
}

/// Why the alarm stopped firing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DismissReason {
    /// A dismissal button was pressed
    Input(InputEvent),
    /// The configured firing timeout elapsed
    Timeout,
}

/// A state change produced by [`AlarmTrigger::poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transition {
    /// Armed -> Firing
    Fired {
        /// The minute the alarm fired in
        at: MinuteStamp,
    },
    /// Firing -> Cooldown
    Dismissed {
        /// What ended the alarm
        reason: DismissReason,
        /// The minute the alarm fired in
        fired_at: MinuteStamp,
    },
    /// Cooldown -> Armed
    Rearmed,
}

/// One poll cycle's view of the world
#[derive(Debug, Clone, Copy)]
pub struct Tick {
    /// Monotonic time of this poll
    pub now: Instant,
    /// Local wall time, `None` while the clock is not synchronized
    pub time: Option<CurrentTime>,
    /// The latest alarm target, `None` until one was received
    pub target: Option<TargetTime>,
}

/// Bookkeeping while the alarm is firing
#[derive(Debug, Clone, Copy)]
struct Firing {
    /// The minute the alarm fired in
    fired_at: MinuteStamp,
    /// When firing started
    since: Instant,
    /// Index into [`TriggerConfig::flash_colors`] currently shown
    color_index: usize,
    /// When the indicator flips to the other colour
    next_flip: Instant,
}

/// Internal state, carrying the data each state needs
#[derive(Debug, Clone, Copy)]
enum Phase {
    /// See [`AlarmState::Armed`]
    Armed,
    /// See [`AlarmState::Firing`]
    Firing(Firing),
    /// See [`AlarmState::Cooldown`]
    Cooldown {
        /// The minute the alarm fired in
        fired_at: MinuteStamp,
    },
}

/// The alarm trigger state machine. Owns the alarm state, nothing else touches it.
#[derive(Debug)]
pub struct AlarmTrigger {
    /// Tunables
    config: TriggerConfig,
    /// Current state
    phase: Phase,
}

impl AlarmTrigger {
    /// Creates an armed trigger.
    pub const fn new(config: TriggerConfig) -> Self {
        Self {
            config,
            phase: Phase::Armed,
        }
    }

    /// Returns the current state.
    pub const fn state(&self) -> AlarmState {
        match self.phase {
            Phase::Armed => AlarmState::Armed,
            Phase::Firing(_) => AlarmState::Firing,
            Phase::Cooldown { .. } => AlarmState::Cooldown,
        }
    }

    /// Returns the minute the alarm fired in, while firing or cooling down.
    pub const fn fired_at(&self) -> Option<MinuteStamp> {
        match self.phase {
            Phase::Armed => None,
            Phase::Firing(Firing { fired_at, .. }) | Phase::Cooldown { fired_at } => {
                Some(fired_at)
            }
        }
    }

    /// Returns the minute-of-hour the alarm fired in, while firing or cooling down.
    pub const fn fired_minute(&self) -> Option<u8> {
        match self.fired_at() {
            Some(stamp) => Some(stamp.minute),
            None => None,
        }
    }

    /// Returns the configuration.
    pub const fn config(&self) -> &TriggerConfig {
        &self.config
    }

    /// Runs one poll cycle.
    /// Drives `output` and `indicator` according to the state and samples `input` while firing.
    pub fn poll(
        &mut self,
        tick: &Tick,
        output: &mut impl OutputSink,
        indicator: &mut impl IndicatorSink,
        input: &mut impl InputSource,
    ) -> Option<Transition> {
        match self.phase {
            Phase::Armed => self.poll_armed(tick, output, indicator, input),
            Phase::Firing(firing) => self.poll_firing(firing, tick, output, indicator, input),
            Phase::Cooldown { fired_at } => self.poll_cooldown(fired_at, tick),
        }
    }

    /// Armed: fire once the current minute equals the target.
    /// Input queued before the alarm went off is dropped, only presses made while firing dismiss.
    fn poll_armed(
        &mut self,
        tick: &Tick,
        output: &mut impl OutputSink,
        indicator: &mut impl IndicatorSink,
        input: &mut impl InputSource,
    ) -> Option<Transition> {
        let (Some(time), Some(target)) = (tick.time, tick.target) else {
            return None;
        };
        let now_minute = time.minute_stamp();
        if now_minute != target {
            return None;
        }

        let firing = Firing {
            fired_at: now_minute,
            since: tick.now,
            color_index: 0,
            next_flip: tick.now + self.config.flash_period,
        };
        while input.poll_input().is_some() {}
        self.phase = Phase::Firing(firing);
        output.set_output(true);
        indicator.set_indicator(self.config.flash_colors[0]);
        Some(Transition::Fired { at: now_minute })
    }

    /// Firing: keep signalling until a dismissal input or the optional timeout.
    fn poll_firing(
        &mut self,
        mut firing: Firing,
        tick: &Tick,
        output: &mut impl OutputSink,
        indicator: &mut impl IndicatorSink,
        input: &mut impl InputSource,
    ) -> Option<Transition> {
        let reason = match input.poll_input() {
            Some(event) if event.is_dismissal() => Some(DismissReason::Input(event)),
            _ => self.timed_out(&firing, tick.now).then_some(DismissReason::Timeout),
        };

        if let Some(reason) = reason {
            output.set_output(false);
            indicator.set_indicator(Color::OFF);
            self.phase = Phase::Cooldown {
                fired_at: firing.fired_at,
            };
            return Some(Transition::Dismissed {
                reason,
                fired_at: firing.fired_at,
            });
        }

        if tick.now >= firing.next_flip {
            firing.color_index = (firing.color_index + 1) % self.config.flash_colors.len();
            firing.next_flip += self.config.flash_period;
            // after a stall, restart the cadence instead of flipping to catch up
            if firing.next_flip <= tick.now {
                firing.next_flip = tick.now + self.config.flash_period;
            }
        }
        output.set_output(true);
        indicator.set_indicator(self.config.flash_colors[firing.color_index]);
        self.phase = Phase::Firing(firing);
        None
    }

    /// Cooldown: re-arm once the clock has left the fired minute.
    fn poll_cooldown(&mut self, fired_at: MinuteStamp, tick: &Tick) -> Option<Transition> {
        let time = tick.time?;
        if time.minute_stamp() == fired_at {
            return None;
        }
        self.phase = Phase::Armed;
        Some(Transition::Rearmed)
    }

    /// Returns true if firing has lasted longer than the configured timeout.
    fn timed_out(&self, firing: &Firing, now: Instant) -> bool {
        self.config
            .firing_timeout
            .is_some_and(|limit| now.saturating_duration_since(firing.since) >= limit)
    }
}

impl Default for AlarmTrigger {
    fn default() -> Self {
        Self::new(TriggerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Actuators, ScriptedInput};

    /// 2024-06-01 14:30
    const TARGET: TargetTime = TargetTime::new(2024, 6, 1, 14, 30);

    /// A synchronized tick at 2024-06-01 `hour:minute:second`, `ms` into the run
    fn tick(ms: u64, hour: u8, minute: u8, second: u8) -> Tick {
        Tick {
            now: Instant::from_millis(ms),
            time: Some(CurrentTime::new(2024, 6, 1, hour, minute, second)),
            target: Some(TARGET),
        }
    }

    /// Polls with no input
    fn poll(trigger: &mut AlarmTrigger, act: &mut Actuators, tick: &Tick) -> Option<Transition> {
        trigger.poll(tick, &mut act.output, &mut act.indicator, &mut ScriptedInput::idle())
    }

    /// Drives a fresh trigger into Firing at 14:30:00
    fn firing_trigger(config: TriggerConfig) -> (AlarmTrigger, Actuators) {
        let mut trigger = AlarmTrigger::new(config);
        let mut act = Actuators::default();
        assert_eq!(
            poll(&mut trigger, &mut act, &tick(0, 14, 30, 0)),
            Some(Transition::Fired { at: TARGET })
        );
        (trigger, act)
    }

    #[test]
    fn stays_armed_before_the_target() {
        let mut trigger = AlarmTrigger::default();
        let mut act = Actuators::default();
        for (i, (h, m, s)) in [(13, 0, 0), (14, 29, 0), (14, 29, 59)].into_iter().enumerate() {
            assert_eq!(poll(&mut trigger, &mut act, &tick(i as u64 * 1000, h, m, s)), None);
            assert_eq!(trigger.state(), AlarmState::Armed);
        }
        assert!(act.output.levels.is_empty());
        assert!(act.indicator.colors.is_empty());
    }

    #[test]
    fn fires_on_the_first_matching_poll() {
        let (trigger, act) = firing_trigger(TriggerConfig::default());
        assert_eq!(trigger.state(), AlarmState::Firing);
        assert_eq!(trigger.fired_minute(), Some(30));
        assert_eq!(act.output.last(), Some(true));
        assert_eq!(act.indicator.last(), Some(Color::RED));
    }

    #[test]
    fn fires_mid_minute_too() {
        let mut trigger = AlarmTrigger::default();
        let mut act = Actuators::default();
        assert!(poll(&mut trigger, &mut act, &tick(0, 14, 30, 42)).is_some());
        assert_eq!(trigger.state(), AlarmState::Firing);
    }

    #[test]
    fn never_fires_without_a_target() {
        let mut trigger = AlarmTrigger::default();
        let mut act = Actuators::default();
        let mut t = tick(0, 14, 30, 0);
        t.target = None;
        assert_eq!(poll(&mut trigger, &mut act, &t), None);
        assert_eq!(trigger.state(), AlarmState::Armed);
    }

    #[test]
    fn never_fires_while_unsynchronized() {
        let mut trigger = AlarmTrigger::default();
        let mut act = Actuators::default();
        let mut t = tick(0, 14, 30, 0);
        t.time = None;
        assert_eq!(poll(&mut trigger, &mut act, &t), None);
        assert_eq!(trigger.state(), AlarmState::Armed);
        assert!(act.output.levels.is_empty());
    }

    #[test]
    fn date_must_match_as_well() {
        let mut trigger = AlarmTrigger::default();
        let mut act = Actuators::default();
        let mut t = tick(0, 14, 30, 0);
        t.time = Some(CurrentTime::new(2024, 6, 2, 14, 30, 0));
        assert_eq!(poll(&mut trigger, &mut act, &t), None);
        assert_eq!(trigger.state(), AlarmState::Armed);
    }

    #[test]
    fn keeps_firing_without_dismissal() {
        let (mut trigger, mut act) = firing_trigger(TriggerConfig::default());
        // an hour of polls later the alarm is still going
        for step in 1..=72 {
            let ms = step * 50_000;
            let minute = 30 + (ms / 60_000) as u8 % 30;
            assert_eq!(poll(&mut trigger, &mut act, &tick(ms, 14, minute, 0)), None);
            assert_eq!(trigger.state(), AlarmState::Firing);
            assert_eq!(act.output.last(), Some(true));
        }
    }

    #[test]
    fn alternates_indicator_colors() {
        let (mut trigger, mut act) = firing_trigger(TriggerConfig::default());
        let shown = |trigger: &mut AlarmTrigger, act: &mut Actuators, ms| {
            poll(trigger, act, &tick(ms, 14, 30, 0));
            act.indicator.last()
        };
        assert_eq!(shown(&mut trigger, &mut act, 100), Some(Color::RED));
        assert_eq!(shown(&mut trigger, &mut act, 299), Some(Color::RED));
        assert_eq!(shown(&mut trigger, &mut act, 300), Some(Color::GREEN));
        assert_eq!(shown(&mut trigger, &mut act, 550), Some(Color::GREEN));
        assert_eq!(shown(&mut trigger, &mut act, 600), Some(Color::RED));
        // a long stall flips once and restarts the cadence from there
        assert_eq!(shown(&mut trigger, &mut act, 5_000), Some(Color::GREEN));
        assert_eq!(shown(&mut trigger, &mut act, 5_299), Some(Color::GREEN));
        assert_eq!(shown(&mut trigger, &mut act, 5_300), Some(Color::RED));
    }

    #[test]
    fn either_button_dismisses() {
        for button in [InputEvent::DismissA, InputEvent::DismissB] {
            let (mut trigger, mut act) = firing_trigger(TriggerConfig::default());
            let mut input = ScriptedInput::new(&[button]);
            let t = tick(45_000, 14, 30, 45);
            assert_eq!(
                trigger.poll(&t, &mut act.output, &mut act.indicator, &mut input),
                Some(Transition::Dismissed {
                    reason: DismissReason::Input(button),
                    fired_at: TARGET
                })
            );
            assert_eq!(trigger.state(), AlarmState::Cooldown);
            assert_eq!(trigger.fired_minute(), Some(30));
            assert_eq!(act.output.last(), Some(false));
            assert_eq!(act.indicator.last(), Some(Color::OFF));

            // the transition happens once, later polls stay quiet
            let writes = act.output.levels.len();
            assert_eq!(poll(&mut trigger, &mut act, &tick(45_050, 14, 30, 45)), None);
            assert_eq!(act.output.levels.len(), writes);
        }
    }

    #[test]
    fn other_inputs_do_not_dismiss() {
        let (mut trigger, mut act) = firing_trigger(TriggerConfig::default());
        let mut input = ScriptedInput::new(&[InputEvent::Other]);
        let t = tick(1_000, 14, 30, 1);
        assert_eq!(
            trigger.poll(&t, &mut act.output, &mut act.indicator, &mut input),
            None
        );
        assert_eq!(trigger.state(), AlarmState::Firing);
        assert_eq!(act.output.last(), Some(true));
    }

    #[test]
    fn input_is_only_sampled_while_firing() {
        let mut trigger = AlarmTrigger::default();
        let mut act = Actuators::default();
        let mut input = ScriptedInput::new(&[InputEvent::DismissA]);
        trigger.poll(
            &tick(0, 14, 0, 0),
            &mut act.output,
            &mut act.indicator,
            &mut input,
        );
        assert_eq!(input.remaining(), 1);
    }

    #[test]
    fn press_queued_before_firing_does_not_dismiss() {
        let mut trigger = AlarmTrigger::default();
        let mut act = Actuators::default();
        let mut input = ScriptedInput::idle();

        let t = tick(59_950, 14, 29, 59);
        assert_eq!(trigger.poll(&t, &mut act.output, &mut act.indicator, &mut input), None);
        input.push(InputEvent::DismissA);
        let t = tick(60_000, 14, 30, 0);
        assert_eq!(
            trigger.poll(&t, &mut act.output, &mut act.indicator, &mut input),
            Some(Transition::Fired { at: TARGET })
        );
        assert_eq!(input.remaining(), 0);
        let t = tick(60_050, 14, 30, 0);
        assert_eq!(trigger.poll(&t, &mut act.output, &mut act.indicator, &mut input), None);
        assert_eq!(trigger.state(), AlarmState::Firing);

        // a press made while firing still dismisses
        input.push(InputEvent::DismissA);
        let t = tick(60_100, 14, 30, 0);
        assert!(matches!(
            trigger.poll(&t, &mut act.output, &mut act.indicator, &mut input),
            Some(Transition::Dismissed { .. })
        ));
    }

    #[test]
    fn cooldown_blocks_refire_within_the_minute() {
        let (mut trigger, mut act) = firing_trigger(TriggerConfig::default());
        let mut input = ScriptedInput::new(&[InputEvent::DismissA]);
        trigger.poll(
            &tick(45_000, 14, 30, 45),
            &mut act.output,
            &mut act.indicator,
            &mut input,
        );

        // target still matches, but we already fired in this minute
        for (ms, s) in [(50_000, 50), (59_000, 59), (59_950, 59)] {
            assert_eq!(poll(&mut trigger, &mut act, &tick(ms, 14, 30, s)), None);
            assert_eq!(trigger.state(), AlarmState::Cooldown);
        }
        assert_eq!(act.output.last(), Some(false));

        // minute rolls over: re-armed, and the passed target does not fire again
        assert_eq!(
            poll(&mut trigger, &mut act, &tick(60_000, 14, 31, 0)),
            Some(Transition::Rearmed)
        );
        assert_eq!(trigger.state(), AlarmState::Armed);
        assert_eq!(trigger.fired_minute(), None);
        assert_eq!(poll(&mut trigger, &mut act, &tick(60_050, 14, 31, 0)), None);
        assert_eq!(trigger.state(), AlarmState::Armed);
    }

    #[test]
    fn cooldown_waits_for_a_synchronized_clock() {
        let (mut trigger, mut act) = firing_trigger(TriggerConfig::default());
        let mut input = ScriptedInput::new(&[InputEvent::DismissB]);
        trigger.poll(
            &tick(1_000, 14, 30, 1),
            &mut act.output,
            &mut act.indicator,
            &mut input,
        );
        let mut t = tick(61_000, 14, 31, 1);
        t.time = None;
        assert_eq!(poll(&mut trigger, &mut act, &t), None);
        assert_eq!(trigger.state(), AlarmState::Cooldown);
    }

    #[test]
    fn rearms_for_a_new_target() {
        let (mut trigger, mut act) = firing_trigger(TriggerConfig::default());
        let mut input = ScriptedInput::new(&[InputEvent::DismissA]);
        trigger.poll(
            &tick(10_000, 14, 30, 10),
            &mut act.output,
            &mut act.indicator,
            &mut input,
        );
        assert_eq!(
            poll(&mut trigger, &mut act, &tick(60_000, 14, 31, 0)),
            Some(Transition::Rearmed)
        );

        let next = TargetTime::new(2024, 6, 1, 14, 32);
        let mut t = tick(120_000, 14, 32, 0);
        t.target = Some(next);
        assert_eq!(
            poll(&mut trigger, &mut act, &t),
            Some(Transition::Fired { at: next })
        );
        assert_eq!(trigger.fired_minute(), Some(32));
    }

    #[test]
    fn optional_timeout_ends_firing() {
        let config = TriggerConfig {
            firing_timeout: Some(Duration::from_secs(300)),
            ..TriggerConfig::default()
        };
        let (mut trigger, mut act) = firing_trigger(config);
        assert_eq!(poll(&mut trigger, &mut act, &tick(299_999, 14, 34, 59)), None);
        assert_eq!(trigger.state(), AlarmState::Firing);

        assert_eq!(
            poll(&mut trigger, &mut act, &tick(300_000, 14, 35, 0)),
            Some(Transition::Dismissed {
                reason: DismissReason::Timeout,
                fired_at: TARGET
            })
        );
        assert_eq!(act.output.last(), Some(false));
        // the fired minute is long gone, so the next poll re-arms
        assert_eq!(
            poll(&mut trigger, &mut act, &tick(300_050, 14, 35, 0)),
            Some(Transition::Rearmed)
        );
    }

    #[test]
    fn walks_through_the_reference_scenario() {
        let mut trigger = AlarmTrigger::default();
        let mut act = Actuators::default();

        assert!(poll(&mut trigger, &mut act, &tick(0, 14, 29, 59)).is_none());
        assert_eq!(trigger.state(), AlarmState::Armed);

        assert!(poll(&mut trigger, &mut act, &tick(1_000, 14, 30, 0)).is_some());
        assert_eq!(trigger.state(), AlarmState::Firing);

        let mut input = ScriptedInput::new(&[InputEvent::DismissA]);
        trigger.poll(
            &tick(46_000, 14, 30, 45),
            &mut act.output,
            &mut act.indicator,
            &mut input,
        );
        assert_eq!(trigger.state(), AlarmState::Cooldown);
        assert_eq!(trigger.fired_minute(), Some(30));

        poll(&mut trigger, &mut act, &tick(60_000, 14, 30, 59));
        assert_eq!(trigger.state(), AlarmState::Cooldown);

        poll(&mut trigger, &mut act, &tick(61_000, 14, 31, 0));
        assert_eq!(trigger.state(), AlarmState::Armed);

        poll(&mut trigger, &mut act, &tick(62_000, 14, 31, 1));
        assert_eq!(trigger.state(), AlarmState::Armed);
    }
}
