use std::cell::Cell;
use std::time::Duration;

use crate::clock::Clock;
use crate::event::PuzzleEvent;

/// How long the trigger must stay down before a release starts the timer.
pub const HOLD_THRESHOLD: Duration = Duration::from_millis(500);

/// Pointer presses shorter than this are accidental taps.
pub const MIN_PRESS: Duration = Duration::from_millis(50);

/// Pointer releases farther than this from the press origin, on either
/// axis, are drags. Units are whatever coordinate space the host feeds in
/// (terminal cells here).
pub const TAP_SLOP: i32 = 10;

/// Visual phase of the timer; the renderer keys its colors on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Idle,
    Holding,
    ReadyToStart,
    Running,
}

/// A completed timing cycle. `time` is None for a DNF. The caller
/// attaches scramble, session id, date and a fresh id before persisting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measurement {
    pub time: Option<Duration>,
    pub event: PuzzleEvent,
}

/// Host-reported facts the input gate needs about an event's surroundings.
/// All default to false, i.e. nothing in the way.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputContext {
    /// A menu or dialog is open.
    pub overlay_open: bool,
    /// The event targets a widget marked exempt from timer control.
    pub target_exempt: bool,
    /// Focus sits on some widget rather than the timer surface.
    pub focus_captured: bool,
}

impl InputContext {
    pub fn should_ignore(&self) -> bool {
        self.overlay_open || self.target_exempt || self.focus_captured
    }
}

/// Keys the state machine distinguishes. Everything that is not the
/// trigger or the cancel key stops a run and never arms one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKey {
    /// The hold-to-start trigger (space).
    Trigger,
    /// Stops a running solve as a DNF (escape).
    Cancel,
    Other,
}

#[derive(Debug, Clone, Copy)]
struct PointerGesture {
    x: i32,
    y: i32,
    pressed_at: Duration,
}

/// Press/release driven stopwatch.
///
/// Transitions: Idle -> Holding on trigger press; Holding -> ReadyToStart
/// once the hold threshold elapses (checked cooperatively from `poll` or
/// on the release itself); ReadyToStart -> Running on release; Running ->
/// Idle on any press, emitting a measurement. Dropping the controller
/// drops the pending hold deadline with it; there are no timers to leak.
pub struct TimerController<C: Clock> {
    clock: C,
    event: PuzzleEvent,
    phase: TimerPhase,
    accumulated: Duration,
    segment_start: Option<Duration>,
    hold_deadline: Option<Duration>,
    last_reading: Cell<Duration>,
    gesture: Option<PointerGesture>,
}

impl<C: Clock> TimerController<C> {
    pub fn new(clock: C, event: PuzzleEvent) -> Self {
        Self {
            clock,
            event,
            phase: TimerPhase::Idle,
            accumulated: Duration::ZERO,
            segment_start: None,
            hold_deadline: None,
            last_reading: Cell::new(Duration::ZERO),
            gesture: None,
        }
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == TimerPhase::Running
    }

    pub fn event(&self) -> PuzzleEvent {
        self.event
    }

    pub fn set_event(&mut self, event: PuzzleEvent) {
        self.event = event;
    }

    /// Clock read that never goes backwards: a non-monotonic reading
    /// clamps to the previous one so deltas cannot turn negative. Shared
    /// by transitions and the read-only display path, hence the Cell.
    fn now(&self) -> Duration {
        let reading = self.clock.now().max(self.last_reading.get());
        self.last_reading.set(reading);
        reading
    }

    /// A key went down. Returns the measurement when this press stops a
    /// run; the caller persists it before processing further input.
    pub fn key_pressed(
        &mut self,
        key: TimerKey,
        repeat: bool,
        ctx: InputContext,
    ) -> Option<Measurement> {
        if ctx.should_ignore() {
            return None;
        }

        if self.phase == TimerPhase::Running {
            return Some(self.stop(key == TimerKey::Cancel));
        }

        if key == TimerKey::Trigger && !repeat && self.phase == TimerPhase::Idle {
            let now = self.now();
            self.phase = TimerPhase::Holding;
            self.hold_deadline = Some(now + HOLD_THRESHOLD);
        }
        None
    }

    /// A key came back up. Only the trigger matters here: an early release
    /// abandons the hold, a late one starts the solve.
    pub fn key_released(&mut self, key: TimerKey, ctx: InputContext) {
        if ctx.should_ignore() {
            return;
        }
        if key != TimerKey::Trigger {
            return;
        }
        self.release();
    }

    /// Cooperative stand-in for a delayed callback: promotes Holding to
    /// ReadyToStart once the hold deadline passes. Returns true when the
    /// phase changed and a redraw is worth it.
    pub fn poll(&mut self) -> bool {
        if self.phase != TimerPhase::Holding {
            return false;
        }
        match self.hold_deadline {
            Some(deadline) if self.now() >= deadline => {
                self.hold_deadline = None;
                self.phase = TimerPhase::ReadyToStart;
                true
            }
            _ => false,
        }
    }

    /// Pointer/touch press. Arms only when the gesture begins on the timer
    /// surface; while running, any press stops the solve immediately.
    pub fn pointer_pressed(
        &mut self,
        x: i32,
        y: i32,
        on_surface: bool,
        ctx: InputContext,
    ) -> Option<Measurement> {
        if ctx.should_ignore() {
            return None;
        }

        if self.phase == TimerPhase::Running {
            return Some(self.stop(false));
        }
        if !on_surface || self.phase != TimerPhase::Idle {
            return None;
        }

        let now = self.now();
        self.gesture = Some(PointerGesture { x, y, pressed_at: now });
        self.phase = TimerPhase::Holding;
        self.hold_deadline = Some(now + HOLD_THRESHOLD);
        None
    }

    /// Pointer/touch release. Taps that moved beyond the slop or lasted
    /// under the minimum press are discarded without a transition.
    pub fn pointer_released(&mut self, x: i32, y: i32, ctx: InputContext) {
        let gesture = self.gesture.take();
        if ctx.should_ignore() {
            return;
        }
        let Some(gesture) = gesture else { return };

        let now = self.now();
        let held = now.saturating_sub(gesture.pressed_at);
        let dragged = (x - gesture.x).abs() > TAP_SLOP || (y - gesture.y).abs() > TAP_SLOP;
        if dragged || held < MIN_PRESS {
            self.hold_deadline = None;
            if matches!(self.phase, TimerPhase::Holding | TimerPhase::ReadyToStart) {
                self.phase = TimerPhase::Idle;
            }
            return;
        }

        self.release();
    }

    fn release(&mut self) {
        let deadline = self.hold_deadline.take();
        match self.phase {
            TimerPhase::ReadyToStart => self.start(),
            TimerPhase::Holding => {
                // The deadline may have lapsed without a poll in between;
                // the release itself decides, so the 500ms boundary holds
                // regardless of tick cadence.
                match deadline {
                    Some(d) if self.now() >= d => self.start(),
                    _ => self.phase = TimerPhase::Idle,
                }
            }
            _ => {}
        }
    }

    fn start(&mut self) {
        self.accumulated = Duration::ZERO;
        self.segment_start = Some(self.now());
        self.phase = TimerPhase::Running;
    }

    fn stop(&mut self, dnf: bool) -> Measurement {
        if let Some(started) = self.segment_start.take() {
            self.accumulated += self.now().saturating_sub(started);
        }
        self.phase = TimerPhase::Idle;
        Measurement {
            time: (!dnf).then_some(self.accumulated),
            event: self.event,
        }
    }

    /// The elapsed time to paint right now. A read-only projection: while
    /// running it is banked time plus the live segment, otherwise the last
    /// completed total.
    pub fn displayed_elapsed(&self) -> Duration {
        match (self.phase, self.segment_start) {
            (TimerPhase::Running, Some(started)) => {
                self.accumulated + self.now().saturating_sub(started)
            }
            _ => self.accumulated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use assert_matches::assert_matches;

    fn controller() -> (ManualClock, TimerController<ManualClock>) {
        let clock = ManualClock::new();
        let controller = TimerController::new(clock.clone(), PuzzleEvent::Cube333);
        (clock, controller)
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    const OPEN: InputContext = InputContext {
        overlay_open: false,
        target_exempt: false,
        focus_captured: false,
    };

    fn start_running(clock: &ManualClock, timer: &mut TimerController<ManualClock>) {
        timer.key_pressed(TimerKey::Trigger, false, OPEN);
        clock.advance(ms(600));
        assert!(timer.poll());
        timer.key_released(TimerKey::Trigger, OPEN);
        assert_eq!(timer.phase(), TimerPhase::Running);
    }

    #[test]
    fn hold_and_release_starts_the_timer() {
        let (clock, mut timer) = controller();
        timer.key_pressed(TimerKey::Trigger, false, OPEN);
        assert_eq!(timer.phase(), TimerPhase::Holding);

        clock.advance(ms(501));
        assert!(timer.poll());
        assert_eq!(timer.phase(), TimerPhase::ReadyToStart);

        timer.key_released(TimerKey::Trigger, OPEN);
        assert_eq!(timer.phase(), TimerPhase::Running);
    }

    #[test]
    fn early_release_returns_to_idle_without_a_measurement() {
        let (clock, mut timer) = controller();
        timer.key_pressed(TimerKey::Trigger, false, OPEN);
        clock.advance(ms(499));
        timer.poll();
        timer.key_released(TimerKey::Trigger, OPEN);
        assert_eq!(timer.phase(), TimerPhase::Idle);
    }

    #[test]
    fn threshold_is_exact_even_without_a_poll() {
        // 499ms hold never starts, 501ms does, whether or not a tick
        // happened to land in between
        let (clock, mut timer) = controller();
        timer.key_pressed(TimerKey::Trigger, false, OPEN);
        clock.advance(ms(501));
        timer.key_released(TimerKey::Trigger, OPEN);
        assert_eq!(timer.phase(), TimerPhase::Running);
    }

    #[test]
    fn repeat_presses_do_not_arm() {
        let (_clock, mut timer) = controller();
        timer.key_pressed(TimerKey::Trigger, true, OPEN);
        assert_eq!(timer.phase(), TimerPhase::Idle);
    }

    #[test]
    fn non_trigger_keys_do_not_arm() {
        let (_clock, mut timer) = controller();
        assert_eq!(timer.key_pressed(TimerKey::Other, false, OPEN), None);
        assert_eq!(timer.phase(), TimerPhase::Idle);
    }

    #[test]
    fn stop_emits_the_elapsed_duration() {
        let (clock, mut timer) = controller();
        start_running(&clock, &mut timer);

        clock.advance(ms(9_870));
        let measurement = timer.key_pressed(TimerKey::Other, false, OPEN);
        assert_matches!(
            measurement,
            Some(Measurement { time: Some(t), .. }) if t == ms(9_870)
        );
        assert_eq!(timer.phase(), TimerPhase::Idle);
        assert_eq!(timer.displayed_elapsed(), ms(9_870));
    }

    #[test]
    fn trigger_also_stops_a_running_solve() {
        let (clock, mut timer) = controller();
        start_running(&clock, &mut timer);
        clock.advance(ms(1_000));
        assert_matches!(
            timer.key_pressed(TimerKey::Trigger, false, OPEN),
            Some(Measurement { time: Some(_), .. })
        );
    }

    #[test]
    fn cancel_emits_a_dnf() {
        let (clock, mut timer) = controller();
        start_running(&clock, &mut timer);

        clock.advance(ms(4_000));
        let measurement = timer.key_pressed(TimerKey::Cancel, false, OPEN);
        assert_matches!(measurement, Some(Measurement { time: None, .. }));
        assert_eq!(timer.phase(), TimerPhase::Idle);
    }

    #[test]
    fn displayed_elapsed_tracks_a_running_solve() {
        let (clock, mut timer) = controller();
        start_running(&clock, &mut timer);
        clock.advance(ms(1_234));
        assert_eq!(timer.displayed_elapsed(), ms(1_234));
        clock.advance(ms(766));
        assert_eq!(timer.displayed_elapsed(), ms(2_000));
    }

    #[test]
    fn a_fresh_solve_resets_the_accumulated_time() {
        let (clock, mut timer) = controller();
        start_running(&clock, &mut timer);
        clock.advance(ms(5_000));
        timer.key_pressed(TimerKey::Other, false, OPEN);

        start_running(&clock, &mut timer);
        clock.advance(ms(100));
        assert_eq!(timer.displayed_elapsed(), ms(100));
    }

    #[test]
    fn gated_input_never_transitions() {
        let (clock, mut timer) = controller();
        let overlay = InputContext {
            overlay_open: true,
            ..InputContext::default()
        };
        timer.key_pressed(TimerKey::Trigger, false, overlay);
        assert_eq!(timer.phase(), TimerPhase::Idle);

        // and a running solve keeps running under an overlay
        start_running(&clock, &mut timer);
        assert_eq!(timer.key_pressed(TimerKey::Other, false, overlay), None);
        assert!(timer.is_running());
    }

    #[test]
    fn gated_release_keeps_the_hold() {
        let (clock, mut timer) = controller();
        timer.key_pressed(TimerKey::Trigger, false, OPEN);
        let exempt = InputContext {
            target_exempt: true,
            ..InputContext::default()
        };
        timer.key_released(TimerKey::Trigger, exempt);
        assert_eq!(timer.phase(), TimerPhase::Holding);
        clock.advance(ms(600));
        timer.key_released(TimerKey::Trigger, OPEN);
        assert_eq!(timer.phase(), TimerPhase::Running);
    }

    #[test]
    fn pointer_hold_on_the_surface_starts_the_timer() {
        let (clock, mut timer) = controller();
        timer.pointer_pressed(10, 10, true, OPEN);
        assert_eq!(timer.phase(), TimerPhase::Holding);
        clock.advance(ms(600));
        timer.pointer_released(12, 10, OPEN);
        assert_eq!(timer.phase(), TimerPhase::Running);
    }

    #[test]
    fn pointer_off_the_surface_is_ignored() {
        let (_clock, mut timer) = controller();
        timer.pointer_pressed(10, 10, false, OPEN);
        assert_eq!(timer.phase(), TimerPhase::Idle);
    }

    #[test]
    fn dragged_release_is_discarded() {
        let (clock, mut timer) = controller();
        timer.pointer_pressed(10, 10, true, OPEN);
        clock.advance(ms(600));
        timer.pointer_released(21, 10, OPEN);
        assert_eq!(timer.phase(), TimerPhase::Idle);
    }

    #[test]
    fn sub_minimum_press_is_discarded() {
        let (clock, mut timer) = controller();
        timer.pointer_pressed(10, 10, true, OPEN);
        clock.advance(ms(40));
        timer.pointer_released(10, 10, OPEN);
        assert_eq!(timer.phase(), TimerPhase::Idle);
    }

    #[test]
    fn pointer_press_stops_a_running_solve() {
        let (clock, mut timer) = controller();
        start_running(&clock, &mut timer);
        clock.advance(ms(2_500));
        let measurement = timer.pointer_pressed(0, 0, false, OPEN);
        assert_matches!(
            measurement,
            Some(Measurement { time: Some(t), .. }) if t == ms(2_500)
        );
    }

    #[test]
    fn backwards_clock_reads_clamp_to_zero_delta() {
        let (clock, mut timer) = controller();
        start_running(&clock, &mut timer);
        clock.advance(ms(3_000));
        assert_eq!(timer.displayed_elapsed(), ms(3_000));

        // the source jumps backwards mid-segment
        clock.set(ms(100));
        assert_eq!(timer.displayed_elapsed(), ms(3_000));
        let measurement = timer.key_pressed(TimerKey::Other, false, OPEN);
        assert_matches!(
            measurement,
            Some(Measurement { time: Some(t), .. }) if t == ms(3_000)
        );
    }

    #[test]
    fn measurement_carries_the_active_event() {
        let (clock, mut timer) = controller();
        timer.set_event(PuzzleEvent::Cube222);
        start_running(&clock, &mut timer);
        let measurement = timer.key_pressed(TimerKey::Other, false, OPEN).unwrap();
        assert_eq!(measurement.event, PuzzleEvent::Cube222);
    }
}
