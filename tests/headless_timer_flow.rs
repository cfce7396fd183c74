use std::sync::mpsc;
use std::time::Duration;

use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use kubik::clock::ManualClock;
use kubik::event::PuzzleEvent;
use kubik::runtime::{AppEvent, FixedTicker, Runner, TestEventSource};
use kubik::session::ensure_session;
use kubik::store::{Solve, SolveDb};
use kubik::timer::{InputContext, Measurement, TimerController, TimerKey};
use kubik::util::new_id;

// Headless flows using the internal runtime + TimerController without a
// TTY: events come from TestEventSource, time from a ManualClock.

fn timer_key(code: KeyCode) -> TimerKey {
    match code {
        KeyCode::Char(' ') => TimerKey::Trigger,
        KeyCode::Esc => TimerKey::Cancel,
        _ => TimerKey::Other,
    }
}

fn press(code: KeyCode) -> AppEvent {
    AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

fn release(code: KeyCode) -> AppEvent {
    AppEvent::Key(KeyEvent::new_with_kind(
        code,
        KeyModifiers::NONE,
        KeyEventKind::Release,
    ))
}

struct Harness {
    clock: ManualClock,
    timer: TimerController<ManualClock>,
    runner: Runner<TestEventSource, FixedTicker>,
    tx: mpsc::Sender<AppEvent>,
    measurements: Vec<Measurement>,
}

impl Harness {
    fn new() -> Self {
        let clock = ManualClock::new();
        let timer = TimerController::new(clock.clone(), PuzzleEvent::Cube333);
        let (tx, rx) = mpsc::channel();
        let runner = Runner::new(TestEventSource::new(rx), FixedTicker::new(Duration::from_millis(5)));
        Self {
            clock,
            timer,
            runner,
            tx,
            measurements: Vec::new(),
        }
    }

    /// One event-loop turn: the queued event, or a Tick on an empty queue.
    fn step(&mut self) {
        let ctx = InputContext::default();
        match self.runner.step() {
            AppEvent::Tick => {
                self.timer.poll();
            }
            AppEvent::Key(key) => match key.kind {
                KeyEventKind::Release => self.timer.key_released(timer_key(key.code), ctx),
                _ => {
                    if let Some(measurement) = self.timer.key_pressed(
                        timer_key(key.code),
                        key.kind == KeyEventKind::Repeat,
                        ctx,
                    ) {
                        self.measurements.push(measurement);
                    }
                }
            },
            _ => {}
        }
    }

    fn send(&mut self, event: AppEvent) {
        self.tx.send(event).unwrap();
        self.step();
    }
}

#[test]
fn headless_solve_flow_records_a_measurement() {
    let mut harness = Harness::new();

    harness.send(press(KeyCode::Char(' ')));
    harness.clock.advance(Duration::from_millis(600));
    harness.step(); // empty queue -> tick -> hold promoted
    harness.send(release(KeyCode::Char(' ')));
    assert!(harness.timer.is_running());

    harness.clock.advance(Duration::from_millis(9_870));
    harness.send(press(KeyCode::Char('j')));

    assert_eq!(harness.measurements.len(), 1);
    assert_eq!(
        harness.measurements[0].time,
        Some(Duration::from_millis(9_870))
    );
    assert!(!harness.timer.is_running());
}

#[test]
fn headless_escape_records_a_dnf() {
    let mut harness = Harness::new();

    harness.send(press(KeyCode::Char(' ')));
    harness.clock.advance(Duration::from_millis(700));
    harness.step();
    harness.send(release(KeyCode::Char(' ')));

    harness.clock.advance(Duration::from_millis(4_321));
    harness.send(press(KeyCode::Esc));

    assert_eq!(harness.measurements.len(), 1);
    assert_eq!(harness.measurements[0].time, None);
}

#[test]
fn headless_early_release_emits_nothing() {
    let mut harness = Harness::new();

    harness.send(press(KeyCode::Char(' ')));
    harness.clock.advance(Duration::from_millis(300));
    harness.step();
    harness.send(release(KeyCode::Char(' ')));

    assert!(!harness.timer.is_running());
    assert!(harness.measurements.is_empty());

    // ticks after the abandoned hold change nothing
    harness.clock.advance(Duration::from_millis(2_000));
    harness.step();
    assert!(harness.measurements.is_empty());
}

#[test]
fn measurements_flow_into_the_store_and_stats() {
    let mut harness = Harness::new();
    let db = SolveDb::open_in_memory().unwrap();
    let session = ensure_session(&db, None).unwrap();

    for (i, target_ms) in [12_000u64, 13_000, 11_000].iter().enumerate() {
        harness.send(press(KeyCode::Char(' ')));
        harness.clock.advance(Duration::from_millis(600));
        harness.step();
        harness.send(release(KeyCode::Char(' ')));
        harness.clock.advance(Duration::from_millis(*target_ms));
        harness.send(press(KeyCode::Char('j')));

        let measurement = harness.measurements.pop().unwrap();
        db.insert_solve(&Solve {
            id: new_id(),
            time: measurement.time,
            scramble: format!("scramble {i}"),
            event: measurement.event,
            session_id: session.id.clone(),
            date: Local::now(),
        })
        .unwrap();
    }

    let results = db.results_for_session(&session.id).unwrap();
    let stats = kubik::stats::current_stats(&results);
    assert_eq!(stats.total, 3);
    assert_eq!(stats.mo3, "12.00");
    assert_eq!(stats.ao5, kubik::stats::PLACEHOLDER);
}
