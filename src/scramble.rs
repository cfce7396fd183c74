use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::event::PuzzleEvent;

/// Produces an opaque scramble string for an event. The rest of the app
/// never looks inside the string.
pub trait Scrambler {
    fn scramble(&self, event: PuzzleEvent) -> String;
}

/// Random move sequences in event notation.
///
/// These are move scrambles, not random-state scrambles: successive turns
/// never repeat a face, and cube events never stack three turns on one
/// axis.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveSequenceScrambler;

const CUBE_SUFFIXES: [&str; 3] = ["", "'", "2"];

/// (face, axis) move pool for the face-turning events.
type FacePool = &'static [(&'static str, usize)];

const FACES_222: FacePool = &[("U", 0), ("R", 1), ("F", 2)];
const FACES_333: FacePool = &[("U", 0), ("D", 0), ("L", 1), ("R", 1), ("F", 2), ("B", 2)];
const FACES_444: FacePool = &[
    ("U", 0),
    ("D", 0),
    ("L", 1),
    ("R", 1),
    ("F", 2),
    ("B", 2),
    ("Uw", 0),
    ("Rw", 1),
    ("Fw", 2),
];
const FACES_777: FacePool = &[
    ("U", 0),
    ("D", 0),
    ("L", 1),
    ("R", 1),
    ("F", 2),
    ("B", 2),
    ("Uw", 0),
    ("Dw", 0),
    ("Lw", 1),
    ("Rw", 1),
    ("Fw", 2),
    ("Bw", 2),
    ("3Uw", 0),
    ("3Rw", 1),
    ("3Fw", 2),
];
const FACES_FTO: FacePool = &[
    ("U", 0),
    ("L", 1),
    ("F", 2),
    ("R", 3),
    ("B", 4),
    ("D", 5),
    ("BL", 6),
    ("BR", 7),
];
const FACES_TETRAMINX: FacePool = &[("U", 0), ("L", 1), ("R", 2), ("B", 3)];

fn turn_sequence<R: Rng>(
    rng: &mut R,
    faces: FacePool,
    suffixes: &[&str],
    length: usize,
) -> String {
    let mut moves: Vec<String> = Vec::with_capacity(length);
    let mut last_face: Option<usize> = None;
    let mut last_axis: Option<usize> = None;
    let mut axis_run = 0;

    while moves.len() < length {
        let pick = rng.gen_range(0..faces.len());
        let (face, axis) = faces[pick];
        if last_face == Some(pick) {
            continue;
        }
        if last_axis == Some(axis) {
            if axis_run >= 2 {
                continue;
            }
            axis_run += 1;
        } else {
            last_axis = Some(axis);
            axis_run = 1;
        }
        last_face = Some(pick);
        moves.push(format!("{}{}", face, suffixes.choose(rng).unwrap()));
    }

    moves.iter().join(" ")
}

fn megaminx<R: Rng>(rng: &mut R) -> String {
    let mut lines = Vec::with_capacity(7);
    for _ in 0..7 {
        let mut line: Vec<String> = Vec::with_capacity(11);
        for i in 0..10 {
            let face = if i % 2 == 0 { "R" } else { "D" };
            let dir = if rng.gen::<bool>() { "++" } else { "--" };
            line.push(format!("{face}{dir}"));
        }
        line.push(format!("U{}", if rng.gen::<bool>() { "" } else { "'" }));
        lines.push(line.iter().join(" "));
    }
    lines.iter().join("\n")
}

fn square1<R: Rng>(rng: &mut R) -> String {
    let mut pairs = Vec::with_capacity(12);
    while pairs.len() < 12 {
        let top = rng.gen_range(-5..=6);
        let bottom = rng.gen_range(-5..=6);
        if top == 0 && bottom == 0 {
            continue;
        }
        pairs.push(format!("({top},{bottom})"));
    }
    pairs.iter().join(" / ")
}

fn clock<R: Rng>(rng: &mut R) -> String {
    const PINS: [&str; 9] = ["UR", "DR", "DL", "UL", "U", "R", "D", "L", "ALL"];
    let mut dial = |pin: &str| {
        let amount = rng.gen_range(0..=6);
        let sign = if rng.gen::<bool>() { "+" } else { "-" };
        format!("{pin}{amount}{sign}")
    };

    let mut tokens: Vec<String> = PINS.into_iter().map(|pin| dial(pin)).collect();
    tokens.push("y2".to_string());
    for pin in ["U", "R", "D", "L", "ALL"] {
        tokens.push(dial(pin));
    }
    tokens.iter().join(" ")
}

impl Scrambler for MoveSequenceScrambler {
    fn scramble(&self, event: PuzzleEvent) -> String {
        let rng = &mut rand::thread_rng();
        match event {
            PuzzleEvent::Cube222 => turn_sequence(rng, FACES_222, &CUBE_SUFFIXES, 11),
            PuzzleEvent::Cube333 | PuzzleEvent::Cube333Blind | PuzzleEvent::Cube333Fewest => {
                turn_sequence(rng, FACES_333, &CUBE_SUFFIXES, 20)
            }
            PuzzleEvent::Cube444 => turn_sequence(rng, FACES_444, &CUBE_SUFFIXES, 40),
            PuzzleEvent::Cube777 => turn_sequence(rng, FACES_777, &CUBE_SUFFIXES, 60),
            PuzzleEvent::Megaminx => megaminx(rng),
            PuzzleEvent::Square1 => square1(rng),
            PuzzleEvent::Clock => clock(rng),
            PuzzleEvent::Fto => turn_sequence(rng, FACES_FTO, &["", "'"], 25),
            PuzzleEvent::MasterTetraminx => turn_sequence(rng, FACES_TETRAMINX, &["", "'"], 25),
        }
    }
}

/// Generated scrambles with a cursor, so the solver can step back to what
/// they just solved. Switching event clears it; scrambles from one event
/// mean nothing for another.
pub struct ScrambleHistory<S: Scrambler> {
    scrambler: S,
    event: PuzzleEvent,
    history: Vec<String>,
    cursor: usize,
}

impl<S: Scrambler> ScrambleHistory<S> {
    pub fn new(scrambler: S, event: PuzzleEvent) -> Self {
        let first = scrambler.scramble(event);
        Self {
            scrambler,
            event,
            history: vec![first],
            cursor: 0,
        }
    }

    pub fn current(&self) -> &str {
        &self.history[self.cursor]
    }

    /// Step forward, generating a fresh scramble when already at the
    /// newest entry.
    pub fn advance(&mut self) {
        if self.cursor + 1 == self.history.len() {
            self.history.push(self.scrambler.scramble(self.event));
        }
        self.cursor += 1;
    }

    /// Step back toward already-seen scrambles.
    pub fn back(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn can_go_back(&self) -> bool {
        self.cursor > 0
    }

    pub fn set_event(&mut self, event: PuzzleEvent) {
        if self.event == event {
            return;
        }
        self.event = event;
        self.history = vec![self.scrambler.scramble(event)];
        self.cursor = 0;
    }

    pub fn position(&self) -> (usize, usize) {
        (self.cursor + 1, self.history.len())
    }
}
