use clap::ValueEnum;

/// Puzzle events a session can track. The `Display` form is the stable
/// event id used on the wire (cli, database, config); `label` is what the
/// UI prints.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, ValueEnum, strum_macros::Display)]
pub enum PuzzleEvent {
    #[value(name = "222")]
    #[strum(serialize = "222")]
    Cube222,
    #[value(name = "333")]
    #[strum(serialize = "333")]
    Cube333,
    #[value(name = "333bf")]
    #[strum(serialize = "333bf")]
    Cube333Blind,
    #[value(name = "333fm")]
    #[strum(serialize = "333fm")]
    Cube333Fewest,
    #[value(name = "444")]
    #[strum(serialize = "444")]
    Cube444,
    #[value(name = "777")]
    #[strum(serialize = "777")]
    Cube777,
    #[value(name = "sq1")]
    #[strum(serialize = "sq1")]
    Square1,
    #[value(name = "minx")]
    #[strum(serialize = "minx")]
    Megaminx,
    #[value(name = "clock")]
    #[strum(serialize = "clock")]
    Clock,
    #[value(name = "fto")]
    #[strum(serialize = "fto")]
    Fto,
    #[value(name = "master_tetraminx")]
    #[strum(serialize = "master_tetraminx")]
    MasterTetraminx,
}

impl PuzzleEvent {
    pub const ALL: [PuzzleEvent; 11] = [
        PuzzleEvent::Cube222,
        PuzzleEvent::Cube333,
        PuzzleEvent::Cube333Blind,
        PuzzleEvent::Cube333Fewest,
        PuzzleEvent::Cube444,
        PuzzleEvent::Cube777,
        PuzzleEvent::Square1,
        PuzzleEvent::Megaminx,
        PuzzleEvent::Clock,
        PuzzleEvent::Fto,
        PuzzleEvent::MasterTetraminx,
    ];

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|e| e.to_string() == id)
    }

    pub fn label(&self) -> &'static str {
        match self {
            PuzzleEvent::Cube222 => "2x2",
            PuzzleEvent::Cube333 => "3x3",
            PuzzleEvent::Cube333Blind => "3x3 Blindfolded",
            PuzzleEvent::Cube333Fewest => "3x3 Fewest Moves",
            PuzzleEvent::Cube444 => "4x4",
            PuzzleEvent::Cube777 => "7x7",
            PuzzleEvent::Square1 => "Square-1",
            PuzzleEvent::Megaminx => "Megaminx",
            PuzzleEvent::Clock => "Clock",
            PuzzleEvent::Fto => "Face-Turning Octahedron",
            PuzzleEvent::MasterTetraminx => "Master Tetraminx",
        }
    }

    /// The next event in display order, wrapping; used by the event cycler.
    pub fn next(&self) -> Self {
        let idx = Self::ALL.iter().position(|e| e == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}
