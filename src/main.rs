mod ui;

use std::cell::RefCell;
use std::error::Error;
use std::io::{self, stdin};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use chrono::Local;
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{
        DisableMouseCapture, EnableMouseCapture, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
        KeyboardEnhancementFlags, MouseEvent, MouseEventKind, PopKeyboardEnhancementFlags,
        PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Position, Rect},
    Terminal,
};

use kubik::{
    clock::MonotonicClock,
    config::{Config, ConfigStore, FileConfigStore},
    event::PuzzleEvent,
    runtime::{AppEvent, CrosstermEventSource, FixedTicker, Runner},
    scramble::{MoveSequenceScrambler, ScrambleHistory},
    session::{ensure_session, Selection, SelectionChange, Session},
    stats::StatsCache,
    store::{Solve, SolveDb},
    timer::{InputContext, Measurement, TimerController, TimerKey, HOLD_THRESHOLD},
    util::new_id,
};

const TICK_RATE_MS: u64 = 33;

/// sleek speedcubing timer tui with rolling averages and session history
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A sleek speedcubing timer TUI: hold space and release to start, tap any key to stop. Solves land in named sessions with WCA-style mo3/ao5/ao12 rolling averages."
)]
pub struct Cli {
    /// puzzle event to practice
    #[clap(short, long, value_enum)]
    event: Option<PuzzleEvent>,

    /// create or switch to a session by name
    #[clap(short, long)]
    session: Option<String>,

    /// write the active session's solves as csv and exit
    #[clap(long, value_name = "PATH")]
    export: Option<PathBuf>,

    /// list sessions with solve counts and exit
    #[clap(long)]
    list_sessions: bool,

    /// path to the solve database (defaults to the user state dir)
    #[clap(long, value_name = "PATH")]
    db: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Screen {
    Timer,
    /// "Delete all solves in this session?" prompt; gates timer input.
    ConfirmClear,
}

pub struct App {
    pub db: SolveDb,
    pub timer: TimerController<MonotonicClock>,
    pub scrambles: ScrambleHistory<MoveSequenceScrambler>,
    pub selection: Selection,
    pub session: Session,
    pub solves: Vec<Solve>,
    pub stats: StatsCache,
    pub screen: Screen,
    /// Where the timer is drawn; pointer gestures must start here.
    pub timer_area: Rect,
    /// Terminal cannot report key releases; synthesize them on promotion.
    pub auto_release: bool,
    config: Config,
    config_store: FileConfigStore,
    pending_changes: Rc<RefCell<Vec<SelectionChange>>>,
}

impl App {
    pub fn new(
        db: SolveDb,
        config_store: FileConfigStore,
        config: Config,
        session: Session,
        event: PuzzleEvent,
        auto_release: bool,
    ) -> rusqlite::Result<Self> {
        let pending_changes: Rc<RefCell<Vec<SelectionChange>>> = Rc::default();
        let sink = pending_changes.clone();
        let mut selection = Selection::new(event, session.id.clone());
        selection.subscribe(Box::new(move |change| sink.borrow_mut().push(change.clone())));

        let mut app = Self {
            timer: TimerController::new(MonotonicClock::new(), event),
            scrambles: ScrambleHistory::new(MoveSequenceScrambler, event),
            selection,
            session,
            solves: Vec::new(),
            stats: StatsCache::default(),
            screen: Screen::Timer,
            timer_area: Rect::default(),
            auto_release,
            config,
            config_store,
            pending_changes,
            db,
        };
        app.reload_solves()?;
        Ok(app)
    }

    fn input_context(&self) -> InputContext {
        InputContext {
            overlay_open: self.screen != Screen::Timer,
            target_exempt: false,
            focus_captured: false,
        }
    }

    fn reload_solves(&mut self) -> rusqlite::Result<()> {
        self.solves = self.db.solves_for_session(self.selection.session_id())?;
        let results: Vec<_> = self.solves.iter().map(Solve::result).collect();
        self.stats.refresh(&results);
        Ok(())
    }

    /// Persist a finished measurement against the scramble it was solved
    /// on, then move to the next scramble.
    fn record(&mut self, measurement: Measurement) -> rusqlite::Result<()> {
        let solve = Solve {
            id: new_id(),
            time: measurement.time,
            scramble: self.scrambles.current().to_string(),
            event: measurement.event,
            session_id: self.selection.session_id().to_string(),
            date: Local::now(),
        };
        self.db.insert_solve(&solve)?;
        self.scrambles.advance();
        self.reload_solves()
    }

    fn mark_newest_dnf(&mut self) -> rusqlite::Result<()> {
        if let Some(newest) = self.solves.first() {
            self.db.update_solve_time(&newest.id, None)?;
            self.reload_solves()?;
        }
        Ok(())
    }

    fn delete_newest(&mut self) -> rusqlite::Result<()> {
        if let Some(newest) = self.solves.first() {
            self.db.delete_solve(&newest.id)?;
            self.reload_solves()?;
        }
        Ok(())
    }

    fn clear_session(&mut self) -> rusqlite::Result<()> {
        let ids: Vec<String> = self.solves.iter().map(|s| s.id.clone()).collect();
        self.db.delete_solves(&ids)?;
        self.reload_solves()
    }

    fn start_fresh_session(&mut self) -> rusqlite::Result<()> {
        let session = Session {
            id: new_id(),
            name: format!("Session {}", Local::now().format("%Y-%m-%d %H:%M")),
        };
        self.db.insert_session(&session)?;
        self.session = session.clone();
        self.selection.set_session(session.id);
        self.apply_selection_changes()
    }

    /// Drain observer notifications and react: scramble/timer/config track
    /// the event, solve list and cache track the session.
    fn apply_selection_changes(&mut self) -> rusqlite::Result<()> {
        let changes: Vec<SelectionChange> = self.pending_changes.borrow_mut().drain(..).collect();
        if changes.is_empty() {
            return Ok(());
        }
        for change in &changes {
            match change {
                SelectionChange::Event(event) => {
                    self.scrambles.set_event(*event);
                    self.timer.set_event(*event);
                    self.config.event = event.to_string();
                }
                SelectionChange::Session(id) => {
                    if let Some(session) = self.db.find_session(id)? {
                        self.session = session;
                    }
                    self.config.session_id = Some(id.clone());
                    self.stats.invalidate();
                    self.reload_solves()?;
                }
            }
        }
        let _ = self.config_store.save(&self.config);
        Ok(())
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) -> rusqlite::Result<()> {
        let ctx = self.input_context();
        match mouse.kind {
            MouseEventKind::Down(_) => {
                let on_surface = self
                    .timer_area
                    .contains(Position::new(mouse.column, mouse.row));
                if let Some(measurement) =
                    self.timer
                        .pointer_pressed(mouse.column as i32, mouse.row as i32, on_surface, ctx)
                {
                    self.record(measurement)?;
                }
            }
            MouseEventKind::Up(_) => {
                self.timer
                    .pointer_released(mouse.column as i32, mouse.row as i32, ctx);
            }
            _ => {}
        }
        Ok(())
    }

    /// Returns true when the app should quit.
    fn handle_key(&mut self, key: KeyEvent) -> rusqlite::Result<bool> {
        let ctx = self.input_context();

        if key.kind == KeyEventKind::Release {
            self.timer.key_released(timer_key(key.code), ctx);
            return Ok(false);
        }
        let repeat = key.kind == KeyEventKind::Repeat;

        if self.screen == Screen::ConfirmClear {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    self.clear_session()?;
                    self.screen = Screen::Timer;
                }
                KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                    self.screen = Screen::Timer;
                }
                _ => {}
            }
            return Ok(false);
        }

        if self.timer.is_running() {
            // Terminals without release reporting keep emitting space
            // presses while the key is physically held from the start
            // gesture; don't let that tail stop a run that just began.
            if self.auto_release
                && key.code == KeyCode::Char(' ')
                && self.timer.displayed_elapsed() < HOLD_THRESHOLD
            {
                return Ok(false);
            }
            if let Some(measurement) = self.timer.key_pressed(timer_key(key.code), repeat, ctx) {
                self.record(measurement)?;
            }
            return Ok(false);
        }

        match key.code {
            KeyCode::Char(' ') => {
                self.timer.key_pressed(TimerKey::Trigger, repeat, ctx);
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Ok(true);
            }
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('n') => self.scrambles.advance(),
            KeyCode::Char('p') => self.scrambles.back(),
            KeyCode::Char('e') => {
                let next = self.selection.event().next();
                self.selection.set_event(next);
                self.apply_selection_changes()?;
            }
            KeyCode::Char('d') => self.mark_newest_dnf()?,
            KeyCode::Char('x') => self.delete_newest()?,
            KeyCode::Char('X') => {
                if !self.solves.is_empty() {
                    self.screen = Screen::ConfirmClear;
                }
            }
            KeyCode::Char('s') => self.start_fresh_session()?,
            _ => {}
        }
        Ok(false)
    }
}

fn timer_key(code: KeyCode) -> TimerKey {
    match code {
        KeyCode::Char(' ') => TimerKey::Trigger,
        KeyCode::Esc => TimerKey::Cancel,
        _ => TimerKey::Other,
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config_store = FileConfigStore::new();
    let mut config = config_store.load();

    let db = match &cli.db {
        Some(path) => SolveDb::open_at(path)?,
        None => SolveDb::new()?,
    };

    if cli.list_sessions {
        for (session, count) in db.list_sessions()? {
            println!("{}  {} ({} solves)", session.id, session.name, count);
        }
        return Ok(());
    }

    let session = match &cli.session {
        Some(name) => match db.find_session_by_name(name)? {
            Some(session) => session,
            None => {
                let session = Session {
                    id: new_id(),
                    name: name.clone(),
                };
                db.insert_session(&session)?;
                session
            }
        },
        None => ensure_session(&db, config.session_id.as_deref())?,
    };

    let event = cli
        .event
        .or_else(|| PuzzleEvent::from_id(&config.event))
        .unwrap_or(PuzzleEvent::Cube333);

    config.event = event.to_string();
    config.session_id = Some(session.id.clone());
    let _ = config_store.save(&config);

    if let Some(path) = &cli.export {
        let exported = db.export_session_csv(&session.id, std::fs::File::create(path)?)?;
        println!(
            "exported {} solves from '{}' to {}",
            exported,
            session.name,
            path.display()
        );
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    // Hold-to-start needs key releases; terminals without the enhanced
    // keyboard protocol get the synthesized-release fallback instead.
    let release_events = supports_keyboard_enhancement().unwrap_or(false);
    if release_events {
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )?;
    }

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(db, config_store, config, session, event, !release_events)?;
    let result = run_app(&mut terminal, &mut app);

    if release_events {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
    }
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    terminal.draw(|f| ui::draw(app, f))?;

    loop {
        match runner.step() {
            AppEvent::Tick => {
                let ctx = app.input_context();
                let promoted = app.timer.poll();
                if promoted && app.auto_release {
                    app.timer.key_released(TimerKey::Trigger, ctx);
                }
                // redraw only while something on screen is moving
                if promoted || app.timer.is_running() {
                    terminal.draw(|f| ui::draw(app, f))?;
                }
            }
            AppEvent::Resize => {
                terminal.draw(|f| ui::draw(app, f))?;
            }
            AppEvent::Mouse(mouse) => {
                app.handle_mouse(mouse)?;
                terminal.draw(|f| ui::draw(app, f))?;
            }
            AppEvent::Key(key) => {
                if app.handle_key(key)? {
                    break;
                }
                terminal.draw(|f| ui::draw(app, f))?;
            }
        }
    }

    Ok(())
}
