use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use kubik::timer::TimerPhase;
use kubik::util::{format_time, humanize_since};

use crate::{App, Screen};

const SESSION_PANEL_WIDTH: u16 = 46;

pub fn draw(app: &mut App, f: &mut Frame) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SESSION_PANEL_WIDTH), Constraint::Min(0)])
        .split(f.area());

    draw_session_panel(app, f, chunks[0]);

    let scramble_height = scramble_height(app, chunks[1].width);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(scramble_height),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(chunks[1]);

    draw_scramble(app, f, right[0]);
    draw_timer(app, f, right[1]);
    draw_help(f, right[2]);

    // pointer gestures must start on the timer surface
    app.timer_area = right[1];

    if app.screen == Screen::ConfirmClear {
        draw_confirm_clear(app, f);
    }
}

fn scramble_height(app: &App, width: u16) -> u16 {
    let inner = width.saturating_sub(4).max(1) as usize;
    let rows: usize = app
        .scrambles
        .current()
        .lines()
        .map(|line| line.width() / inner + 1)
        .sum();
    rows as u16 + 2
}

fn draw_session_panel(app: &App, f: &mut Frame, area: Rect) {
    let dim_style = Style::default().add_modifier(Modifier::DIM);
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let red_style = Style::default().fg(Color::Red);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(
            " {} ({} solves) ",
            app.session.name,
            app.solves.len()
        ));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut lines: Vec<Line> = Vec::new();

    if let Some(newest) = app.solves.first() {
        lines.push(Line::from(Span::styled(
            format!("last solve {}", humanize_since(newest.date)),
            dim_style,
        )));
    } else {
        lines.push(Line::from(Span::styled(
            "no solves yet — start solving!",
            dim_style,
        )));
    }

    let current = &app.stats.current;
    lines.push(Line::from(vec![
        Span::styled("mo3 ", dim_style),
        Span::styled(current.mo3.clone(), bold_style),
        Span::styled("  ao5 ", dim_style),
        Span::styled(current.ao5.clone(), bold_style),
        Span::styled("  ao12 ", dim_style),
        Span::styled(current.ao12.clone(), bold_style),
    ]));
    lines.push(Line::from(vec![
        Span::styled(format!("{} ", current.ao_all_label()), dim_style),
        Span::styled(current.ao_all.clone(), bold_style),
    ]));
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        format!("{:>4}  {:>11}  {:>8}  {:>8}", "#", "time", "ao5", "ao12"),
        dim_style,
    )));

    let visible = inner.height.saturating_sub(lines.len() as u16) as usize;
    let total = app.solves.len();
    for (i, solve) in app.solves.iter().enumerate().take(visible) {
        let time_label = solve
            .time
            .map_or_else(|| "DNF".to_string(), format_time);
        let time_style = match (i, solve.time.is_some()) {
            (_, false) => red_style,
            (0, true) => bold_style,
            _ => Style::default(),
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{:>4}  ", total - i), dim_style),
            Span::styled(format!("{time_label:>11}"), time_style),
            Span::raw(format!(
                "  {:>8}  {:>8}",
                app.stats.ao5_series[i], app.stats.ao12_series[i]
            )),
        ]));
    }

    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_scramble(app: &App, f: &mut Frame, area: Rect) {
    let (position, known) = app.scrambles.position();
    let title = format!(
        " {} · scramble {}/{} ",
        app.selection.event().label(),
        position,
        known
    );

    let scramble = Paragraph::new(app.scrambles.current().to_string())
        .block(Block::default().borders(Borders::BOTTOM).title(title))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(scramble, area);
}

fn draw_timer(app: &App, f: &mut Frame, area: Rect) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let style = match app.timer.phase() {
        TimerPhase::Holding => bold_style.fg(Color::Yellow),
        TimerPhase::ReadyToStart => bold_style.fg(Color::Green),
        TimerPhase::Running => bold_style,
        TimerPhase::Idle => bold_style.add_modifier(Modifier::DIM),
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(area);

    let time = Paragraph::new(Span::styled(
        format_time(app.timer.displayed_elapsed()),
        style,
    ))
    .alignment(Alignment::Center);
    f.render_widget(time, rows[1]);

    let hint = match app.timer.phase() {
        TimerPhase::Idle => "hold space, release to start",
        TimerPhase::Holding => "keep holding...",
        TimerPhase::ReadyToStart => "release to start",
        TimerPhase::Running => "any key stops · esc is a DNF",
    };
    let hint = Paragraph::new(Span::styled(
        hint,
        Style::default()
            .add_modifier(Modifier::DIM)
            .add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center);
    f.render_widget(hint, rows[2]);
}

fn draw_help(f: &mut Frame, area: Rect) {
    let help = Paragraph::new(Span::styled(
        " n/p scramble · e event · d dnf last · x delete last · X clear · s new session · q quit",
        Style::default().add_modifier(Modifier::DIM),
    ));
    f.render_widget(help, area);
}

fn draw_confirm_clear(app: &App, f: &mut Frame) {
    let area = f.area();
    let width = 46.min(area.width);
    let popup = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + area.height / 2,
        width,
        height: 3,
    };

    f.render_widget(Clear, popup);
    let prompt = Paragraph::new(format!(
        "Delete all {} solves in this session? (y/n)",
        app.solves.len()
    ))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red)),
    )
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true });
    f.render_widget(prompt, popup);
}
