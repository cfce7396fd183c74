use std::time::Duration;

use chrono::{DateTime, Local};
use rand::Rng;
use time_humanize::{Accuracy, HumanTime, Tense};

/// Render a duration the way cube timers do: `SS.cc` under a minute,
/// `MM:SS.cc` under an hour, `HH:MM:SS.cc` beyond. Centiseconds truncate
/// rather than round, and hours grow past two digits instead of wrapping.
pub fn format_time(elapsed: Duration) -> String {
    let total_ms = elapsed.as_millis();
    let centis = (total_ms % 1000) / 10;
    let total_secs = total_ms / 1000;

    if total_secs < 60 {
        return format!("{total_secs:02}.{centis:02}");
    }
    if total_secs < 3600 {
        return format!("{:02}:{:02}.{centis:02}", total_secs / 60, total_secs % 60);
    }
    format!(
        "{:02}:{:02}:{:02}.{centis:02}",
        total_secs / 3600,
        (total_secs % 3600) / 60,
        total_secs % 60
    )
}

/// "2 minutes ago" for the session panel.
pub fn humanize_since(date: DateTime<Local>) -> String {
    let elapsed = (Local::now() - date).to_std().unwrap_or(Duration::ZERO);
    HumanTime::from(elapsed).to_text_en(Accuracy::Rough, Tense::Past)
}

/// Random 128-bit hex identifier for solves and sessions.
pub fn new_id() -> String {
    let mut rng = rand::thread_rng();
    format!(
        "{:08x}{:08x}{:08x}{:08x}",
        rng.gen::<u32>(),
        rng.gen::<u32>(),
        rng.gen::<u32>(),
        rng.gen::<u32>()
    )
}
