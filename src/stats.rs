use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::averages::{mean, trimmed_average, SolveResult};
use crate::util::format_time;

/// What a cell shows when no aggregate is available yet. Distinct from
/// both a zero time and a DNF.
pub const PLACEHOLDER: &str = "—";

/// Aggregates for the "current form" header row, each already formatted
/// for display.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentStats {
    pub mo3: String,
    pub ao5: String,
    pub ao12: String,
    pub ao_all: String,
    pub total: usize,
}

impl CurrentStats {
    /// The aoAll column is labeled with the count it covers, e.g. "ao37".
    pub fn ao_all_label(&self) -> String {
        format!("ao{}", self.total)
    }
}

impl Default for CurrentStats {
    fn default() -> Self {
        Self {
            mo3: PLACEHOLDER.to_string(),
            ao5: PLACEHOLDER.to_string(),
            ao12: PLACEHOLDER.to_string(),
            ao_all: PLACEHOLDER.to_string(),
            total: 0,
        }
    }
}

fn format_result(result: SolveResult) -> String {
    match result {
        SolveResult::Dnf => "DNF".to_string(),
        SolveResult::Time(t) => format_time(t),
    }
}

/// Header aggregates over the newest-first result sequence.
///
/// mo3 is a plain mean of the first 3, ao5/ao12 trimmed averages of the
/// first 5/12; each shows the placeholder until the history is long
/// enough. aoAll covers every result; below three results a trimmed
/// window would be empty, so it falls back to the plain mean.
pub fn current_stats(results: &[SolveResult]) -> CurrentStats {
    let n = results.len();
    let window = |size: usize, aggregate: fn(&[SolveResult]) -> SolveResult| {
        if n >= size {
            format_result(aggregate(&results[..size]))
        } else {
            PLACEHOLDER.to_string()
        }
    };

    let ao_all = if n == 0 {
        PLACEHOLDER.to_string()
    } else if n < 3 {
        format_result(mean(results))
    } else {
        format_result(trimmed_average(results))
    };

    CurrentStats {
        mo3: window(3, mean),
        ao5: window(5, trimmed_average),
        ao12: window(12, trimmed_average),
        ao_all,
        total: n,
    }
}

/// One formatted rolling average per solve index, aligned 1:1 with the
/// newest-first sequence. Position `s` holds the window starting at `s`
/// and running toward older solves, so each row shows the average ending
/// at that solve. The last `window - 1` positions can never fill and stay
/// placeholders, as does everything when the history is shorter than the
/// window.
pub fn rolling_series(results: &[SolveResult], window: usize) -> Vec<String> {
    let mut series = vec![PLACEHOLDER.to_string(); results.len()];
    if window == 0 {
        return series;
    }
    for (start, chunk) in results.windows(window).enumerate() {
        series[start] = format_result(trimmed_average(chunk));
    }
    series
}

/// Derived statistics for a session's solve list.
///
/// Everything is recomputed from scratch when the underlying sequence
/// changes; the fingerprint only spares recomputation when unrelated
/// state (selection, scrolling) triggers a refresh. Histories are
/// thousands of solves, not millions, so from-scratch is fine.
#[derive(Debug, Default)]
pub struct StatsCache {
    fingerprint: Option<u64>,
    pub current: CurrentStats,
    pub ao5_series: Vec<String>,
    pub ao12_series: Vec<String>,
}

impl StatsCache {
    /// Recomputes if the sequence changed. Returns whether it did.
    pub fn refresh(&mut self, results: &[SolveResult]) -> bool {
        let fingerprint = fingerprint(results);
        if self.fingerprint == Some(fingerprint) {
            return false;
        }
        self.fingerprint = Some(fingerprint);
        self.current = current_stats(results);
        self.ao5_series = rolling_series(results, 5);
        self.ao12_series = rolling_series(results, 12);
        true
    }

    /// Forces the next refresh to recompute, e.g. after a session switch.
    pub fn invalidate(&mut self) {
        self.fingerprint = None;
    }
}

fn fingerprint(results: &[SolveResult]) -> u64 {
    let mut hasher = DefaultHasher::new();
    results.len().hash(&mut hasher);
    for result in results {
        match result {
            SolveResult::Dnf => u128::MAX.hash(&mut hasher),
            SolveResult::Time(t) => t.as_nanos().hash(&mut hasher),
        }
    }
    hasher.finish()
}
