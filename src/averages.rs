use std::time::Duration;

/// Outcome of a single attempt as the statistics engine sees it.
///
/// A DNF carries no time; the enum makes the "no time iff DNF" invariant
/// structural instead of a field pairing to keep consistent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolveResult {
    Time(Duration),
    Dnf,
}

impl SolveResult {
    pub fn from_millis(ms: Option<u64>) -> Self {
        match ms {
            Some(ms) => SolveResult::Time(Duration::from_millis(ms)),
            None => SolveResult::Dnf,
        }
    }

    pub fn is_dnf(&self) -> bool {
        matches!(self, SolveResult::Dnf)
    }

    pub fn time(&self) -> Option<Duration> {
        match self {
            SolveResult::Time(t) => Some(*t),
            SolveResult::Dnf => None,
        }
    }
}

/// Arithmetic mean of a window. Any DNF in the window poisons the result.
///
/// Panics on an empty window; window sizes are guarded by the callers in
/// `stats`, so an empty input is a programming error.
pub fn mean(values: &[SolveResult]) -> SolveResult {
    assert!(!values.is_empty(), "mean of an empty window");

    let mut sum = Duration::ZERO;
    for value in values {
        match value {
            SolveResult::Dnf => return SolveResult::Dnf,
            SolveResult::Time(t) => sum += *t,
        }
    }
    SolveResult::Time(sum / values.len() as u32)
}

/// WCA-style trimmed mean: drop the fastest and slowest `max(1, n/20)`
/// results, DNFs sorting as slowest, then take the mean of what remains.
///
/// Operates on a copy; the caller's ordering is never touched. Panics when
/// trimming would leave an empty window, which callers guard against.
pub fn trimmed_average(values: &[SolveResult]) -> SolveResult {
    let n = values.len();
    let remove_count = (n / 20).max(1);
    assert!(
        n > remove_count * 2,
        "window of {n} leaves nothing after trimming {remove_count} from each end"
    );

    let mut sorted = values.to_vec();
    // Stable sort: equal times and multiple DNFs keep their input order.
    // Any stable order trims the same set, which is all callers can observe.
    sorted.sort_by_key(|result| match result {
        SolveResult::Time(t) => (false, *t),
        SolveResult::Dnf => (true, Duration::ZERO),
    });

    mean(&sorted[remove_count..n - remove_count])
}
