//! Per-alias failure bookkeeping, kept under the slot's writer lock.

use super::metrics::MetricsErrorKind;

/// Identical consecutive failures reported at WARN; later repeats go to DEBUG.
pub(crate) const LOUD_REPEATS: u32 = 3;

/// Log level chosen for a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Severity {
    Loud,
    Quiet,
}

/// Failures since the alias was last known to be in a good state.
///
/// A good state is either a publish or a poll that found the published
/// snapshot still current.
#[derive(Debug, Default)]
pub(crate) struct FailureLog {
    // Latest failure kind and how many times in a row it occurred.
    streak: Option<(MetricsErrorKind, u32)>,
    since_healthy: u32,
}

impl FailureLog {
    /// Records a failure and picks its log level.
    pub(crate) fn note(&mut self, kind: MetricsErrorKind) -> Severity {
        self.since_healthy = self.since_healthy.saturating_add(1);

        let repeats = match &mut self.streak {
            Some((last, repeats)) if *last == kind => {
                *repeats = repeats.saturating_add(1);
                *repeats
            }
            streak => {
                *streak = Some((kind, 1));
                1
            }
        };

        if repeats <= LOUD_REPEATS {
            Severity::Loud
        } else {
            Severity::Quiet
        }
    }

    /// Clears the log, returning the number of failures it held, if any.
    pub(crate) fn recover(&mut self) -> Option<u32> {
        self.streak = None;
        let failed = std::mem::take(&mut self.since_healthy);
        (failed > 0).then_some(failed)
    }

    /// Failures of any kind since the last good state.
    pub(crate) fn since_healthy(&self) -> u32 {
        self.since_healthy
    }

    /// Consecutive repeats of the latest failure kind.
    pub(crate) fn repeats(&self) -> u32 {
        self.streak.map_or(0, |(_, repeats)| repeats)
    }
}
