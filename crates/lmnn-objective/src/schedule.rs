/// Periodic impostor-refresh cadence.
///
/// Every objective call ticks the schedule once. A tick reports `true` on
/// calls `0, period, 2 * period, ...` (0-indexed), which is when the
/// impostor set must be recomputed before the call proceeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshSchedule {
    period: usize,
    calls: usize,
    next_due: usize,
}

impl RefreshSchedule {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "refresh period must be positive");
        Self {
            period,
            calls: 0,
            next_due: 0,
        }
    }

    /// Register one objective call and report whether a refresh is due.
    pub fn tick(&mut self) -> bool {
        let due = self.calls == self.next_due;
        if due {
            self.next_due += self.period;
        }
        self.calls += 1;
        due
    }

    /// Whether the next call to [`tick`](Self::tick) will report a refresh.
    pub fn is_due(&self) -> bool {
        self.calls == self.next_due
    }

    /// Number of calls registered so far.
    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn period(&self) -> usize {
        self.period
    }
}
