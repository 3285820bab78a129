//! Per-operation statistics
//!
//! Each client owns one [`OpStatsTable`]. Counters only grow; the
//! coordinator merges finished tables after every client has been joined.

use crate::script::OpKind;
use std::time::Duration;

/// Counters for one operation kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpStats {
    /// Successful invocations
    pub count: u64,

    /// Cumulative elapsed time
    pub total: Duration,

    /// Largest single latency
    pub max: Duration,
}

impl OpStats {
    /// Account one successful invocation
    pub fn record(&mut self, elapsed: Duration) {
        self.count += 1;
        self.total += elapsed;
        if elapsed > self.max {
            self.max = elapsed;
        }
    }

    /// Mean latency, zero when nothing was recorded
    pub fn average(&self) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }
        let nanos = self.total.as_nanos() / u128::from(self.count);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// Fold another counter set into this one
    pub fn merge(&mut self, other: &OpStats) {
        self.count += other.count;
        self.total += other.total;
        self.max = self.max.max(other.max);
    }
}

/// Fixed-size table indexed by [`OpKind`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpStatsTable {
    slots: [OpStats; OpKind::COUNT],
}

impl OpStatsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: OpKind, elapsed: Duration) {
        self.slots[kind.index()].record(elapsed);
    }

    pub fn get(&self, kind: OpKind) -> &OpStats {
        &self.slots[kind.index()]
    }

    pub fn merge(&mut self, other: &OpStatsTable) {
        for (mine, theirs) in self.slots.iter_mut().zip(other.slots.iter()) {
            mine.merge(theirs);
        }
    }

    /// Kinds that were invoked at least once, in table order
    pub fn iter(&self) -> impl Iterator<Item = (OpKind, &OpStats)> + '_ {
        OpKind::ALL
            .into_iter()
            .zip(self.slots.iter())
            .filter(|(_, stats)| stats.count > 0)
    }

    /// Total successful operations across all kinds
    pub fn total_ops(&self) -> u64 {
        self.slots.iter().map(|s| s.count).sum()
    }

    /// Worst latency across all kinds
    pub fn max_latency(&self) -> Duration {
        self.slots.iter().map(|s| s.max).max().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_count_sum_max() {
        let times = [7u64, 3, 19, 1, 19, 4];
        let mut table = OpStatsTable::new();
        for t in times {
            table.record(OpKind::Getattr, Duration::from_micros(t));
        }

        let stats = table.get(OpKind::Getattr);
        assert_eq!(stats.count, times.len() as u64);
        assert_eq!(stats.total, Duration::from_micros(times.iter().sum()));
        assert_eq!(stats.max, Duration::from_micros(19));
        assert_eq!(stats.average(), Duration::from_nanos(8833));
        assert_eq!(table.get(OpKind::Read).count, 0);
    }

    #[test]
    fn test_merge_tables() {
        let mut a = OpStatsTable::new();
        let mut b = OpStatsTable::new();
        a.record(OpKind::Write, Duration::from_millis(2));
        b.record(OpKind::Write, Duration::from_millis(5));
        b.record(OpKind::Lookup, Duration::from_millis(1));

        a.merge(&b);
        assert_eq!(a.get(OpKind::Write).count, 2);
        assert_eq!(a.get(OpKind::Write).max, Duration::from_millis(5));
        assert_eq!(a.total_ops(), 3);
        assert_eq!(a.max_latency(), Duration::from_millis(5));

        let kinds: Vec<_> = a.iter().map(|(kind, _)| kind).collect();
        assert_eq!(kinds, vec![OpKind::Lookup, OpKind::Write]);
    }

    #[test]
    fn test_empty_average() {
        assert_eq!(OpStats::default().average(), Duration::ZERO);
        assert_eq!(OpStatsTable::new().max_latency(), Duration::ZERO);
    }
}
