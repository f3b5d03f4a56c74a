// SPDX-License-Identifier: AGPL-3.0-only

//! Wall-clock performance measurement
//!
//! A [`PerfCounter`] is an explicit caller-owned handle, so any number of
//! measurements can run side by side. It records; it does not attribute
//! time to kernels. Hardware and transfer time are whatever the caller adds.

use crate::error::{NeuraxError, Result};
use std::fmt;
use std::time::Instant;

/// Accumulated timing for one measurement window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PerfStats {
    /// Wall-clock time between `start` and `end`
    pub total_time_ms: f64,
    /// Time attributed to the accelerator
    pub hw_time_ms: f64,
    /// Time attributed to host/device transfers
    pub data_transfer_time_ms: f64,
    /// Operations executed in the window
    pub num_operations: u32,
}

impl PerfStats {
    /// Mean time per operation.
    pub fn avg_op_ms(&self) -> Option<f64> {
        (self.num_operations > 0).then(|| self.total_time_ms / f64::from(self.num_operations))
    }

    /// Hardware share of total time, in percent.
    pub fn hw_utilization_pct(&self) -> Option<f64> {
        (self.total_time_ms > 0.0).then(|| self.hw_time_ms / self.total_time_ms * 100.0)
    }

    /// Transfer share of total time, in percent.
    pub fn transfer_overhead_pct(&self) -> Option<f64> {
        (self.total_time_ms > 0.0).then(|| self.data_transfer_time_ms / self.total_time_ms * 100.0)
    }

    /// Throughput.
    pub fn ops_per_sec(&self) -> Option<f64> {
        (self.total_time_ms > 0.0)
            .then(|| f64::from(self.num_operations) * 1000.0 / self.total_time_ms)
    }
}

impl fmt::Display for PerfStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const RULE: &str = "==============================";
        writeln!(f, "NEURAX Performance Statistics:")?;
        writeln!(f, "{RULE}")?;
        writeln!(f, "Total execution time:    {:.3} ms", self.total_time_ms)?;
        writeln!(f, "Hardware time:           {:.3} ms", self.hw_time_ms)?;
        writeln!(f, "Data transfer time:      {:.3} ms", self.data_transfer_time_ms)?;
        writeln!(f, "Number of operations:    {}", self.num_operations)?;
        if let Some(avg) = self.avg_op_ms() {
            writeln!(f, "Average time per op:     {avg:.3} ms")?;
        }
        if let (Some(hw), Some(xfer)) = (self.hw_utilization_pct(), self.transfer_overhead_pct()) {
            writeln!(f, "Hardware utilization:    {hw:.1}%")?;
            writeln!(f, "Data transfer overhead:  {xfer:.1}%")?;
        }
        if let Some(ops) = self.ops_per_sec() {
            writeln!(f, "Operations per second:   {ops:.0}")?;
        }
        write!(f, "{RULE}")
    }
}

/// Start/end stopwatch around a sequence of operations.
#[derive(Debug, Default)]
pub struct PerfCounter {
    started: Option<Instant>,
    stats: PerfStats,
}

impl PerfCounter {
    /// Idle counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a measurement window, discarding any previous one.
    pub fn start(&mut self) {
        self.stats = PerfStats::default();
        self.started = Some(Instant::now());
    }

    /// True between `start` and `end`.
    pub const fn is_active(&self) -> bool {
        self.started.is_some()
    }

    /// Count `n` operations toward the window.
    pub fn record_operations(&mut self, n: u32) {
        self.stats.num_operations = self.stats.num_operations.saturating_add(n);
    }

    /// Attribute accelerator time.
    pub fn add_hw_time(&mut self, ms: f64) {
        self.stats.hw_time_ms += ms;
    }

    /// Attribute transfer time.
    pub fn add_transfer_time(&mut self, ms: f64) {
        self.stats.data_transfer_time_ms += ms;
    }

    /// Close the window and return its statistics.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParam` if no window is open.
    pub fn end(&mut self) -> Result<PerfStats> {
        let started = self
            .started
            .take()
            .ok_or_else(|| NeuraxError::invalid_param("perf counter ended without start"))?;
        self.stats.total_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        Ok(self.stats)
    }

    /// Statistics of the last closed window (or the running tallies).
    pub const fn stats(&self) -> &PerfStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn end_without_start() {
        let mut c = PerfCounter::new();
        assert!(matches!(c.end(), Err(NeuraxError::InvalidParam { .. })));
    }

    #[test]
    fn measures_elapsed() {
        let mut c = PerfCounter::new();
        c.start();
        assert!(c.is_active());
        std::thread::sleep(Duration::from_millis(2));
        c.record_operations(4);
        let stats = c.end().unwrap();
        assert!(!c.is_active());
        assert!(stats.total_time_ms >= 2.0);
        assert_eq!(stats.num_operations, 4);
        assert!(c.end().is_err());
    }

    #[test]
    fn restart_resets_window() {
        let mut c = PerfCounter::new();
        c.start();
        c.record_operations(10);
        c.add_hw_time(3.0);
        c.start();
        let stats = c.end().unwrap();
        assert_eq!(stats.num_operations, 0);
        assert_eq!(stats.hw_time_ms, 0.0);
    }

    #[test]
    fn independent_counters() {
        let mut outer = PerfCounter::new();
        let mut inner = PerfCounter::new();
        outer.start();
        inner.start();
        inner.end().unwrap();
        assert!(outer.is_active());
        outer.end().unwrap();
    }

    #[test]
    fn derived_metrics() {
        let stats = PerfStats {
            total_time_ms: 200.0,
            hw_time_ms: 50.0,
            data_transfer_time_ms: 20.0,
            num_operations: 10,
        };
        assert_eq!(stats.avg_op_ms(), Some(20.0));
        assert_eq!(stats.hw_utilization_pct(), Some(25.0));
        assert_eq!(stats.transfer_overhead_pct(), Some(10.0));
        assert_eq!(stats.ops_per_sec(), Some(50.0));

        let text = stats.to_string();
        assert!(text.contains("Average time per op:     20.000 ms"));
        assert!(text.contains("Hardware utilization:    25.0%"));
        assert!(text.contains("Operations per second:   50"));
    }

    #[test]
    fn empty_stats_skip_ratios() {
        let stats = PerfStats::default();
        assert_eq!(stats.avg_op_ms(), None);
        assert_eq!(stats.ops_per_sec(), None);
        assert!(!stats.to_string().contains("utilization"));
    }
}
