use crate::data::{Outcome, RunResult};
use pdatastructs::tdigest::{TDigest, K1};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

const TDIGEST_BACKLOG_SIZE: usize = 100;

/// Duration summary over the successful runs of a stress test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencySummary {
    pub min: Duration,
    pub mean: Duration,
    pub max: Duration,
    pub p50: Duration,
    pub p90: Duration,
    pub p99: Duration,
}

/// Aggregate statistics for a completed run. Computed once, after every task
/// has reported; not mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateReport {
    pub requested: u64,
    pub success_count: u64,
    pub failure_count: u64,
    /// Span of the whole run, first dispatch to last result.
    pub wall_clock: Duration,
    /// Successful completions per second of wall-clock time. Workers overlap,
    /// so this is NOT derivable from the per-task durations.
    pub throughput: f64,
    /// Absent when no task succeeded.
    pub latency: Option<LatencySummary>,
    /// Failure counts keyed by reason label.
    pub failures: BTreeMap<String, u64>,
}

impl AggregateReport {
    pub fn from_results(results: &[RunResult], wall_clock: Duration) -> Self {
        let mut failures: BTreeMap<String, u64> = BTreeMap::new();
        let mut success_durations = Vec::new();

        for result in results {
            match &result.outcome {
                Outcome::Success => success_durations.push(result.duration),
                Outcome::Failure(reason) => {
                    *failures.entry(reason.label().to_string()).or_insert(0) += 1;
                }
            }
        }

        let success_count = success_durations.len() as u64;
        let throughput = if wall_clock.is_zero() {
            0.0
        } else {
            success_count as f64 / wall_clock.as_secs_f64()
        };

        Self {
            requested: results.len() as u64,
            success_count,
            failure_count: results.len() as u64 - success_count,
            wall_clock,
            throughput,
            latency: summarize(&success_durations),
            failures,
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.requested == 0 {
            0.0
        } else {
            self.success_count as f64 / self.requested as f64
        }
    }
}

fn summarize(durations: &[Duration]) -> Option<LatencySummary> {
    let min = *durations.iter().min()?;
    let max = *durations.iter().max()?;

    let secs: Vec<f64> = durations.iter().map(Duration::as_secs_f64).collect();
    let mut digest = TDigest::new(K1::new(10.), TDIGEST_BACKLOG_SIZE);
    for s in &secs {
        digest.insert(*s);
    }

    Some(LatencySummary {
        min,
        mean: Duration::from_secs_f64(statistical::mean(&secs)),
        max,
        p50: Duration::from_secs_f64(digest.quantile(0.5)),
        p90: Duration::from_secs_f64(digest.quantile(0.9)),
        p99: Duration::from_secs_f64(digest.quantile(0.99)),
    })
}

fn secs(duration: Duration) -> f64 {
    duration.as_secs_f64()
}

impl fmt::Display for AggregateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "booking stress results")?;
        writeln!(
            f,
            "  successful: {}/{} ({:.1}%)",
            self.success_count,
            self.requested,
            self.success_rate() * 100.0
        )?;
        writeln!(f, "  failed:     {}/{}", self.failure_count, self.requested)?;
        for (reason, count) in &self.failures {
            writeln!(f, "    {reason}: {count}")?;
        }
        if let Some(latency) = &self.latency {
            writeln!(
                f,
                "  durations:  mean {:.2}s | min {:.2}s | max {:.2}s",
                secs(latency.mean),
                secs(latency.min),
                secs(latency.max)
            )?;
            writeln!(
                f,
                "  quantiles:  p50 {:.2}s | p90 {:.2}s | p99 {:.2}s",
                secs(latency.p50),
                secs(latency.p90),
                secs(latency.p99)
            )?;
        }
        writeln!(f, "  wall clock: {:.2}s", secs(self.wall_clock))?;
        write!(f, "  throughput: {:.2} bookings/s", self.throughput)
    }
}
