//! Timing samples of the control loop: tick-to-tick intervals and solver durations, kept in
//! bounded windows. When the solver window fills up, both windows are summarized and cleared
//! together. Summaries are diagnostic only, nothing depends on them.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

/// Mean, standard deviation and extremes of one window, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateSummary {
    pub mean_ms: f64,
    pub std_dev_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub samples: usize,
}

impl RateSummary {
    /// Population statistics of the given samples, None if there are none.
    pub fn calculate<'a>(samples: impl IntoIterator<Item = &'a Duration>) -> Option<Self> {
        let values: Vec<f64> = samples.into_iter().map(|d| d.as_secs_f64() * 1000.0).collect();
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Some(RateSummary {
            mean_ms: mean,
            std_dev_ms: variance.sqrt(),
            min_ms: min,
            max_ms: max,
            samples: values.len(),
        })
    }
}

impl fmt::Display for RateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mean {:.3} ms, std {:.3} ms, min {:.3} ms, max {:.3} ms ({} samples)",
               self.mean_ms, self.std_dev_ms, self.min_ms, self.max_ms, self.samples)
    }
}

/// Summaries of a completed window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowReport {
    pub tick_intervals: Option<RateSummary>,
    pub solver_durations: Option<RateSummary>,
}

#[derive(Debug, Clone)]
pub struct TimingSamples {
    capacity: usize,
    tick_intervals: VecDeque<Duration>,
    solver_durations: VecDeque<Duration>,
}

impl TimingSamples {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        TimingSamples {
            capacity,
            tick_intervals: VecDeque::with_capacity(capacity + 1),
            solver_durations: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records the wall clock interval since the previous tick. The window slides once full,
    /// ticks that skip solving keep coming while the solver window is still filling.
    pub fn record_tick_interval(&mut self, interval: Duration) {
        self.tick_intervals.push_back(interval);
        if self.tick_intervals.len() > self.capacity {
            self.tick_intervals.pop_front();
        }
    }

    /// Records one solve. Returns the report if this completed the window, in which case both
    /// windows are cleared.
    pub fn record_solver_duration(&mut self, duration: Duration) -> Option<WindowReport> {
        self.solver_durations.push_back(duration);
        if self.solver_durations.len() < self.capacity {
            return None;
        }
        let report = WindowReport {
            tick_intervals: RateSummary::calculate(&self.tick_intervals),
            solver_durations: RateSummary::calculate(&self.solver_durations),
        };
        self.clear();
        Some(report)
    }

    pub fn clear(&mut self) {
        self.tick_intervals.clear();
        self.solver_durations.clear();
    }

    pub fn tick_interval_count(&self) -> usize {
        self.tick_intervals.len()
    }

    pub fn solver_duration_count(&self) -> usize {
        self.solver_durations.len()
    }
}
