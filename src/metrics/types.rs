use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Number of raw samples retained for diagnostics. Aggregates are kept
/// separately, so dropping old samples never changes peak or average.
pub const MAX_RECENT_SAMPLES: usize = 512;

pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

/// Memory of the process tree and CPU of the root process at one instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSample {
    pub timestamp: DateTime<Utc>,
    pub memory_mb: f64,
    pub cpu_percent: f32,
}

/// Reduction of a run's samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSummary {
    pub peak_memory_mb: f64,
    pub avg_cpu_percent: f64,
    pub sample_count: u64,
}

/// Running aggregates over the sample stream of one run.
#[derive(Debug, Clone, Default)]
pub struct ResourceStats {
    peak_memory_mb: f64,
    cpu_sum: f64,
    cpu_count: u64,
    sample_count: u64,
    recent: VecDeque<ResourceSample>,
}

impl ResourceStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, sample: ResourceSample) {
        self.sample_count += 1;

        if sample.memory_mb.is_finite() {
            self.peak_memory_mb = self.peak_memory_mb.max(sample.memory_mb);
        }

        // Idle readings (and the zero reported on the first refresh) are not
        // part of the average.
        if sample.cpu_percent.is_finite() && sample.cpu_percent > 0.0 {
            self.cpu_sum += f64::from(sample.cpu_percent);
            self.cpu_count += 1;
        }

        self.recent.push_back(sample);
        if self.recent.len() > MAX_RECENT_SAMPLES {
            self.recent.pop_front();
        }
    }

    pub fn peak_memory_mb(&self) -> f64 {
        self.peak_memory_mb
    }

    pub fn avg_cpu_percent(&self) -> f64 {
        if self.cpu_count == 0 {
            0.0
        } else {
            self.cpu_sum / self.cpu_count as f64
        }
    }

    pub fn recent(&self) -> impl Iterator<Item = &ResourceSample> {
        self.recent.iter()
    }

    pub fn summary(&self) -> ResourceSummary {
        ResourceSummary {
            peak_memory_mb: self.peak_memory_mb,
            avg_cpu_percent: self.avg_cpu_percent(),
            sample_count: self.sample_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(memory_mb: f64, cpu_percent: f32) -> ResourceSample {
        ResourceSample {
            timestamp: Utc::now(),
            memory_mb,
            cpu_percent,
        }
    }

    #[test]
    fn peak_memory_never_decreases() {
        let mut stats = ResourceStats::new();
        let mut last_peak = 0.0;
        for memory in [12.0, 40.5, 8.0, 40.0, 41.0, 0.0] {
            stats.record(sample(memory, 0.0));
            assert!(stats.peak_memory_mb() >= last_peak);
            last_peak = stats.peak_memory_mb();
        }
        assert_eq!(stats.peak_memory_mb(), 41.0);
    }

    #[test]
    fn average_cpu_ignores_zero_readings() {
        let mut stats = ResourceStats::new();
        stats.record(sample(1.0, 0.0));
        stats.record(sample(1.0, 50.0));
        stats.record(sample(1.0, 0.0));
        stats.record(sample(1.0, 150.0));

        let summary = stats.summary();
        assert_eq!(summary.avg_cpu_percent, 100.0);
        assert_eq!(summary.sample_count, 4);
    }

    #[test]
    fn empty_stats_summarise_to_zero() {
        let summary = ResourceStats::new().summary();
        assert_eq!(summary, ResourceSummary::default());
        assert!(!summary.avg_cpu_percent.is_nan());
    }

    #[test]
    fn recent_samples_are_bounded() {
        let mut stats = ResourceStats::new();
        for i in 0..(MAX_RECENT_SAMPLES + 10) {
            stats.record(sample(i as f64, 1.0));
        }
        assert_eq!(stats.recent().count(), MAX_RECENT_SAMPLES);
        assert_eq!(stats.peak_memory_mb(), (MAX_RECENT_SAMPLES + 9) as f64);
    }

    #[test]
    fn converts_bytes_to_megabytes() {
        assert_eq!(bytes_to_mb(3 * 1024 * 1024), 3.0);
        assert_eq!(bytes_to_mb(0), 0.0);
    }
}
