//! The benchmark result document and its persistence.

pub mod summary;

pub use summary::{error_summary, log_tail, success_summary, LOG_TAIL_LINES};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    quality::{EnhancedMetrics, Metrics},
    supervisor::{RunOutcome, TIMEOUT_EXIT_CODE},
};

const ENABLE_LOGS: bool = true;

use crate::log_info;

/// File-name timestamp, e.g. `20240131_142500`.
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
/// Timestamp stored in the document, e.g. `2024-01-31 14:25:00`.
pub const HUMAN_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn file_stamp(at: DateTime<Local>) -> String {
    at.format(FILE_TIMESTAMP_FORMAT).to_string()
}

pub fn human_stamp(at: DateTime<Local>) -> String {
    at.format(HUMAN_TIMESTAMP_FORMAT).to_string()
}

/// `<results_dir>/<collector>_<stamp>.json`
pub fn result_path(results_dir: &Path, collector_name: &str, stamp: &str) -> PathBuf {
    results_dir.join(format!("{collector_name}_{stamp}.json"))
}

/// JSON has no NaN or infinity; such values are written as strings.
fn finite_or_string<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        serializer.serialize_str(&value.to_string())
    }
}

/// Everything known about one benchmark run. Built once by
/// [`ReportBuilder`] and never modified afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkReport {
    #[serde(serialize_with = "finite_or_string")]
    pub total_runtime_seconds: f64,
    pub items_extracted: usize,
    #[serde(serialize_with = "finite_or_string")]
    pub items_per_second: f64,
    #[serde(serialize_with = "finite_or_string")]
    pub text_items_per_second: f64,
    #[serde(serialize_with = "finite_or_string")]
    pub peak_memory_mb: f64,
    #[serde(serialize_with = "finite_or_string")]
    pub avg_cpu_percent: f64,
    pub success: bool,
    pub exit_code: i32,
    pub collector_name: String,
    pub scenario_name: String,
    pub timestamp: String,
    pub log_file: String,
    #[serde(flatten)]
    pub quality: Metrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhanced_metrics: Option<EnhancedMetrics>,
}

impl BenchmarkReport {
    /// Quality metric by name, if the analyzers emitted it.
    pub fn metric(&self, key: &str) -> Option<&Value> {
        self.quality.get(key)
    }

    pub fn to_json(&self) -> Result<Value> {
        serde_json::to_value(self).context("Failed to serialize benchmark report")
    }

    /// Pretty JSON with 2-space indentation.
    pub fn to_pretty_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize benchmark report")
    }

    /// Write the document to `<results_dir>/<collector>_<stamp>.json`.
    pub fn save(&self, results_dir: &Path, stamp: &str) -> Result<PathBuf> {
        let path = result_path(results_dir, &self.collector_name, stamp);
        let body = self.to_pretty_json()?;
        fs::write(&path, body)
            .with_context(|| format!("Failed to write results to {}", path.display()))?;
        log_info!("saved benchmark report to {}", path.display());
        Ok(path)
    }
}

/// Assembles a [`BenchmarkReport`] from the supervisor outcome and the
/// ingestion/analysis results, deriving throughput at the end.
pub struct ReportBuilder {
    collector_name: String,
    scenario_name: String,
    log_file: PathBuf,
    runtime_seconds: f64,
    peak_memory_mb: f64,
    avg_cpu_percent: f64,
    success: bool,
    exit_code: i32,
    items_extracted: usize,
    quality: Metrics,
    enhanced: Option<EnhancedMetrics>,
    timestamp: Option<String>,
}

impl ReportBuilder {
    pub fn new(
        collector_name: impl Into<String>,
        scenario_name: impl Into<String>,
        outcome: &RunOutcome,
        log_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            collector_name: collector_name.into(),
            scenario_name: scenario_name.into(),
            log_file: log_file.into(),
            runtime_seconds: outcome.duration.as_secs_f64(),
            peak_memory_mb: outcome.resources.peak_memory_mb,
            avg_cpu_percent: outcome.resources.avg_cpu_percent,
            success: outcome.success(),
            exit_code: outcome.status.exit_code().unwrap_or(TIMEOUT_EXIT_CODE),
            items_extracted: 0,
            quality: Metrics::new(),
            enhanced: None,
            timestamp: None,
        }
    }

    pub fn items_extracted(mut self, items: usize) -> Self {
        self.items_extracted = items;
        self
    }

    pub fn quality(mut self, metrics: Metrics) -> Self {
        self.quality = metrics;
        self
    }

    pub fn enhanced(mut self, metrics: Option<EnhancedMetrics>) -> Self {
        self.enhanced = metrics;
        self
    }

    /// Fixed timestamp instead of the local time at [`ReportBuilder::build`].
    pub fn timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn build(self) -> BenchmarkReport {
        let non_trivial = self
            .quality
            .get("non_trivial_items")
            .and_then(Value::as_u64)
            .unwrap_or(0);

        BenchmarkReport {
            total_runtime_seconds: self.runtime_seconds,
            items_extracted: self.items_extracted,
            items_per_second: per_second(self.items_extracted as f64, self.runtime_seconds),
            text_items_per_second: per_second(non_trivial as f64, self.runtime_seconds),
            peak_memory_mb: self.peak_memory_mb,
            avg_cpu_percent: self.avg_cpu_percent,
            success: self.success,
            exit_code: self.exit_code,
            collector_name: self.collector_name,
            scenario_name: self.scenario_name,
            timestamp: self
                .timestamp
                .unwrap_or_else(|| human_stamp(Local::now())),
            log_file: self.log_file.display().to_string(),
            quality: self.quality,
            enhanced_metrics: self.enhanced,
        }
    }
}

fn per_second(count: f64, seconds: f64) -> f64 {
    if seconds > 0.0 {
        count / seconds
    } else {
        0.0
    }
}
