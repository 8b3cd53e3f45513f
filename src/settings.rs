use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub const ENV_RESULTS_DIR: &str = "SCRAPEBENCH_RESULTS_DIR";
pub const ENV_LOGS_DIR: &str = "SCRAPEBENCH_LOGS_DIR";
pub const ENV_DATA_DIR: &str = "SCRAPEBENCH_DATA_DIR";
pub const ENV_COLLECTORS_DIR: &str = "SCRAPEBENCH_COLLECTORS_DIR";
pub const ENV_PYTHON: &str = "SCRAPEBENCH_PYTHON";
pub const ENV_COLLECTOR_LIMIT: &str = "SCRAPEBENCH_LIMIT";

pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_COLLECTOR_LIMIT: u32 = 50;
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 500;

const CACHE_DIR_NAME: &str = "scrapebench";
const LOCAL_DIR_NAME: &str = "benchmarks";

/// Harness configuration, built once at startup and passed down by reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub results_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub data_dir: PathBuf,
    /// Directory holding the collector scripts.
    pub collectors_dir: PathBuf,
    /// Interpreter used to launch script collectors.
    pub python: String,
    pub timeout: Duration,
    pub sample_interval: Duration,
    /// Limit passed to a collector when the command line gives none.
    pub collector_limit: u32,
}

impl Settings {
    /// Read directory overrides from the process environment.
    ///
    /// With `local` set, results, logs and data live under `./benchmarks/`
    /// and the environment overrides are ignored.
    pub fn from_env(local: bool) -> Self {
        let cache_root = dirs::cache_dir()
            .unwrap_or_else(env::temp_dir)
            .join(CACHE_DIR_NAME);
        Self::resolve(local, &cache_root, |key| env::var(key).ok())
    }

    /// Same as [`Settings::from_env`] with an explicit cache root and lookup,
    /// so resolution can be exercised without touching the real environment.
    pub fn resolve(
        local: bool,
        cache_root: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let bench_root = cache_root.join(LOCAL_DIR_NAME);
        let pick = |key: &str, fallback: PathBuf| -> PathBuf {
            lookup(key)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
                .unwrap_or(fallback)
        };

        let (results_dir, logs_dir, data_dir) = if local {
            let base = PathBuf::from(LOCAL_DIR_NAME);
            (base.join("results"), base.join("logs"), base.join("data"))
        } else {
            (
                pick(ENV_RESULTS_DIR, bench_root.join("results")),
                pick(ENV_LOGS_DIR, bench_root.join("logs")),
                pick(ENV_DATA_DIR, bench_root.join("data")),
            )
        };

        Self {
            results_dir,
            logs_dir,
            data_dir,
            collectors_dir: pick(ENV_COLLECTORS_DIR, PathBuf::from("collectors")),
            python: lookup(ENV_PYTHON)
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| "python3".to_string()),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            sample_interval: Duration::from_millis(DEFAULT_SAMPLE_INTERVAL_MS),
            collector_limit: lookup(ENV_COLLECTOR_LIMIT)
                .and_then(|value| value.trim().parse().ok())
                .filter(|&limit| limit > 0)
                .unwrap_or(DEFAULT_COLLECTOR_LIMIT),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    /// Create the results, logs and data directories.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.results_dir, &self.logs_dir, &self.data_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }
        Ok(())
    }
}
