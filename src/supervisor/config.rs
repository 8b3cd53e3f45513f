use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

use crate::settings::{DEFAULT_SAMPLE_INTERVAL_MS, DEFAULT_TIMEOUT_SECS};

/// Everything needed to launch and watch one collector process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory of the child; inherits ours when `None`.
    pub working_dir: Option<PathBuf>,
    /// Wall-clock budget before the child is killed.
    pub timeout: Duration,
    /// Pause between two polls of the child (and two resource samples).
    pub sample_interval: Duration,
    /// Files the collector is expected to write, in reporting order.
    pub output_files: Vec<PathBuf>,
    /// Receives the child's stdout and stderr.
    pub log_file: PathBuf,
}

impl RunConfig {
    pub fn new(program: impl Into<String>, log_file: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            sample_interval: Duration::from_millis(DEFAULT_SAMPLE_INTERVAL_MS),
            output_files: Vec::new(),
            log_file: log_file.into(),
        }
    }

    /// Build from an argv vector; the first element is the program.
    /// An empty vector yields an empty program, which fails at launch.
    pub fn from_argv(argv: &[String], log_file: impl Into<PathBuf>) -> Self {
        let mut config = Self::new(argv.first().cloned().unwrap_or_default(), log_file);
        config.args = argv.iter().skip(1).cloned().collect();
        config
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    pub fn output_files<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.output_files.extend(files.into_iter().map(Into::into));
        self
    }

    /// Program and arguments joined for display.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
