use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Exit code reported when the collector had to be killed for exceeding
/// its budget, or never started at all.
pub const TIMEOUT_EXIT_CODE: i32 = -1;

/// Exit code reported when the child died without an exit code (signal)
/// or its status could not be read.
pub const ABNORMAL_EXIT_CODE: i32 = -1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "state", content = "detail")]
pub enum RunStatus {
    Running,
    /// The child exited on its own. Death by signal is reported as
    /// [`ABNORMAL_EXIT_CODE`].
    Exited(i32),
    TimedOut,
    FailedToStart(String),
}

impl Default for RunStatus {
    fn default() -> Self {
        RunStatus::Running
    }
}

impl RunStatus {
    /// One transition of the poll loop.
    ///
    /// The exit check comes first: a child that exited in the same poll in
    /// which the budget ran out is reported as exited, not timed out.
    pub fn step(exited: Option<i32>, elapsed: Duration, timeout: Duration) -> Self {
        match exited {
            Some(code) => RunStatus::Exited(code),
            None if elapsed > timeout => RunStatus::TimedOut,
            None => RunStatus::Running,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Exited(0))
    }

    /// Code recorded in the report. `None` only while still running.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            RunStatus::Running => None,
            RunStatus::Exited(code) => Some(*code),
            RunStatus::TimedOut | RunStatus::FailedToStart(_) => Some(TIMEOUT_EXIT_CODE),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            RunStatus::Running => "running".to_string(),
            RunStatus::Exited(code) => format!("exited with code {code}"),
            RunStatus::TimedOut => "killed after exceeding its timeout".to_string(),
            RunStatus::FailedToStart(reason) => format!("failed to start: {reason}"),
        }
    }
}
