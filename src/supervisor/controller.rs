use anyhow::{Context, Result};
use std::{fs::File, process::Stdio, time::Duration};
use tokio::{
    process::{Child, Command},
    task::JoinHandle,
    time::{self, Instant},
};

use crate::metrics::{ResourceSampler, ResourceSummary};

use super::{RunConfig, RunStatus, ABNORMAL_EXIT_CODE};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// What the supervisor observed over the child's lifetime.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub status: RunStatus,
    /// Wall-clock time from spawn to exit (or kill).
    pub duration: Duration,
    pub resources: ResourceSummary,
    pub pid: Option<u32>,
}

impl RunOutcome {
    pub fn success(&self) -> bool {
        self.status.is_success()
    }
}

/// Runs one external process to completion under a wall-clock budget,
/// sampling its resource usage between polls.
pub struct ProcessSupervisor {
    config: RunConfig,
    sampler: ResourceSampler,
}

impl ProcessSupervisor {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            sampler: ResourceSampler::new(),
        }
    }

    /// Run the supervisor on its own task. Each supervisor owns its sampler,
    /// so several can run side by side.
    pub fn spawn(self) -> JoinHandle<RunOutcome> {
        tokio::spawn(self.run())
    }

    /// Launch the child and poll it until it exits or the budget runs out.
    ///
    /// Never fails: launch errors are reported as
    /// [`RunStatus::FailedToStart`] in the outcome.
    pub async fn run(mut self) -> RunOutcome {
        let started = Instant::now();

        let mut child = match self.launch() {
            Ok(child) => child,
            Err(err) => {
                log_error!("could not launch `{}`: {err:#}", self.config.command_line());
                return RunOutcome {
                    status: RunStatus::FailedToStart(format!("{err:#}")),
                    duration: started.elapsed(),
                    resources: ResourceSummary::default(),
                    pid: None,
                };
            }
        };

        let pid = child.id();
        if let Some(pid) = pid {
            self.sampler.attach(pid);
        }
        log_info!(
            "supervising pid {:?}: {} (timeout {:?}, interval {:?})",
            pid,
            self.config.command_line(),
            self.config.timeout,
            self.config.sample_interval
        );

        let status = self.poll_until_done(&mut child, started).await;
        let duration = started.elapsed();
        log_info!("pid {:?} {} after {:.2}s", pid, status.describe(), duration.as_secs_f64());
        if let Some(last) = self.sampler.stats().recent().last() {
            log_info!(
                "last sample at {}: {:.1} MB, {:.1}% cpu",
                last.timestamp.format("%H:%M:%S%.3f"),
                last.memory_mb,
                last.cpu_percent
            );
        }

        RunOutcome {
            status,
            duration,
            resources: self.sampler.summary(),
            pid,
        }
    }

    fn launch(&self) -> Result<Child> {
        if self.config.program.is_empty() {
            anyhow::bail!("empty command line");
        }

        let log = File::create(&self.config.log_file).with_context(|| {
            format!("failed to open log file {}", self.config.log_file.display())
        })?;
        let log_err = log
            .try_clone()
            .context("failed to duplicate log file handle")?;

        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .kill_on_drop(true);
        if let Some(dir) = &self.config.working_dir {
            command.current_dir(dir);
        }

        command
            .spawn()
            .with_context(|| format!("failed to spawn `{}`", self.config.program))
    }

    async fn poll_until_done(&mut self, child: &mut Child, started: Instant) -> RunStatus {
        loop {
            let exited = match child.try_wait() {
                Ok(status) => status.map(exit_code),
                Err(err) => {
                    log_error!("lost track of child process: {err}");
                    if let Err(err) = child.kill().await {
                        log_warn!("failed to kill child: {err}");
                    }
                    return RunStatus::Exited(ABNORMAL_EXIT_CODE);
                }
            };

            let status = RunStatus::step(exited, started.elapsed(), self.config.timeout);
            if status == RunStatus::TimedOut {
                log_warn!(
                    "`{}` exceeded {:?}; killing it",
                    self.config.program,
                    self.config.timeout
                );
                if let Err(err) = child.kill().await {
                    log_warn!("failed to kill child: {err}");
                }
            }
            if status.is_terminal() {
                return status;
            }

            self.sampler.sample();
            time::sleep(self.config.sample_interval).await;
        }
    }
}

/// Killed-by-signal has no code and maps to the sentinel.
fn exit_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(ABNORMAL_EXIT_CODE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supervisor::TIMEOUT_EXIT_CODE;

    fn config_in(dir: &tempfile::TempDir, program: &str) -> RunConfig {
        RunConfig::new(program, dir.path().join("run.log"))
            .timeout(Duration::from_secs(5))
            .sample_interval(Duration::from_millis(20))
    }

    #[tokio::test]
    async fn missing_program_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir, "/definitely/not/a/collector");

        let outcome = ProcessSupervisor::new(config).run().await;

        assert!(matches!(outcome.status, RunStatus::FailedToStart(_)));
        assert_eq!(outcome.status.exit_code(), Some(TIMEOUT_EXIT_CODE));
        assert!(!outcome.success());
        assert!(outcome.pid.is_none());
    }

    #[tokio::test]
    async fn empty_program_fails_to_start() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = ProcessSupervisor::new(config_in(&dir, "")).run().await;
        assert!(matches!(outcome.status, RunStatus::FailedToStart(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn clean_exit_is_success() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir, "sh").args(["-c", "echo collected; exit 0"]);
        let log_file = config.log_file.clone();

        let outcome = ProcessSupervisor::new(config).run().await;

        assert_eq!(outcome.status, RunStatus::Exited(0));
        assert!(outcome.success());
        let log = std::fs::read_to_string(log_file).unwrap();
        assert!(log.contains("collected"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_is_propagated() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir, "sh").args(["-c", "echo boom >&2; exit 3"]);
        let log_file = config.log_file.clone();

        let outcome = ProcessSupervisor::new(config).run().await;

        assert_eq!(outcome.status, RunStatus::Exited(3));
        assert!(!outcome.success());
        assert!(std::fs::read_to_string(log_file).unwrap().contains("boom"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn signal_death_maps_to_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir, "sh").args(["-c", "kill -9 $$"]);

        let outcome = ProcessSupervisor::new(config).run().await;

        assert_eq!(outcome.status, RunStatus::Exited(ABNORMAL_EXIT_CODE));
        assert!(!outcome.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn sleeping_child_is_killed_at_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir, "sh")
            .args(["-c", "echo partial; sleep 30"])
            .timeout(Duration::from_millis(300));

        let outcome = ProcessSupervisor::new(config).run().await;

        assert_eq!(outcome.status, RunStatus::TimedOut);
        assert!(!outcome.success());
        assert!(outcome.duration >= Duration::from_millis(300));
        assert!(outcome.duration < Duration::from_secs(10));
        assert!(outcome.resources.sample_count > 0);
        assert!(outcome.resources.peak_memory_mb > 0.0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir, "sh")
            .args(["-c", "echo '{}' > here.jsonl"])
            .working_dir(dir.path());

        let outcome = ProcessSupervisor::new(config).run().await;

        assert!(outcome.success());
        assert!(dir.path().join("here.jsonl").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn independent_supervisors_run_concurrently() {
        let dir = tempfile::tempdir().unwrap();
        let a = RunConfig::new("sh", dir.path().join("a.log"))
            .args(["-c", "exit 0"])
            .sample_interval(Duration::from_millis(10));
        let b = RunConfig::new("sh", dir.path().join("b.log"))
            .args(["-c", "exit 4"])
            .sample_interval(Duration::from_millis(10));

        let (a, b) = tokio::join!(
            ProcessSupervisor::new(a).spawn(),
            ProcessSupervisor::new(b).spawn()
        );

        assert_eq!(a.unwrap().status, RunStatus::Exited(0));
        assert_eq!(b.unwrap().status, RunStatus::Exited(4));
    }
}
