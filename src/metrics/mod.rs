mod types;

pub use types::{bytes_to_mb, ResourceSample, ResourceStats, ResourceSummary, MAX_RECENT_SAMPLES};

use chrono::Utc;
use std::collections::{HashMap, HashSet};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Samples memory and CPU of one process and its live descendants.
///
/// Memory is summed over the whole tree; CPU is the root's usage since the
/// previous refresh, as reported by sysinfo. A process that disappears
/// between listing and reading simply contributes nothing.
pub struct ResourceSampler {
    system: System,
    pid: Option<Pid>,
    stats: ResourceStats,
}

impl ResourceSampler {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            pid: None,
            stats: ResourceStats::new(),
        }
    }

    /// Bind to a running process. The first refresh establishes the CPU
    /// baseline, so the first real sample reports a delta.
    pub fn attach(&mut self, pid: u32) {
        let pid = Pid::from_u32(pid);
        self.system
            .refresh_processes_specifics(ProcessesToUpdate::Some(&[pid]), refresh_kind());

        if self.system.process(pid).is_some() {
            log_info!("resource sampler attached to pid {}", pid);
            self.pid = Some(pid);
        } else {
            log_info!("pid {} exited before the sampler could attach", pid);
        }
    }

    pub fn is_attached(&self) -> bool {
        self.pid.is_some()
    }

    /// Take one sample. Returns `None` when not attached or when the root
    /// process is already gone.
    pub fn sample(&mut self) -> Option<ResourceSample> {
        let pid = self.pid?;

        self.system
            .refresh_processes_specifics(ProcessesToUpdate::All, refresh_kind());

        let root = self.system.process(pid)?;
        let cpu_percent = root.cpu_usage();

        let edges = self
            .system
            .processes()
            .iter()
            .filter(|(_, process)| process.thread_kind().is_none())
            .filter_map(|(child, process)| {
                process
                    .parent()
                    .map(|parent| (child.as_u32(), parent.as_u32()))
            });
        let tree = descendants(pid.as_u32(), edges);

        let memory_bytes: u64 = std::iter::once(pid.as_u32())
            .chain(tree)
            .filter_map(|member| self.system.process(Pid::from_u32(member)))
            .map(|process| process.memory())
            .sum();

        let sample = ResourceSample {
            timestamp: Utc::now(),
            memory_mb: bytes_to_mb(memory_bytes),
            cpu_percent,
        };
        log_debug!(
            "pid {} sample: {:.1} MB, {:.1}% cpu",
            pid,
            sample.memory_mb,
            sample.cpu_percent
        );

        self.stats.record(sample.clone());
        Some(sample)
    }

    pub fn peak_memory_mb(&self) -> f64 {
        self.stats.peak_memory_mb()
    }

    pub fn stats(&self) -> &ResourceStats {
        &self.stats
    }

    pub fn summary(&self) -> ResourceSummary {
        self.stats.summary()
    }
}

impl Default for ResourceSampler {
    fn default() -> Self {
        Self::new()
    }
}

fn refresh_kind() -> ProcessRefreshKind {
    ProcessRefreshKind::new().with_cpu().with_memory()
}

/// All transitive children of `root`, given `(child, parent)` pairs.
/// The result never contains `root` itself, and cycles in the input are
/// tolerated.
pub fn descendants(root: u32, edges: impl IntoIterator<Item = (u32, u32)>) -> Vec<u32> {
    let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
    for (child, parent) in edges {
        if child != parent {
            children.entry(parent).or_default().push(child);
        }
    }

    let mut seen = HashSet::from([root]);
    let mut stack = vec![root];
    let mut found = Vec::new();

    while let Some(current) = stack.pop() {
        if let Some(kids) = children.get(&current) {
            for &kid in kids {
                if seen.insert(kid) {
                    found.push(kid);
                    stack.push(kid);
                }
            }
        }
    }

    found
}
