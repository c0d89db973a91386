use std::time::{SystemTime, UNIX_EPOCH};

use sysinfo::{Pid, Process, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};

use super::metric::Metric;
use super::platform;
use super::process::{CpuTimes, MemoryUsage};

/// Read access to the OS process table, one pid at a time.
///
/// `resolve` must be called for a pid before any other query on it.
/// Every query answers independently so a snapshot can keep going when one
/// of them fails.
pub trait ProcessTable {
    /// Refresh the table for `pid`; `false` when the process does not exist.
    fn resolve(&mut self, pid: u32) -> bool;
    fn name(&self, pid: u32) -> Metric<String>;
    fn cmdline(&self, pid: u32) -> Metric<String>;
    fn exe(&self, pid: u32) -> Metric<String>;
    fn cwd(&self, pid: u32) -> Metric<String>;
    fn memory(&self, pid: u32) -> Metric<MemoryUsage>;
    fn swap(&self, pid: u32) -> Metric<u64>;
    /// Unrounded cpu usage in percent.
    fn cpu_percent(&self, pid: u32) -> Metric<f64>;
    fn cpu_times(&self, pid: u32) -> Metric<CpuTimes>;
    fn create_time_millis(&self, pid: u32) -> Metric<i64>;
    fn status(&self, pid: u32) -> Metric<String>;
    fn ppid(&self, pid: u32) -> Metric<u32>;
    fn children(&self, pid: u32) -> Metric<Vec<u32>>;
    /// Re-check existence against the live OS state.
    fn exists(&mut self, pid: u32) -> Metric<bool>;
}

/// [`ProcessTable`] backed by sysinfo, completed by the platform extensions
/// for swap and per-state cpu times.
pub struct SysinfoTable {
    sys: System,
}

impl Default for SysinfoTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoTable {
    pub fn new() -> Self {
        SysinfoTable { sys: System::new() }
    }

    fn process(&self, pid: u32) -> Option<&Process> {
        self.sys.process(Pid::from_u32(pid))
    }

    fn with_process<T>(&self, pid: u32, f: impl FnOnce(&Process) -> Metric<T>) -> Metric<T> {
        match self.process(pid) {
            Some(process) => f(process),
            None => Metric::unavailable("process is no longer in the process table"),
        }
    }

    fn child_pids(&self, pid: u32) -> Vec<u32> {
        let parent = Pid::from_u32(pid);
        let mut children: Vec<u32> = self
            .sys
            .processes()
            .iter()
            .filter(|(_, p)| p.thread_kind().is_none() && p.parent() == Some(parent))
            .map(|(child, _)| child.as_u32())
            .collect();
        children.sort_unstable();
        children
    }
}

fn detail_refresh_kind() -> ProcessRefreshKind {
    ProcessRefreshKind::nothing()
        .with_memory()
        .with_cpu()
        .with_cmd(UpdateKind::OnlyIfNotSet)
        .with_exe(UpdateKind::OnlyIfNotSet)
        .with_cwd(UpdateKind::Always)
}

impl ProcessTable for SysinfoTable {
    fn resolve(&mut self, pid: u32) -> bool {
        // Parent links come with the cheapest refresh; details are only
        // loaded for the target and its direct children.
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing(),
        );
        if self.process(pid).is_none() {
            return false;
        }
        let targets: Vec<Pid> = std::iter::once(pid)
            .chain(self.child_pids(pid))
            .map(Pid::from_u32)
            .collect();
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&targets),
            true,
            detail_refresh_kind(),
        );
        self.process(pid).is_some()
    }

    fn name(&self, pid: u32) -> Metric<String> {
        self.with_process(pid, |p| {
            Metric::Value(p.name().to_string_lossy().to_string())
        })
    }

    fn cmdline(&self, pid: u32) -> Metric<String> {
        self.with_process(pid, |p| {
            let command = p
                .cmd()
                .iter()
                .map(|s| s.to_string_lossy().to_string())
                .collect::<Vec<_>>()
                .join(" ");
            Metric::Value(command)
        })
    }

    fn exe(&self, pid: u32) -> Metric<String> {
        self.with_process(pid, |p| {
            Metric::from_option(
                p.exe().map(|path| path.display().to_string()),
                "executable path is not readable",
            )
        })
    }

    fn cwd(&self, pid: u32) -> Metric<String> {
        self.with_process(pid, |p| {
            Metric::from_option(
                p.cwd().map(|path| path.display().to_string()),
                "working directory is not readable",
            )
        })
    }

    fn memory(&self, pid: u32) -> Metric<MemoryUsage> {
        self.with_process(pid, |p| {
            Metric::Value(MemoryUsage {
                rss: p.memory(),
                vms: p.virtual_memory(),
            })
        })
    }

    fn swap(&self, pid: u32) -> Metric<u64> {
        Metric::from_option(
            platform::process_swap(pid),
            "swap usage is not available for this process",
        )
    }

    fn cpu_percent(&self, pid: u32) -> Metric<f64> {
        // Average over the process lifetime, like `ps` reports it.
        self.with_process(pid, |p| {
            let now_ms = match SystemTime::now().duration_since(UNIX_EPOCH) {
                Ok(now) => now.as_millis() as f64,
                Err(_) => return Metric::unavailable("system clock is before UNIX_EPOCH"),
            };
            let elapsed_ms = now_ms - (p.start_time() as f64 * 1000.0);
            if elapsed_ms <= 0.0 {
                return Metric::Value(0.0);
            }
            let raw = p.accumulated_cpu_time() as f64 / elapsed_ms * 100.0;
            Metric::Value(platform::normalize_cpu_percent(raw))
        })
    }

    fn cpu_times(&self, pid: u32) -> Metric<CpuTimes> {
        Metric::from_option(
            platform::process_cpu_times(pid),
            "cpu times are not readable",
        )
    }

    fn create_time_millis(&self, pid: u32) -> Metric<i64> {
        self.with_process(pid, |p| Metric::Value(p.start_time() as i64 * 1000))
    }

    fn status(&self, pid: u32) -> Metric<String> {
        self.with_process(pid, |p| Metric::Value(p.status().to_string()))
    }

    fn ppid(&self, pid: u32) -> Metric<u32> {
        self.with_process(pid, |p| {
            Metric::from_option(p.parent().map(|pp| pp.as_u32()), "process has no parent")
        })
    }

    fn children(&self, pid: u32) -> Metric<Vec<u32>> {
        self.with_process(pid, |_| Metric::Value(self.child_pids(pid)))
    }

    fn exists(&mut self, pid: u32) -> Metric<bool> {
        let target = Pid::from_u32(pid);
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[target]),
            true,
            ProcessRefreshKind::nothing(),
        );
        Metric::Value(self.sys.process(target).is_some())
    }
}
