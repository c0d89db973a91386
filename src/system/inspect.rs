use tracing::{debug, warn};

use super::metric::Metric;
use super::process::{ChildSnapshot, MemoryUsage, ProcessSnapshot};
use super::table::{ProcessTable, SysinfoTable};
use crate::error::{ProcessError, Result, check_pid};
use crate::format::{format_bytes, format_create_time, round_to};

/// Snapshot one process and its direct children.
pub fn get_process(pid: i32) -> Result<ProcessSnapshot> {
    check_pid(pid)?;
    let mut table = SysinfoTable::new();
    inspect(&mut table, pid)
}

/// Snapshot every pid that can be inspected. Pids that are invalid or gone
/// are left out, so the result may be shorter than `pids`.
pub fn get_processes(pids: &[i32]) -> Vec<ProcessSnapshot> {
    let mut table = SysinfoTable::new();
    pids.iter()
        .filter_map(|&pid| match inspect(&mut table, pid) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                debug!(pid, error = %err, "skipping pid");
                None
            }
        })
        .collect()
}

pub fn inspect<T: ProcessTable>(table: &mut T, pid: i32) -> Result<ProcessSnapshot> {
    let pid = check_pid(pid)?;
    if !table.resolve(pid) {
        return Err(ProcessError::NotFound(pid as i32));
    }

    let name = logged(pid, "name", table.name(pid));
    let cpu_percent = logged(pid, "cpu_percent", table.cpu_percent(pid)).map(|c| round_to(c, 1));

    let cpu_times = logged(pid, "cpu_times", table.cpu_times(pid));
    let cpu_total = cpu_times.clone().map(|t| round_to(t.total(), 2));
    let cpu_user = cpu_times.clone().map(|t| t.user);
    let cpu_system = cpu_times.clone().map(|t| t.system);
    let cpu_idle = cpu_times.clone().map(|t| t.idle);
    let cpu_iowait = cpu_times.map(|t| t.iowait);

    let memory = logged(pid, "memory", table.memory(pid));
    let (vms, rss) = format_memory(&memory);
    let swap = logged(pid, "swap", table.swap(pid)).map(format_bytes);

    let cmdline = logged(pid, "cmdline", table.cmdline(pid));
    let exe = logged(pid, "exe", table.exe(pid));
    let cwd = logged(pid, "cwd", table.cwd(pid));
    let create_time = logged(pid, "create_time", table.create_time_millis(pid)).and_then(|ms| {
        Metric::from_option(format_create_time(ms), "creation time is out of range")
    });
    let status = logged(pid, "status", table.status(pid));
    let ppid = logged(pid, "ppid", table.ppid(pid));

    let mut sum_cpu = cpu_percent.value().copied().unwrap_or(0.0);
    let mut sum_rss = memory.value().map(|m| m.rss).unwrap_or(0);
    let children: Vec<ChildSnapshot> = match table.children(pid) {
        Metric::Value(pids) => pids
            .into_iter()
            .map(|child| {
                let (snapshot, rss) = snapshot_child(table, child);
                sum_cpu += snapshot.cpu_percent.value().copied().unwrap_or(0.0);
                sum_rss += rss;
                snapshot
            })
            .collect(),
        Metric::Unavailable(reason) => {
            warn!(pid, %reason, "listing children failed");
            Vec::new()
        }
    };

    // The process may have exited while the fields above were read.
    let exist = logged(pid, "exist", table.exists(pid));

    Ok(ProcessSnapshot {
        name,
        pid,
        ppid,
        exist,
        status,
        cpu_percent,
        cpu_total,
        cpu_user,
        cpu_system,
        cpu_idle,
        cpu_iowait,
        vms,
        rss,
        swap,
        cmdline,
        exe,
        cwd,
        create_time,
        children,
        sum_cpu_percent: round_to(sum_cpu, 1),
        sum_rss: format_bytes(sum_rss),
    })
}

/// Reduced snapshot of a child, plus its raw rss for the parent's sum.
fn snapshot_child<T: ProcessTable>(table: &T, pid: u32) -> (ChildSnapshot, u64) {
    let memory = logged(pid, "child memory", table.memory(pid));
    let (vms, rss) = format_memory(&memory);
    let snapshot = ChildSnapshot {
        name: logged(pid, "child name", table.name(pid)),
        cmdline: logged(pid, "child cmdline", table.cmdline(pid)),
        pid,
        cpu_percent: logged(pid, "child cpu_percent", table.cpu_percent(pid))
            .map(|c| round_to(c, 1)),
        vms,
        rss,
        swap: logged(pid, "child swap", table.swap(pid)).map(format_bytes),
    };
    (snapshot, memory.value().map(|m| m.rss).unwrap_or(0))
}

fn format_memory(memory: &Metric<MemoryUsage>) -> (Metric<String>, Metric<String>) {
    (
        memory.clone().map(|m| format_bytes(m.vms)),
        memory.clone().map(|m| format_bytes(m.rss)),
    )
}

fn logged<T>(pid: u32, field: &str, metric: Metric<T>) -> Metric<T> {
    if let Some(reason) = metric.reason() {
        warn!(pid, field, %reason, "metric unavailable");
    }
    metric
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_process_snapshot() {
        let pid = std::process::id() as i32;
        let snapshot = get_process(pid).unwrap();
        assert_eq!(snapshot.pid, pid as u32);
        assert_eq!(snapshot.exist, Metric::Value(true));
        assert!(snapshot.name.is_available());
        assert!(snapshot.rss.is_available());
        assert!(snapshot.sum_cpu_percent >= snapshot.cpu_percent.value().copied().unwrap_or(0.0));
    }

    #[test]
    fn invalid_pids_are_rejected_early() {
        for pid in [-1, 0, 1] {
            assert!(matches!(get_process(pid), Err(ProcessError::InvalidPid(_))));
        }
    }

    #[test]
    fn missing_pid_is_not_found() {
        let err = get_process(i32::MAX - 7).unwrap_err();
        assert!(err.is_not_found());
    }
}
