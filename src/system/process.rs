use serde::Serialize;

use super::metric::Metric;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildSnapshot {
    pub name: Metric<String>,
    pub cmdline: Metric<String>,
    pub pid: u32,
    pub cpu_percent: Metric<f64>,
    pub vms: Metric<String>,
    pub rss: Metric<String>,
    pub swap: Metric<String>,
}

/// Point-in-time read of one process and its direct children.
///
/// `sum_cpu_percent` and `sum_rss` are computed once while the snapshot is
/// built and are not kept in sync with `children` afterwards.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSnapshot {
    pub name: Metric<String>,
    pub pid: u32,
    pub ppid: Metric<u32>,
    pub exist: Metric<bool>,
    pub status: Metric<String>,
    pub cpu_percent: Metric<f64>,
    pub cpu_total: Metric<f64>,
    pub cpu_user: Metric<f64>,
    pub cpu_system: Metric<f64>,
    pub cpu_idle: Metric<f64>,
    pub cpu_iowait: Metric<f64>,
    pub vms: Metric<String>,
    pub rss: Metric<String>,
    pub swap: Metric<String>,
    pub cmdline: Metric<String>,
    pub exe: Metric<String>,
    pub cwd: Metric<String>,
    pub create_time: Metric<String>,
    pub children: Vec<ChildSnapshot>,
    pub sum_cpu_percent: f64,
    pub sum_rss: String,
}

/// Per-state cpu time of a process, in seconds.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CpuTimes {
    pub user: f64,
    pub system: f64,
    pub idle: f64,
    pub iowait: f64,
}

impl CpuTimes {
    pub fn total(&self) -> f64 {
        self.user + self.system + self.idle + self.iowait
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryUsage {
    pub rss: u64,
    pub vms: u64,
}
