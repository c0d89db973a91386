//! In-memory process table shared by the integration tests.

#![allow(dead_code)]

use std::cell::Cell;
use std::collections::{HashMap, HashSet};

use svcproc::system::metric::Metric;
use svcproc::system::process::{CpuTimes, MemoryUsage};
use svcproc::system::table::ProcessTable;

#[derive(Clone, Debug, Default)]
pub struct FakeProcess {
    pub name: String,
    pub cmdline: String,
    pub exe: Option<String>,
    pub cwd: Option<String>,
    pub ppid: u32,
    pub status: String,
    pub rss: u64,
    pub vms: u64,
    pub swap: Option<u64>,
    pub cpu_percent: f64,
    pub cpu_times: Option<CpuTimes>,
    pub children: Vec<u32>,
}

impl FakeProcess {
    pub fn new(name: &str, ppid: u32) -> Self {
        FakeProcess {
            name: name.to_string(),
            cmdline: name.to_string(),
            ppid,
            status: "Sleeping".to_string(),
            ..Default::default()
        }
    }
}

#[derive(Default)]
pub struct FakeTable {
    pub processes: HashMap<u32, FakeProcess>,
    /// Pids whose name query fails.
    pub hidden_names: HashSet<u32>,
    /// Pids that disappear between `resolve` and the final existence check.
    pub exits_during_read: HashSet<u32>,
    pub resolve_calls: Cell<usize>,
}

impl FakeTable {
    pub fn with(mut self, pid: u32, process: FakeProcess) -> Self {
        self.processes.insert(pid, process);
        self
    }

    fn get<T>(&self, pid: u32, f: impl FnOnce(&FakeProcess) -> Metric<T>) -> Metric<T> {
        match self.processes.get(&pid) {
            Some(p) => f(p),
            None => Metric::unavailable("no such process"),
        }
    }
}

impl ProcessTable for FakeTable {
    fn resolve(&mut self, pid: u32) -> bool {
        self.resolve_calls.set(self.resolve_calls.get() + 1);
        self.processes.contains_key(&pid)
    }

    fn name(&self, pid: u32) -> Metric<String> {
        if self.hidden_names.contains(&pid) {
            return Metric::unavailable("access denied");
        }
        self.get(pid, |p| Metric::Value(p.name.clone()))
    }

    fn cmdline(&self, pid: u32) -> Metric<String> {
        self.get(pid, |p| Metric::Value(p.cmdline.clone()))
    }

    fn exe(&self, pid: u32) -> Metric<String> {
        self.get(pid, |p| Metric::from_option(p.exe.clone(), "not readable"))
    }

    fn cwd(&self, pid: u32) -> Metric<String> {
        self.get(pid, |p| Metric::from_option(p.cwd.clone(), "not readable"))
    }

    fn memory(&self, pid: u32) -> Metric<MemoryUsage> {
        self.get(pid, |p| {
            Metric::Value(MemoryUsage {
                rss: p.rss,
                vms: p.vms,
            })
        })
    }

    fn swap(&self, pid: u32) -> Metric<u64> {
        self.get(pid, |p| Metric::from_option(p.swap, "not supported"))
    }

    fn cpu_percent(&self, pid: u32) -> Metric<f64> {
        self.get(pid, |p| Metric::Value(p.cpu_percent))
    }

    fn cpu_times(&self, pid: u32) -> Metric<CpuTimes> {
        self.get(pid, |p| Metric::from_option(p.cpu_times, "not readable"))
    }

    fn create_time_millis(&self, _pid: u32) -> Metric<i64> {
        Metric::unavailable("not recorded")
    }

    fn status(&self, pid: u32) -> Metric<String> {
        self.get(pid, |p| Metric::Value(p.status.clone()))
    }

    fn ppid(&self, pid: u32) -> Metric<u32> {
        self.get(pid, |p| Metric::Value(p.ppid))
    }

    fn children(&self, pid: u32) -> Metric<Vec<u32>> {
        self.get(pid, |p| Metric::Value(p.children.clone()))
    }

    fn exists(&mut self, pid: u32) -> Metric<bool> {
        Metric::Value(self.processes.contains_key(&pid) && !self.exits_during_read.contains(&pid))
    }
}

/// A tomcat-like parent with two workers.
pub fn service_tree() -> FakeTable {
    let parent = FakeProcess {
        cmdline: "java -jar catalina.jar".to_string(),
        exe: Some("/usr/bin/java".to_string()),
        cwd: Some("/opt/tomcat".to_string()),
        rss: 50 * 1024 * 1024,
        vms: 1536 * 1024 * 1024,
        cpu_percent: 12.34,
        cpu_times: Some(CpuTimes {
            user: 3.456,
            system: 1.2,
            idle: 0.0,
            iowait: 0.004,
        }),
        children: vec![101, 102],
        ..FakeProcess::new("catalina", 1)
    };
    let first = FakeProcess {
        cmdline: "worker --id 1".to_string(),
        rss: 1024 * 1024,
        vms: 4 * 1024 * 1024,
        swap: Some(0),
        cpu_percent: 1.25,
        ..FakeProcess::new("worker", 100)
    };
    let second = FakeProcess {
        cmdline: "worker --id 2".to_string(),
        rss: 2048,
        vms: 8192,
        ..FakeProcess::new("worker", 100)
    };
    FakeTable::default()
        .with(100, parent)
        .with(101, first)
        .with(102, second)
}
