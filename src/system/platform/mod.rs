use std::process::Command;

use crate::error::Result;
use crate::system::process::CpuTimes;

/// Per-process queries that sysinfo does not cover on every platform.
pub trait PlatformExtensions {
    fn process_swap(pid: u32) -> Option<u64>;
    fn process_cpu_times(pid: u32) -> Option<CpuTimes>;
    /// Environment of a running process as `KEY=VALUE` strings.
    fn process_environ(pid: u32) -> Result<Vec<String>>;

    /// Scale a lifetime cpu percentage to the platform's convention.
    /// Unix tools report 100% per busy core, which is the raw value.
    fn normalize_cpu_percent(raw: f64) -> f64 {
        raw
    }
}

/// Moves a child out of the launcher's process group/session before exec,
/// so signals aimed at the launcher's group do not reach it.
pub trait Detach {
    fn detach(command: &mut Command);
}

/// Delivers the platform's polite termination request to a pid.
pub trait Terminate {
    fn terminate(pid: u32) -> Result<()>;
}

#[cfg(unix)]
mod unix;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "windows")]
mod windows;

#[cfg(target_os = "linux")]
use linux as platform_impl;
#[cfg(target_os = "macos")]
use macos as platform_impl;
#[cfg(target_os = "windows")]
use windows as platform_impl;

pub fn process_swap(pid: u32) -> Option<u64> {
    platform_impl::Platform::process_swap(pid)
}

pub fn process_cpu_times(pid: u32) -> Option<CpuTimes> {
    platform_impl::Platform::process_cpu_times(pid)
}

pub fn process_environ(pid: u32) -> Result<Vec<String>> {
    platform_impl::Platform::process_environ(pid)
}

pub fn normalize_cpu_percent(raw: f64) -> f64 {
    platform_impl::Platform::normalize_cpu_percent(raw)
}

pub fn detach(command: &mut Command) {
    platform_impl::Platform::detach(command)
}

pub fn terminate(pid: u32) -> Result<()> {
    platform_impl::Platform::terminate(pid)
}

/// Name of the signal `terminate` delivers, for log lines.
pub fn termination_signal_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "CTRL_BREAK_EVENT"
    } else {
        "SIGTERM"
    }
}
