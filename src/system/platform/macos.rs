use std::process::Command;

use libproc::libproc::proc_pid::pidinfo;
use libproc::libproc::task_info::TaskInfo;
use tracing::debug;

use super::{Detach, PlatformExtensions, Terminate, unix};
use crate::error::{ProcessError, Result};
use crate::system::environ::recover_environ;
use crate::system::process::CpuTimes;

pub struct Platform;

impl PlatformExtensions for Platform {
    fn process_swap(_pid: u32) -> Option<u64> {
        // macOS does not account swap per process
        None
    }

    fn process_cpu_times(pid: u32) -> Option<CpuTimes> {
        let info = pidinfo::<TaskInfo>(pid as i32, 0).ok()?;
        let scale = nanos_per_tick();
        Some(CpuTimes {
            user: info.pti_total_user as f64 * scale / 1e9,
            system: info.pti_total_system as f64 * scale / 1e9,
            idle: 0.0,
            iowait: 0.0,
        })
    }

    /// There is no per-process environment API here, so the environment is
    /// recovered from `ps -Eww`, which prints the command line and the
    /// environment on one line.
    fn process_environ(pid: u32) -> Result<Vec<String>> {
        let output = Command::new("ps")
            .args(["-p", &pid.to_string(), "-Eww", "-o", "command"])
            .output()
            .map_err(|err| ProcessError::Environ {
                pid: pid as i32,
                reason: format!("failed to run ps: {err}"),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        // The first line is the column header.
        match stdout.lines().nth(1) {
            Some(line) if output.status.success() => Ok(recover_environ(line)),
            _ => {
                debug!(pid, status = %output.status, "ps returned no row");
                Err(ProcessError::NotFound(pid as i32))
            }
        }
    }
}

impl Detach for Platform {
    fn detach(command: &mut Command) {
        unix::detach(command)
    }
}

impl Terminate for Platform {
    fn terminate(pid: u32) -> Result<()> {
        unix::terminate(pid)
    }
}

/// Task times are reported in mach absolute time units, which are only
/// nanoseconds on Intel hardware.
#[allow(deprecated)]
fn nanos_per_tick() -> f64 {
    let mut timebase = libc::mach_timebase_info { numer: 0, denom: 0 };
    // SAFETY: the pointer refers to a live, writable struct.
    let rc = unsafe { libc::mach_timebase_info(&mut timebase) };
    if rc != 0 || timebase.denom == 0 {
        1.0
    } else {
        timebase.numer as f64 / timebase.denom as f64
    }
}
