use std::io;
use std::process::Command;

use super::{Detach, PlatformExtensions, Terminate, unix};
use crate::error::{ProcessError, Result};
use crate::system::process::CpuTimes;

pub struct Platform;

impl PlatformExtensions for Platform {
    fn process_swap(pid: u32) -> Option<u64> {
        // /proc/{pid}/status carries "VmSwap:     1234 kB"
        let path = format!("/proc/{pid}/status");
        let contents = std::fs::read_to_string(path).ok()?;
        contents.lines().find_map(|line| {
            let value = line.strip_prefix("VmSwap:")?;
            let kib: u64 = value.trim().trim_end_matches("kB").trim().parse().ok()?;
            Some(kib * 1024)
        })
    }

    fn process_cpu_times(pid: u32) -> Option<CpuTimes> {
        let path = format!("/proc/{pid}/stat");
        let contents = std::fs::read_to_string(path).ok()?;
        // comm field may contain spaces and parens, so find the closing )
        let after_comm = contents.rfind(')')? + 1;
        let fields: Vec<&str> = contents[after_comm..].split_whitespace().collect();
        // Fields after comm: state(0) ... utime(11) stime(12) ...
        // delayacct_blkio_ticks(39)
        let ticks = clock_ticks_per_second();
        let field = |index: usize| -> Option<f64> {
            fields.get(index)?.parse::<u64>().ok().map(|t| t as f64 / ticks)
        };
        Some(CpuTimes {
            user: field(11)?,
            system: field(12)?,
            idle: 0.0,
            iowait: field(39).unwrap_or(0.0),
        })
    }

    fn process_environ(pid: u32) -> Result<Vec<String>> {
        let path = format!("/proc/{pid}/environ");
        let raw = std::fs::read(&path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => ProcessError::NotFound(pid as i32),
            _ => ProcessError::Environ {
                pid: pid as i32,
                reason: format!("{path}: {err}"),
            },
        })?;
        Ok(raw
            .split(|&b| b == 0)
            .filter(|entry| !entry.is_empty())
            .map(|entry| String::from_utf8_lossy(entry).into_owned())
            .collect())
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

fn clock_ticks_per_second() -> f64 {
    // SAFETY: sysconf has no preconditions.
    let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if ticks > 0 { ticks as f64 } else { 100.0 }
}
