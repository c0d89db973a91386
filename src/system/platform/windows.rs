use std::io;
use std::os::windows::process::CommandExt;
use std::process::Command;

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};
use tracing::debug;
use windows_sys::Win32::{
    Foundation::{CloseHandle, FILETIME},
    System::Console::{CTRL_BREAK_EVENT, GenerateConsoleCtrlEvent},
    System::Threading::{
        CREATE_NEW_PROCESS_GROUP, GetProcessTimes, OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION,
    },
};

use super::{Detach, PlatformExtensions, Terminate};
use crate::error::{ProcessError, Result};
use crate::system::process::CpuTimes;

pub struct Platform;

impl PlatformExtensions for Platform {
    fn process_swap(_pid: u32) -> Option<u64> {
        None
    }

    fn process_cpu_times(pid: u32) -> Option<CpuTimes> {
        let zero = FILETIME {
            dwLowDateTime: 0,
            dwHighDateTime: 0,
        };
        let (mut created, mut exited, mut kernel, mut user) = (zero, zero, zero, zero);
        unsafe {
            let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid);
            if handle.is_null() {
                return None;
            }
            let ok = GetProcessTimes(handle, &mut created, &mut exited, &mut kernel, &mut user);
            CloseHandle(handle);
            if ok == 0 {
                return None;
            }
        }
        Some(CpuTimes {
            user: filetime_seconds(&user),
            system: filetime_seconds(&kernel),
            idle: 0.0,
            iowait: 0.0,
        })
    }

    fn process_environ(pid: u32) -> Result<Vec<String>> {
        let mut sys = System::new();
        let target = Pid::from_u32(pid);
        sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[target]),
            true,
            ProcessRefreshKind::nothing().with_environ(UpdateKind::Always),
        );
        let process = sys
            .process(target)
            .ok_or(ProcessError::NotFound(pid as i32))?;
        Ok(process
            .environ()
            .iter()
            .map(|e| e.to_string_lossy().into_owned())
            .collect())
    }

    // Task Manager shares 100% across all logical cores.
    fn normalize_cpu_percent(raw: f64) -> f64 {
        raw / num_cpus::get().max(1) as f64
    }
}

impl Detach for Platform {
    fn detach(command: &mut Command) {
        command.creation_flags(CREATE_NEW_PROCESS_GROUP);
    }
}

impl Terminate for Platform {
    /// Windows has no SIGTERM; the closest polite request is a console
    /// break event, which reaches children started in their own group.
    fn terminate(pid: u32) -> Result<()> {
        unsafe {
            let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid);
            if handle.is_null() {
                return Err(ProcessError::NotFound(pid as i32));
            }
            CloseHandle(handle);
        }
        debug!(pid, "sending CTRL_BREAK_EVENT");
        let ok = unsafe { GenerateConsoleCtrlEvent(CTRL_BREAK_EVENT, pid) };
        if ok == 0 {
            return Err(ProcessError::Signal {
                pid: pid as i32,
                source: io::Error::last_os_error(),
            });
        }
        Ok(())
    }
}

fn filetime_seconds(ft: &FILETIME) -> f64 {
    let ticks = ((ft.dwHighDateTime as u64) << 32) | ft.dwLowDateTime as u64;
    // FILETIME counts 100ns intervals
    ticks as f64 / 10_000_000.0
}
