use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use tracing::warn;

use crate::error::{ProcessError, Result};

/// Make `path` ready to receive a pid before anything is launched: it must
/// not exist yet and its directory is created when missing.
///
/// A directory that cannot be created is reported as `AlreadyExists`, the
/// same kind as a file that is already present.
pub fn prepare(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(ProcessError::AlreadyExists(path.to_path_buf()));
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && let Err(err) = fs::create_dir_all(parent)
    {
        warn!(path = %path.display(), error = %err, "cannot create pid file directory");
        return Err(ProcessError::AlreadyExists(path.to_path_buf()));
    }
    Ok(())
}

/// Record `pid` in a new file at `path`. An existing file is never
/// overwritten. Call [`prepare`] first; missing directories are not created
/// here.
pub fn write_pid(path: &Path, pid: u32) -> Result<()> {
    let pid_file_error = |source: io::Error| ProcessError::PidFile {
        path: path.to_path_buf(),
        source,
    };

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|err| match err.kind() {
            io::ErrorKind::AlreadyExists => ProcessError::AlreadyExists(path.to_path_buf()),
            _ => pid_file_error(err),
        })?;
    writeln!(file, "{pid}").map_err(pid_file_error)
}

pub fn read_pid(path: &Path) -> Result<i32> {
    let contents = fs::read_to_string(path).map_err(|source| ProcessError::PidFile {
        path: path.to_path_buf(),
        source,
    })?;
    contents.trim().parse().map_err(|err| ProcessError::PidFile {
        path: path.to_path_buf(),
        source: io::Error::new(io::ErrorKind::InvalidData, err),
    })
}

pub fn remove(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(ProcessError::PidFile {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run").join("svc.pid");
        prepare(&path).unwrap();
        assert!(path.parent().unwrap().is_dir());
        write_pid(&path, 4242).unwrap();
        assert_eq!(read_pid(&path).unwrap(), 4242);
        remove(&path).unwrap();
        remove(&path).unwrap();
    }

    #[test]
    fn existing_file_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("svc.pid");
        fs::write(&path, "1\n").unwrap();
        assert!(matches!(prepare(&path), Err(ProcessError::AlreadyExists(_))));
        assert!(matches!(write_pid(&path, 7), Err(ProcessError::AlreadyExists(_))));
        assert_eq!(fs::read_to_string(&path).unwrap(), "1\n");
    }

    #[test]
    fn blocked_directory_is_refused_up_front() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let path = blocker.join("svc.pid");
        assert!(matches!(prepare(&path), Err(ProcessError::AlreadyExists(p)) if p == path));
    }

    #[test]
    fn write_does_not_create_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("svc.pid");
        assert!(matches!(write_pid(&path, 7), Err(ProcessError::PidFile { .. })));
    }

    #[test]
    fn garbage_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("svc.pid");
        fs::write(&path, "not a pid").unwrap();
        assert!(matches!(read_pid(&path), Err(ProcessError::PidFile { .. })));
    }
}
