/// UUCP-style lock file guarding the serial device
use log::{info, warn};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("valid lockfile exists: {}, pid {pid}", .path.display())]
    Held { path: PathBuf, pid: u32 },
    #[error("cannot create lockfile {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Holds `<lock_dir>/LCK..<tty>` for as long as it lives
///
/// The file contains the owning PID right-aligned in 11 columns, as other
/// UUCP-aware tools expect. It is removed when the lock is dropped.
#[derive(Debug)]
pub struct DeviceLock {
    path: PathBuf,
}

impl DeviceLock {
    pub fn acquire(lock_dir: &Path, tty: &str) -> Result<Self, LockError> {
        Self::acquire_with(lock_dir, tty, Path::new("/proc"))
    }

    /// `proc_root` is where live PIDs show up as directories
    fn acquire_with(lock_dir: &Path, tty: &str, proc_root: &Path) -> Result<Self, LockError> {
        let path = lock_dir.join(format!("LCK..{}", tty));
        let io_error = |source| LockError::Io {
            path: path.clone(),
            source,
        };

        match fs::read_to_string(&path) {
            Ok(content) => {
                match content.trim().parse::<u32>() {
                    Ok(pid) if proc_root.join(pid.to_string()).exists() => {
                        return Err(LockError::Held { path, pid });
                    }
                    Ok(pid) => warn!("stale lockfile exists: {}, pid {}", path.display(), pid),
                    Err(_) => warn!("unreadable lockfile {}, replacing it", path.display()),
                }
                fs::remove_file(&path).map_err(io_error)?;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_error(e)),
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(io_error)?;
        write!(file, "{:>11}", std::process::id()).map_err(io_error)?;

        info!("Created lockfile {}", path.display());
        Ok(DeviceLock { path })
    }
}

impl Drop for DeviceLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to remove lockfile {}: {}", self.path.display(), e);
        }
    }
}
