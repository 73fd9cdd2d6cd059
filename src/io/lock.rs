use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// How long a writer waits for another `lb` process before giving up
pub const DEFAULT_WAIT: Duration = Duration::from_secs(2);

/// Advisory lock on one stored key, released when dropped.
///
/// Held for the duration of a single file replacement. Two processes that
/// both read, modify and write the same key still race; the last writer wins.
/// The lock file itself is never removed: every process must lock the same
/// inode.
pub struct KeyLock {
    _file: File,
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not create lock file at {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{key} is locked by another lb process")]
    Busy { key: String },
}

/// Lock file for `key`. Dot-prefixed so it can never collide with a key.
pub fn lock_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!(".{}.lock", key))
}

impl KeyLock {
    /// Lock `key` in `dir`, polling until `wait` has passed
    pub fn acquire(dir: &Path, key: &str, wait: Duration) -> Result<Self, LockError> {
        let path = lock_path(dir, key);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| LockError::Create {
                path: path.clone(),
                source,
            })?;

        let deadline = Instant::now() + wait;
        while try_lock(&file).is_err() {
            if Instant::now() >= deadline {
                return Err(LockError::Busy {
                    key: key.to_string(),
                });
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        Ok(KeyLock { _file: file })
    }
}

#[cfg(unix)]
fn try_lock(file: &File) -> Result<(), std::io::Error> {
    use std::os::unix::io::AsRawFd;
    let fd = file.as_raw_fd();
    let result = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn try_lock(_file: &File) -> Result<(), std::io::Error> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn drop_releases_lock_but_keeps_file() {
        let tmp = TempDir::new().unwrap();
        let lock = KeyLock::acquire(tmp.path(), "leadTrackerData", DEFAULT_WAIT).unwrap();
        drop(lock);
        assert!(lock_path(tmp.path(), "leadTrackerData").exists());
        let again = KeyLock::acquire(tmp.path(), "leadTrackerData", Duration::from_millis(30));
        assert!(again.is_ok());
    }

    #[test]
    fn waiter_locks_the_same_file_after_release() {
        let tmp = TempDir::new().unwrap();
        let first = KeyLock::acquire(tmp.path(), "taskTrackerTasksGrouped", DEFAULT_WAIT).unwrap();
        let dir = tmp.path().to_path_buf();
        let waiter = std::thread::spawn(move || {
            KeyLock::acquire(&dir, "taskTrackerTasksGrouped", Duration::from_secs(2))
        });
        std::thread::sleep(Duration::from_millis(50));
        drop(first);
        let held = waiter.join().unwrap().unwrap();

        // With the waiter holding the lock, a newcomer must not get in
        let newcomer = KeyLock::acquire(tmp.path(), "taskTrackerTasksGrouped", Duration::from_millis(30));
        assert!(matches!(newcomer, Err(LockError::Busy { .. })));
        drop(held);
    }

    #[test]
    fn held_key_is_busy_but_other_keys_are_free() {
        let tmp = TempDir::new().unwrap();
        let _held = KeyLock::acquire(tmp.path(), "leadTrackerData", DEFAULT_WAIT).unwrap();
        let second = KeyLock::acquire(tmp.path(), "leadTrackerData", Duration::from_millis(30));
        assert!(matches!(second, Err(LockError::Busy { ref key }) if key == "leadTrackerData"));
        assert!(KeyLock::acquire(tmp.path(), "taskTrackerTasksGrouped", Duration::from_millis(30)).is_ok());
    }
}
