//! File locking and atomic replacement for the task store.
//!
//! Writers take an exclusive `fs2` lock on a sibling `.lock` file, then
//! replace the target through a temp file in the same directory so readers
//! never observe a partial write.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// Default lock timeout in milliseconds
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;

const LOCK_RETRY_INTERVAL_MS: u64 = 25;

fn is_lock_contended(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::WouldBlock {
        return true;
    }

    // Windows reports sharing violations instead of WouldBlock.
    #[cfg(windows)]
    {
        matches!(err.raw_os_error(), Some(32) | Some(33))
    }
    #[cfg(not(windows))]
    {
        false
    }
}

/// Exclusive lock guard; released on drop.
pub struct FileLock {
    file: File,
}

impl FileLock {
    /// Acquire an exclusive lock, retrying until `timeout_ms` elapses.
    pub fn acquire(path: impl AsRef<Path>, timeout_ms: u64) -> Result<Self> {
        let path = path.as_ref();
        let file = open_lock_file(path)?;

        let start = Instant::now();
        let timeout = Duration::from_millis(timeout_ms);
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(FileLock { file }),
                Err(err) if is_lock_contended(&err) => {
                    if start.elapsed() >= timeout {
                        return Err(Error::LockFailed(path.to_path_buf()));
                    }
                    std::thread::sleep(Duration::from_millis(LOCK_RETRY_INTERVAL_MS));
                }
                Err(err) => return Err(Error::Io(err)),
            }
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn open_lock_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?)
}

/// Lock path used for a data file: `tasks.jsonl` -> `tasks.jsonl.lock`.
pub fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
}

/// Replace `path` with `data` via a temp file and rename. Takes no lock.
pub fn write_atomic(path: impl AsRef<Path>, data: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let mut temp = NamedTempFile::new_in(&parent)?;
    temp.write_all(data)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|err| Error::Io(err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn lock_blocks_second_holder_until_dropped() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join("tasks.lock");

        let lock = FileLock::acquire(&lock_path, 1000).unwrap();
        assert!(lock_path.exists());
        assert!(FileLock::acquire(&lock_path, 0).is_err());

        drop(lock);
        assert!(FileLock::acquire(&lock_path, 0).is_ok());
    }

    #[test]
    fn timeout_returns_lock_failed() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join("timeout.lock");

        let _lock = FileLock::acquire(&lock_path, 1000).unwrap();
        let result = FileLock::acquire(&lock_path, 50);
        assert!(matches!(result, Err(Error::LockFailed(_))));
    }

    #[test]
    fn write_atomic_replaces_contents() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("nested").join("snapshot.json");

        write_atomic(&file_path, b"first").unwrap();
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "first");

        write_atomic(&file_path, b"second").unwrap();
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "second");
    }

    #[test]
    fn lock_path_appends_suffix() {
        let path = Path::new("/tmp/board/tasks.jsonl");
        assert_eq!(lock_path_for(path), PathBuf::from("/tmp/board/tasks.jsonl.lock"));
    }

    #[test]
    fn only_one_thread_holds_the_lock() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join("stress.lock");

        let threads = 8;
        let barrier = Arc::new(Barrier::new(threads));
        let in_lock = Arc::new(AtomicUsize::new(0));
        let max_concurrent = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::with_capacity(threads);
        for _ in 0..threads {
            let barrier = Arc::clone(&barrier);
            let in_lock = Arc::clone(&in_lock);
            let max_concurrent = Arc::clone(&max_concurrent);
            let lock_path = lock_path.clone();

            handles.push(thread::spawn(move || {
                barrier.wait();
                let _lock = FileLock::acquire(&lock_path, 5000).unwrap();
                let current = in_lock.fetch_add(1, Ordering::SeqCst) + 1;
                max_concurrent.fetch_max(current, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(5));
                in_lock.fetch_sub(1, Ordering::SeqCst);
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(max_concurrent.load(Ordering::SeqCst), 1);
    }
}
