//! Change notification for the task store.
//!
//! Watches `.taskboard/` with `notify`, coalesces bursts of filesystem
//! events, then reloads the snapshot. The callback only runs when the
//! snapshot version moved.

use std::ops::ControlFlow;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::Result;
use crate::store::{Snapshot, TaskStore};

pub const WATCH_DEBOUNCE_MS: u64 = 150;

/// Block, calling `on_change` with the current snapshot and then with every
/// newer one. Returns when the callback breaks or the watcher goes away.
pub fn watch<F>(store: &TaskStore, debounce: Duration, mut on_change: F) -> Result<()>
where
    F: FnMut(Snapshot) -> ControlFlow<()>,
{
    let state_dir = store.storage().state_dir();
    store.storage().init()?;

    let (event_tx, event_rx) = mpsc::channel();
    let mut watcher: RecommendedWatcher = notify::recommended_watcher(move |res| {
        let _ = event_tx.send(res);
    })?;
    watcher.watch(&state_dir, RecursiveMode::NonRecursive)?;
    tracing::debug!(dir = %state_dir.display(), "watching task store");

    let initial = store.snapshot()?;
    let mut seen = initial.version;
    if on_change(initial).is_break() {
        return Ok(());
    }

    let mut pending: Option<Instant> = None;
    loop {
        let timeout = pending
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::from_secs(3600));
        match event_rx.recv_timeout(timeout) {
            Ok(Ok(_)) => {
                pending = Some(Instant::now() + debounce);
            }
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "watch error");
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if pending.take().is_none() {
                    continue;
                }
                let snapshot = match store.snapshot() {
                    Ok(snapshot) => snapshot,
                    Err(err) => {
                        // Caught mid-write; the next event triggers another reload.
                        tracing::warn!(error = %err, "snapshot reload failed");
                        continue;
                    }
                };
                if snapshot.version == seen {
                    continue;
                }
                seen = snapshot.version;
                if on_change(snapshot).is_break() {
                    break;
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TasksConfig;
    use crate::storage::Storage;
    use crate::task::NewTask;
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn callback_sees_new_versions() {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new(Storage::new(dir.path()), TasksConfig::default());
        store.storage().init().unwrap();

        let (tx, rx) = mpsc::channel();
        let watcher_store = store.clone();
        let handle = thread::spawn(move || {
            watch(&watcher_store, Duration::from_millis(50), |snapshot| {
                let version = snapshot.version;
                let _ = tx.send(version);
                if version >= 1 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
        });

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 0);
        store.create(NewTask::new("Ping")).unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(10)).unwrap(), 1);
        handle.join().unwrap().unwrap();
    }

    #[test]
    fn initial_break_returns_immediately() {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new(Storage::new(dir.path()), TasksConfig::default());

        let mut calls = 0;
        watch(&store, Duration::from_millis(10), |_| {
            calls += 1;
            ControlFlow::Break(())
        })
        .unwrap();
        assert_eq!(calls, 1);
    }
}
