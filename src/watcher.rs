//! File watcher for project workspace auto-sync
//! Watches a project directory for changes and emits debounced events the
//! shell can forward to its event bridge

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_full::{new_debouncer, DebouncedEvent, Debouncer, RecommendedCache};
use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Maximum number of files in a watched tree (prevent resource exhaustion)
const MAX_WATCHED_FILES: usize = 10_000;

/// Debounce duration for file events
const DEBOUNCE_DURATION: Duration = Duration::from_secs(1);

/// Path components that never produce events
const IGNORED_COMPONENTS: &[&str] = &["node_modules", "target", ".git"];

#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("Watcher error: {0}")]
    Notify(#[from] notify::Error),
    #[error("Path not found: {0}")]
    PathNotFound(String),
    #[error("Too many files to watch (max: {0})")]
    TooManyFiles(usize),
    #[error("Watcher already running")]
    AlreadyRunning,
}

/// File change event for a watched workspace
#[derive(Debug, Clone, serde::Serialize)]
pub enum FileEvent {
    Created { path: String },
    Modified { path: String },
    Removed { path: String },
}

/// Debounced recursive directory watcher
pub struct WorkspaceWatcher {
    folder: PathBuf,
    running: Arc<AtomicBool>,
}

impl WorkspaceWatcher {
    /// Create a new watcher for a workspace directory
    pub fn new(folder: &Path) -> Result<Self, WatcherError> {
        if !folder.exists() {
            return Err(WatcherError::PathNotFound(folder.display().to_string()));
        }

        Ok(Self {
            folder: folder.to_path_buf(),
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Check if watcher is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Start watching for file changes
    /// Returns a receiver for debounced file events
    pub fn start(&mut self) -> Result<mpsc::Receiver<FileEvent>, WatcherError> {
        if self.running.load(Ordering::Relaxed) {
            return Err(WatcherError::AlreadyRunning);
        }

        // Refuse trees too large to watch responsibly
        count_files(&self.folder)?;

        let (tx, rx) = mpsc::channel(100);
        self.running.store(true, Ordering::Relaxed);

        let folder = self.folder.clone();
        let running = self.running.clone();

        // The notify backend blocks; keep it off the async runtime
        std::thread::spawn(move || {
            if let Err(e) = run_watcher(folder, tx, running) {
                tracing::error!("workspace watcher exited with error: {}", e);
            }
        });

        Ok(rx)
    }

    /// Stop watching
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

impl Drop for WorkspaceWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Count files in directory (recursive), failing fast over the cap
fn count_files(dir: &Path) -> Result<usize, WatcherError> {
    let mut count = 0;

    for entry in walkdir::WalkDir::new(dir)
        .max_depth(10)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.file_type().is_file() && !is_ignored(entry.path()) {
            count += 1;
            if count > MAX_WATCHED_FILES {
                return Err(WatcherError::TooManyFiles(MAX_WATCHED_FILES));
            }
        }
    }

    Ok(count)
}

/// Run the file watcher (blocking, runs in a dedicated thread)
fn run_watcher(
    folder: PathBuf,
    tx: mpsc::Sender<FileEvent>,
    running: Arc<AtomicBool>,
) -> Result<(), WatcherError> {
    let (debounce_tx, debounce_rx) = std::sync::mpsc::channel();

    let mut debouncer: Debouncer<RecommendedWatcher, RecommendedCache> =
        new_debouncer(DEBOUNCE_DURATION, None, debounce_tx)?;

    debouncer.watch(&folder, RecursiveMode::Recursive)?;

    while running.load(Ordering::Relaxed) {
        match debounce_rx.recv_timeout(Duration::from_millis(500)) {
            Ok(Ok(events)) => {
                for event in events {
                    if let Some(file_event) = process_event(&event) {
                        // Receiver may lag; dropping an event is acceptable
                        let _ = tx.try_send(file_event);
                    }
                }
            }
            Ok(Err(errors)) => {
                for error in errors {
                    tracing::warn!("watch backend error: {:?}", error);
                }
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                // Periodic wakeup to observe the stop flag
                continue;
            }
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                break;
            }
        }
    }

    Ok(())
}

/// Map a notify event to a workspace event, dropping ignored paths
fn process_event(event: &DebouncedEvent) -> Option<FileEvent> {
    let path = event.paths.first()?;
    if is_ignored(path) {
        return None;
    }

    let path_str = path.display().to_string();

    match &event.kind {
        EventKind::Create(_) => Some(FileEvent::Created { path: path_str }),
        EventKind::Modify(_) => Some(FileEvent::Modified { path: path_str }),
        EventKind::Remove(_) => Some(FileEvent::Removed { path: path_str }),
        _ => None,
    }
}

fn is_ignored(path: &Path) -> bool {
    path.components().any(|c| {
        let name = c.as_os_str().to_string_lossy();
        IGNORED_COMPONENTS.contains(&name.as_ref())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_count_files_skips_ignored() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("spec.md"), "# Spec").unwrap();
        fs::create_dir(dir.path().join("node_modules")).unwrap();
        fs::write(dir.path().join("node_modules/pkg.json"), "{}").unwrap();

        assert_eq!(count_files(dir.path()).unwrap(), 1);
    }

    #[test]
    fn test_watcher_creation() {
        let dir = tempdir().unwrap();
        assert!(WorkspaceWatcher::new(dir.path()).is_ok());
    }

    #[test]
    fn test_watcher_nonexistent_path() {
        let result = WorkspaceWatcher::new(Path::new("/nonexistent/path/12345"));
        assert!(matches!(result, Err(WatcherError::PathNotFound(_))));
    }

    #[test]
    fn test_start_twice_fails() {
        let dir = tempdir().unwrap();
        let mut watcher = WorkspaceWatcher::new(dir.path()).unwrap();

        let _rx = watcher.start().unwrap();
        assert!(watcher.is_running());
        assert!(matches!(watcher.start(), Err(WatcherError::AlreadyRunning)));

        watcher.stop();
        assert!(!watcher.is_running());
    }
}
