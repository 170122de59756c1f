//! File system watcher for the `watch` command.
//!
//! Watches the directory holding the source file rather than the file itself:
//! many editors save by writing a temporary file and renaming it over the
//! original, which would detach a watch placed on the file.

use crate::error::{Error, Result};
use log::debug;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// File system events for the watched file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// The file was created or modified
    Changed(PathBuf),
    /// The file was deleted or renamed away
    Removed(PathBuf),
    /// The watcher encountered an error
    Error(String),
}

/// Watches one file for changes.
#[derive(Debug)]
pub struct FileWatcher {
    /// The internal notify watcher
    _watcher: RecommendedWatcher,
    /// Receiver for file system events
    receiver: Receiver<WatchEvent>,
    /// The file being watched
    path: PathBuf,
}

impl FileWatcher {
    /// Start watching `path`.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = path
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| Error::Watch(format!("'{}' is not a file path", path.display())))?;

        let (tx, rx) = channel();
        let mut watcher = RecommendedWatcher::new(
            move |result: notify::Result<Event>| {
                handle_event(result, &file_name, &tx);
            },
            Config::default().with_poll_interval(Duration::from_millis(500)),
        )?;

        watcher
            .watch(&directory, RecursiveMode::NonRecursive)
            .map_err(|e| {
                Error::Watch(format!(
                    "Failed to watch {}: {}",
                    directory.display(),
                    e
                ))
            })?;
        debug!("Watching {}", path.display());

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
            path,
        })
    }

    /// The watched file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Poll for pending events. Non-blocking.
    pub fn poll_events(&self) -> Vec<WatchEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Wait up to `timeout` for the next event, then drain the rest.
    ///
    /// Returns `None` on timeout or when the watcher has shut down.
    pub fn wait_events(&self, timeout: Duration) -> Option<Vec<WatchEvent>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(first) => {
                let mut events = vec![first];
                events.extend(self.poll_events());
                Some(events)
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

/// Convert a raw notify event, keeping only paths named `file_name`.
fn handle_event(
    result: notify::Result<Event>,
    file_name: &std::ffi::OsStr,
    tx: &Sender<WatchEvent>,
) {
    match result {
        Ok(event) => {
            for event in classify(event, file_name) {
                let _ = tx.send(event);
            }
        }
        Err(e) => {
            let _ = tx.send(WatchEvent::Error(e.to_string()));
        }
    }
}

fn classify(event: Event, file_name: &std::ffi::OsStr) -> Vec<WatchEvent> {
    let kind = event.kind;
    event
        .paths
        .into_iter()
        .filter(|p| p.file_name() == Some(file_name))
        .filter_map(|path| match kind {
            EventKind::Create(_) | EventKind::Modify(_) => Some(WatchEvent::Changed(path)),
            EventKind::Remove(_) => Some(WatchEvent::Removed(path)),
            _ => None,
        })
        .collect()
}

/// Whether a batch of events warrants a re-render.
pub fn has_changes(events: &[WatchEvent]) -> bool {
    events.iter().any(|e| matches!(e, WatchEvent::Changed(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};
    use std::ffi::OsStr;

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        let mut event = Event::new(kind);
        for path in paths {
            event = event.add_path(PathBuf::from(path));
        }
        event
    }

    #[test]
    fn test_classify_keeps_only_watched_file() {
        let raw = event(
            EventKind::Modify(ModifyKind::Any),
            &["/notes/todo.md", "/notes/other.md"],
        );
        let events = classify(raw, OsStr::new("todo.md"));
        assert_eq!(
            events,
            vec![WatchEvent::Changed(PathBuf::from("/notes/todo.md"))]
        );
    }

    #[test]
    fn test_classify_kinds() {
        let name = OsStr::new("a.md");
        assert_eq!(
            classify(event(EventKind::Create(CreateKind::File), &["/x/a.md"]), name),
            vec![WatchEvent::Changed(PathBuf::from("/x/a.md"))]
        );
        assert_eq!(
            classify(event(EventKind::Remove(RemoveKind::File), &["/x/a.md"]), name),
            vec![WatchEvent::Removed(PathBuf::from("/x/a.md"))]
        );
        assert!(classify(event(EventKind::Any, &["/x/a.md"]), name).is_empty());
    }

    #[test]
    fn test_has_changes() {
        assert!(!has_changes(&[]));
        assert!(!has_changes(&[WatchEvent::Error("x".to_string())]));
        assert!(has_changes(&[
            WatchEvent::Removed(PathBuf::from("a.md")),
            WatchEvent::Changed(PathBuf::from("a.md")),
        ]));
    }

    #[test]
    fn test_watcher_starts_on_existing_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("doc.md");
        std::fs::write(&path, "# x").unwrap();
        let watcher = FileWatcher::new(&path).unwrap();
        assert_eq!(watcher.path(), path.as_path());
    }
}
