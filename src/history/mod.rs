//! Navigation history behind a single trait, with the backend picked once
//! per process from the environment classification.

mod memory;
mod native;
mod storage;

pub use memory::MemoryHistory;
pub use native::TerminalHistory;
pub use storage::StorageHistory;

use crate::env::Environment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("navigation history was already created for this process")]
    AlreadyCreated,
    #[error("failed to prepare history state at {path}: {source}")]
    Prepare {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A navigation entry. Paths always carry the configured base path prefix.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub path: String,
}

pub type ListenerId = u64;

/// Change callback invoked with the new current location.
pub type Listener = Box<dyn Fn(&Location)>;

/// The operations every history backend supports.
pub trait History {
    /// Append a new entry, discarding any forward entries.
    fn push(&mut self, path: &str);
    /// Replace the current entry in place.
    fn replace(&mut self, path: &str);
    /// Step back; false if already at the oldest entry.
    fn back(&mut self) -> bool;
    /// Step forward; false if already at the newest entry.
    fn forward(&mut self) -> bool;
    /// The current entry.
    fn location(&self) -> &Location;
    /// Subscribe to location changes.
    fn listen(&mut self, listener: Listener) -> ListenerId;
    /// Drop a subscription; unknown ids are ignored.
    fn unlisten(&mut self, id: ListenerId);
    /// Which backend this is (status display, tests).
    fn kind(&self) -> HistoryKind;
}

/// The closed set of backend implementations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryKind {
    /// Persists entries across restarts via a state file.
    Storage,
    /// In-process stack mirrored into the terminal title.
    Native,
    /// In-memory only, for single-pass rendering.
    Memory,
}

/// Pure environment -> backend mapping.
pub fn select_backend(env: Environment) -> HistoryKind {
    match env {
        Environment::AppShell => HistoryKind::Storage,
        Environment::Interactive => HistoryKind::Native,
        Environment::Headless => HistoryKind::Memory,
    }
}

static CREATED: AtomicBool = AtomicBool::new(false);

/// Construct the process-wide history. The choice is fixed for the process
/// lifetime; calling this a second time is an error.
pub fn create_history(
    env: Environment,
    basename: &str,
    state_file: &Path,
) -> Result<Box<dyn History>, HistoryError> {
    if CREATED.swap(true, Ordering::SeqCst) {
        return Err(HistoryError::AlreadyCreated);
    }
    let kind = select_backend(env);
    tracing::info!(?env, ?kind, "selected history backend");
    Ok(match kind {
        HistoryKind::Storage => Box::new(StorageHistory::open(state_file, basename)?),
        HistoryKind::Native => Box::new(TerminalHistory::new(basename)),
        HistoryKind::Memory => Box::new(MemoryHistory::new(basename)),
    })
}

/// Entry stack shared by all backends: entries, cursor, base path handling
/// and change listeners.
pub(crate) struct HistoryStack {
    basename: String,
    entries: Vec<Location>,
    index: usize,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: ListenerId,
}

impl HistoryStack {
    pub(crate) fn new(basename: &str) -> Self {
        let basename = normalize_basename(basename);
        let root = Location {
            path: join_base(&basename, "/"),
        };
        Self {
            basename,
            entries: vec![root],
            index: 0,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    pub(crate) fn restore(basename: &str, entries: Vec<Location>, index: usize) -> Self {
        let mut stack = Self::new(basename);
        if !entries.is_empty() {
            stack.index = index.min(entries.len() - 1);
            stack.entries = entries;
        }
        stack
    }

    pub(crate) fn push(&mut self, path: &str) {
        let location = Location {
            path: join_base(&self.basename, path),
        };
        self.entries.truncate(self.index + 1);
        self.entries.push(location);
        self.index = self.entries.len() - 1;
        self.notify();
    }

    pub(crate) fn replace(&mut self, path: &str) {
        self.entries[self.index] = Location {
            path: join_base(&self.basename, path),
        };
        self.notify();
    }

    pub(crate) fn back(&mut self) -> bool {
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        self.notify();
        true
    }

    pub(crate) fn forward(&mut self) -> bool {
        if self.index + 1 >= self.entries.len() {
            return false;
        }
        self.index += 1;
        self.notify();
        true
    }

    pub(crate) fn location(&self) -> &Location {
        &self.entries[self.index]
    }

    pub(crate) fn entries(&self) -> &[Location] {
        &self.entries
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn listen(&mut self, listener: Listener) -> ListenerId {
        let id = self.next_listener;
        self.next_listener += 1;
        self.listeners.push((id, listener));
        id
    }

    pub(crate) fn unlisten(&mut self, id: ListenerId) {
        self.listeners.retain(|(lid, _)| *lid != id);
    }

    fn notify(&self) {
        let location = self.location();
        for (_, listener) in &self.listeners {
            listener(location);
        }
    }
}

fn normalize_basename(basename: &str) -> String {
    let trimmed = basename.trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn join_base(basename: &str, path: &str) -> String {
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    format!("{basename}{path}")
}
