use crate::history::{
    History, HistoryError, HistoryKind, HistoryStack, Listener, ListenerId, Location,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk shape of the navigation state.
#[derive(Serialize, Deserialize)]
struct SavedState {
    entries: Vec<Location>,
    index: usize,
}

/// History for the app-shell environment: every change is written to a JSON
/// state file so navigation survives app restarts.
pub struct StorageHistory {
    stack: HistoryStack,
    state_file: PathBuf,
}

impl StorageHistory {
    /// Open (or start) persisted history. A missing state file starts fresh;
    /// an unreadable or corrupt one is logged and discarded rather than
    /// taking the UI down.
    pub fn open(state_file: &Path, basename: &str) -> Result<Self, HistoryError> {
        if let Some(parent) = state_file.parent() {
            fs::create_dir_all(parent).map_err(|source| HistoryError::Prepare {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let stack = match Self::load(state_file) {
            Some(saved) => HistoryStack::restore(basename, saved.entries, saved.index),
            None => HistoryStack::new(basename),
        };

        Ok(Self {
            stack,
            state_file: state_file.to_path_buf(),
        })
    }

    fn load(state_file: &Path) -> Option<SavedState> {
        let mut bytes = match fs::read(state_file) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %state_file.display(), error = %e, "unreadable history state, starting fresh");
                return None;
            }
        };
        match simd_json::serde::from_slice(&mut bytes) {
            Ok(saved) => Some(saved),
            Err(e) => {
                tracing::warn!(path = %state_file.display(), error = %e, "corrupt history state, starting fresh");
                None
            }
        }
    }

    fn persist(&self) {
        let state = SavedState {
            entries: self.stack.entries().to_vec(),
            index: self.stack.index(),
        };
        let result = simd_json::serde::to_string(&state)
            .map_err(std::io::Error::other)
            .and_then(|json| fs::write(&self.state_file, json));
        if let Err(e) = result {
            // Navigation keeps working in memory; only restart recovery is lost.
            tracing::warn!(path = %self.state_file.display(), error = %e, "failed to persist history state");
        }
    }
}

impl History for StorageHistory {
    fn push(&mut self, path: &str) {
        self.stack.push(path);
        self.persist();
    }

    fn replace(&mut self, path: &str) {
        self.stack.replace(path);
        self.persist();
    }

    fn back(&mut self) -> bool {
        let moved = self.stack.back();
        if moved {
            self.persist();
        }
        moved
    }

    fn forward(&mut self) -> bool {
        let moved = self.stack.forward();
        if moved {
            self.persist();
        }
        moved
    }

    fn location(&self) -> &Location {
        self.stack.location()
    }

    fn listen(&mut self, listener: Listener) -> ListenerId {
        self.stack.listen(listener)
    }

    fn unlisten(&mut self, id: ListenerId) {
        self.stack.unlisten(id);
    }

    fn kind(&self) -> HistoryKind {
        HistoryKind::Storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("history.json");

        {
            let mut history = StorageHistory::open(&state, "/app").unwrap();
            history.push("/stops/1");
            history.push("/stops/2");
            assert!(history.back());
        }

        let reopened = StorageHistory::open(&state, "/app").unwrap();
        assert_eq!(reopened.location().path, "/app/stops/1");
        assert!(reopened.stack.entries().len() == 3);
        assert_eq!(reopened.kind(), HistoryKind::Storage);
    }

    #[test]
    fn corrupt_state_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("history.json");
        fs::write(&state, b"{ not json").unwrap();

        let history = StorageHistory::open(&state, "/app").unwrap();
        assert_eq!(history.location().path, "/app/");
    }

    #[test]
    fn missing_parent_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("nested/dir/history.json");
        let mut history = StorageHistory::open(&state, "").unwrap();
        history.push("/a");
        assert!(state.exists());
    }
}
