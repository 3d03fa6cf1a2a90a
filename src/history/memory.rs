use crate::history::{History, HistoryKind, HistoryStack, Listener, ListenerId, Location};

/// In-memory history: no persistence, no terminal integration. Used when the
/// process has no interactive display surface (single-pass rendering).
pub struct MemoryHistory {
    stack: HistoryStack,
}

impl MemoryHistory {
    pub fn new(basename: &str) -> Self {
        Self {
            stack: HistoryStack::new(basename),
        }
    }
}

impl History for MemoryHistory {
    fn push(&mut self, path: &str) {
        self.stack.push(path);
    }

    fn replace(&mut self, path: &str) {
        self.stack.replace(path);
    }

    fn back(&mut self) -> bool {
        self.stack.back()
    }

    fn forward(&mut self) -> bool {
        self.stack.forward()
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
        HistoryKind::Memory
    }
}
