use crate::history::{History, HistoryKind, HistoryStack, Listener, ListenerId, Location};
use crossterm::execute;
use crossterm::terminal::SetTitle;

/// History for a plain interactive terminal. The entry stack lives in
/// process memory and the current location is mirrored into the terminal
/// title, the closest thing a terminal has to a URL bar.
pub struct TerminalHistory {
    stack: HistoryStack,
}

impl TerminalHistory {
    pub fn new(basename: &str) -> Self {
        let history = Self {
            stack: HistoryStack::new(basename),
        };
        history.sync_title();
        history
    }

    fn sync_title(&self) {
        // Title updates are cosmetic; a terminal that rejects them is fine.
        let _ = execute!(
            std::io::stdout(),
            SetTitle(format!("transit-map {}", self.stack.location().path))
        );
    }
}

impl History for TerminalHistory {
    fn push(&mut self, path: &str) {
        self.stack.push(path);
        self.sync_title();
    }

    fn replace(&mut self, path: &str) {
        self.stack.replace(path);
        self.sync_title();
    }

    fn back(&mut self) -> bool {
        let moved = self.stack.back();
        if moved {
            self.sync_title();
        }
        moved
    }

    fn forward(&mut self) -> bool {
        let moved = self.stack.forward();
        if moved {
            self.sync_title();
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
        HistoryKind::Native
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_a_navigable_stack() {
        let mut history = TerminalHistory::new("");
        history.push("/lines/550");
        history.replace("/lines/551");
        assert_eq!(history.location().path, "/lines/551");
        assert!(history.back());
        assert_eq!(history.location().path, "/");
        assert_eq!(history.kind(), HistoryKind::Native);
    }
}
