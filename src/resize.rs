use std::cell::RefCell;
use std::rc::{Rc, Weak};

type Listener = Box<dyn FnMut(u16, u16)>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

/// Fans terminal size changes out to subscribers. The event loop feeds it
/// from crossterm resize events; components subscribe on mount and hold the
/// returned guard, which detaches the listener when dropped.
#[derive(Clone, Default)]
pub struct ResizeDetector {
    registry: Rc<RefCell<Registry>>,
}

impl ResizeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to size changes. Dropping the returned guard detaches the
    /// listener; there is no other way to detach, so a listener can never
    /// leak past its owner.
    pub fn listen(&self, listener: impl FnMut(u16, u16) + 'static) -> ResizeSubscription {
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.push((id, Box::new(listener)));
        ResizeSubscription {
            id,
            registry: Rc::downgrade(&self.registry),
        }
    }

    /// Deliver a new size to every listener.
    pub fn notify(&self, width: u16, height: u16) {
        let mut registry = self.registry.borrow_mut();
        for (_, listener) in registry.listeners.iter_mut() {
            listener(width, height);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.registry.borrow().listeners.len()
    }
}

/// Guard for one resize listener. Detaches on drop, exactly once.
pub struct ResizeSubscription {
    id: u64,
    registry: Weak<RefCell<Registry>>,
}

impl Drop for ResizeSubscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .borrow_mut()
                .listeners
                .retain(|(id, _)| *id != self.id);
        }
    }
}
