use crate::models::backup_event::BackupEvent;
use crate::models::error::ListenerError;
use log::{error, warn};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Capability of anything that wants to observe a backup run.
pub trait BackupListener: Send + Sync {
    fn on_event(&self, event: &BackupEvent) -> Result<(), ListenerError>;
}

pub type ListenerHandle = Arc<dyn BackupListener>;

/// Ordered set of listeners, de-duplicated by identity. Dispatch happens on
/// the publisher's thread before `publish` returns.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<ListenerHandle>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the listener was already attached.
    pub fn attach(&mut self, listener: ListenerHandle) -> bool {
        if self.position(&listener).is_some() {
            return false;
        }
        self.listeners.push(listener);
        true
    }

    /// Returns false when the listener was not attached.
    pub fn detach(&mut self, listener: &ListenerHandle) -> bool {
        match self.position(listener) {
            Some(index) => {
                self.listeners.remove(index);
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn publish(&self, event: &BackupEvent) {
        for (index, listener) in self.listeners.iter().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(|| listener.on_event(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(
                        "Listener #{} failed to handle '{}' event: {}",
                        index + 1,
                        event.name(),
                        e
                    );
                }
                Err(_) => {
                    error!(
                        "Listener #{} panicked while handling '{}' event",
                        index + 1,
                        event.name()
                    );
                }
            }
        }
    }

    fn position(&self, listener: &ListenerHandle) -> Option<usize> {
        self.listeners
            .iter()
            .position(|attached| std::ptr::addr_eq(Arc::as_ptr(attached), Arc::as_ptr(listener)))
    }
}
