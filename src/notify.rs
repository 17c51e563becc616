//! User-facing notification channel — the toast surface.
//!
//! Fire-and-forget: the engine reports every outcome here and never waits on
//! or inspects the result.

use std::sync::Mutex;

use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    Success,
    Error,
}

/// Message channel the engine reports every mutation outcome to.
/// Implementations must not block or fail.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, kind: NotifyKind, message: &str);
}

/// Forwards notifications to the tracing pipeline. Used by the CLI.
#[derive(Debug, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, kind: NotifyKind, message: &str) {
        match kind {
            NotifyKind::Success => info!(target: "taskdesk::notify", "{message}"),
            NotifyKind::Error => error!(target: "taskdesk::notify", "{message}"),
        }
    }
}

/// Records notifications in memory so tests can assert on them.
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Mutex<Vec<(NotifyKind, String)>>,
}

impl MemorySink {
    /// Drain and return everything recorded so far.
    pub fn take(&self) -> Vec<(NotifyKind, String)> {
        self.messages
            .lock()
            .map(|mut m| std::mem::take(&mut *m))
            .unwrap_or_default()
    }
}

impl NotificationSink for MemorySink {
    fn notify(&self, kind: NotifyKind, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push((kind, message.to_string()));
        }
    }
}
