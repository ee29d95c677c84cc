use super::OperationKind;
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, Ordering};

/// Operation lifecycle notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// A task was submitted for `folder`
    OperationStarted {
        /// Folder path
        folder: String,
        /// Check or snapshot
        kind: OperationKind,
    },
    /// A task for `folder` finished, whether it succeeded, failed or was discarded
    OperationFinished {
        /// Folder path
        folder: String,
        /// Check or snapshot
        kind: OperationKind,
    },
}

impl MonitorEvent {
    /// Folder the event is about.
    #[must_use]
    pub fn folder(&self) -> &str {
        match self {
            Self::OperationStarted { folder, .. } | Self::OperationFinished { folder, .. } => folder,
        }
    }
}

/// Receives operation start/finish notifications.
///
/// Called from the submitting thread (started) and from worker threads
/// (finished), never while the monitor holds any of its locks, so
/// implementations may call back into the monitor.
pub trait MonitorObserver: Send + Sync {
    /// A task for `folder` was submitted.
    fn on_operation_started(&self, folder: &str, kind: OperationKind) {
        let _ = (folder, kind);
    }

    /// A task for `folder` finished.
    fn on_operation_finished(&self, folder: &str, kind: OperationKind) {
        let _ = (folder, kind);
    }

    /// Returns true once the observer wants no further notifications.
    ///
    /// Closed observers are unregistered after the notification round in
    /// which they report it.
    fn is_closed(&self) -> bool {
        false
    }
}

/// Forwards notifications into a channel.
///
/// Closes itself the first time a send fails because the receiver is gone.
pub(crate) struct ChannelObserver {
    /// Subscriber's channel
    tx: Sender<MonitorEvent>,
    /// Set once the receiver has been dropped
    closed: AtomicBool,
}

impl ChannelObserver {
    pub(crate) const fn new(tx: Sender<MonitorEvent>) -> Self {
        Self {
            tx,
            closed: AtomicBool::new(false),
        }
    }

    fn forward(&self, event: MonitorEvent) {
        if self.tx.send(event).is_err() {
            self.closed.store(true, Ordering::Relaxed);
        }
    }
}

impl MonitorObserver for ChannelObserver {
    fn on_operation_started(&self, folder: &str, kind: OperationKind) {
        self.forward(MonitorEvent::OperationStarted {
            folder: folder.to_string(),
            kind,
        });
    }

    fn on_operation_finished(&self, folder: &str, kind: OperationKind) {
        self.forward(MonitorEvent::OperationFinished {
            folder: folder.to_string(),
            kind,
        });
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_channel_observer_closes_with_receiver() {
        let (tx, rx) = unbounded();
        let observer = ChannelObserver::new(tx);

        observer.on_operation_started("/w", OperationKind::Check);
        assert!(!observer.is_closed());
        assert_eq!(rx.try_recv().map(|e| e.folder().to_string()), Ok("/w".to_string()));

        drop(rx);
        observer.on_operation_finished("/w", OperationKind::Check);
        assert!(observer.is_closed());
    }
}
