use std::sync::{Arc, Mutex};

/// User-facing notification sink (the dashboard's toast).
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn info(&self, message: &str);
    fn warning(&self, message: &str);
    fn error(&self, message: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

/// Routes notifications into the tracing pipeline.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn success(&self, message: &str) {
        tracing::info!(kind = "success", "{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!(kind = "info", "{message}");
    }

    fn warning(&self, message: &str) {
        tracing::warn!(kind = "warning", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(kind = "error", "{message}");
    }
}

/// Keeps every notification in memory, in emission order.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    log: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    pub fn messages(&self, kind: NotificationKind) -> Vec<String> {
        self.notifications()
            .into_iter()
            .filter(|n| n.kind == kind)
            .map(|n| n.message)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.log.lock().map(|log| log.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, kind: NotificationKind, message: &str) {
        if let Ok(mut log) = self.log.lock() {
            log.push(Notification {
                kind,
                message: message.to_string(),
            });
        }
    }
}

impl Notifier for RecordingNotifier {
    fn success(&self, message: &str) {
        self.push(NotificationKind::Success, message);
    }

    fn info(&self, message: &str) {
        self.push(NotificationKind::Info, message);
    }

    fn warning(&self, message: &str) {
        self.push(NotificationKind::Warning, message);
    }

    fn error(&self, message: &str) {
        self.push(NotificationKind::Error, message);
    }
}
