use std::sync::mpsc::Sender;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub severity: Severity,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            severity,
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(title, message, Severity::Info)
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(title, message, Severity::Success)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(title, message, Severity::Error)
    }
}

/// Where user-facing messages go. The controller never assumes anyone is
/// listening.
pub trait NotificationSink: Send {
    fn notify(&self, notification: Notification);
}

/// Forwards notifications to whoever holds the receiving end, usually the UI.
pub struct ChannelSink {
    sender: Sender<Notification>,
}

impl ChannelSink {
    pub fn new(sender: Sender<Notification>) -> Self {
        Self { sender }
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, notification: Notification) {
        match notification.severity {
            Severity::Error => error!(title = %notification.title, "{}", notification.message),
            _ => info!(title = %notification.title, "{}", notification.message),
        }
        self.sender.send(notification).unwrap_or_default();
    }
}
