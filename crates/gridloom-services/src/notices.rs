//! User-facing notice sink
//!
//! The service layer never renders anything itself; user-visible messages
//! (save failures, rejected actions) go through this callback contract and
//! the host application turns them into toasts or status lines.

/// Severity of a user-facing notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Receiver for user-facing notices
pub trait NoticeSink: Send + Sync {
    fn notify(&self, level: NoticeLevel, message: &str);
}

/// Sink that drops every notice; useful for tests and headless use.
#[derive(Debug, Default)]
pub struct NullNotices;

impl NoticeSink for NullNotices {
    fn notify(&self, level: NoticeLevel, message: &str) {
        tracing::debug!(?level, message, "notice dropped (no sink installed)");
    }
}
