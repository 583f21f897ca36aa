//! Notification capability.
//!
//! Not part of the engine's correctness surface; an injected collaborator the
//! engine pings at the same moments the original tool beeped. The default
//! implementation rings the terminal bell, tests inject [`Silent`].

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    /// A change was applied.
    Success,
    /// Attention needed (multiple matches, override prompt).
    Warning,
    /// A block or rollback.
    Alert,
}

pub trait Notifier {
    fn notify(&self, level: NotifyLevel);
}

impl<T: Notifier + ?Sized> Notifier for Box<T> {
    fn notify(&self, level: NotifyLevel) {
        (**self).notify(level)
    }
}

/// ASCII BEL to stdout, whatever the level.
pub struct TerminalBell;

impl Notifier for TerminalBell {
    fn notify(&self, _level: NotifyLevel) {
        print!("\u{7}");
    }
}

/// No-op implementation for tests and `--silent`.
pub struct Silent;

impl Notifier for Silent {
    fn notify(&self, _level: NotifyLevel) {}
}
