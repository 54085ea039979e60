//! Cross-core wake events.

/// Event line shared by the cores taking part in the copy engine protocol.
pub trait Doorbell {
    /// Wakes every core waiting on the event.
    fn signal(&mut self);

    /// Sleeps until an event arrives. May return spuriously, so callers
    /// always re-check their condition.
    fn wait(&mut self);
}
