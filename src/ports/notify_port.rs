//! Notification sink port trait.

/// Fire-and-forget message sink. Implementations swallow their own failures.
pub trait NotifyPort {
    fn notify(&self, text: &str);
}
