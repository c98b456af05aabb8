//! Notification sink that writes alerts through the tracing subscriber.

use crate::ports::notify_port::NotifyPort;
use tracing::info;

#[derive(Debug, Default)]
pub struct LogNotifier;

impl NotifyPort for LogNotifier {
    fn notify(&self, text: &str) {
        info!(target: "marketscan::alert", "{text}");
    }
}
