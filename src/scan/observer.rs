//! Callbacks from the scanner to its owner.

use chrono::NaiveDate;
use tokio::sync::mpsc::UnboundedSender;

use super::state::ScanState;

/// Receives scan results and progress. Everything except the detection
/// callback is optional.
pub trait ScanObserver: Send + Sync {
    /// A date was selected. `item_id` is set in batch mode.
    fn on_date_detected(&self, item_id: Option<&str>, date: NaiveDate);

    fn on_state_changed(&self, _state: &ScanState) {}

    /// A debug log entry was added.
    fn on_debug(&self, _entry: &str) {}

    /// The scan gave up on the current attempt.
    fn on_error(&self, _message: &str) {}

    /// Every batch item has a date.
    fn on_batch_complete(&self) {}
}

/// Scanner callbacks as messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    StateChanged(ScanState),
    Debug(String),
    Error(String),
    DateDetected {
        item_id: Option<String>,
        date: NaiveDate,
    },
    BatchComplete,
}

/// Forwards every callback into an unbounded channel. Sends to a closed
/// channel are dropped.
pub struct ChannelObserver {
    sender: UnboundedSender<ScanEvent>,
}

impl ChannelObserver {
    pub fn new(sender: UnboundedSender<ScanEvent>) -> Self {
        Self { sender }
    }

    fn send(&self, event: ScanEvent) {
        let _ = self.sender.send(event);
    }
}

impl ScanObserver for ChannelObserver {
    fn on_date_detected(&self, item_id: Option<&str>, date: NaiveDate) {
        self.send(ScanEvent::DateDetected {
            item_id: item_id.map(str::to_string),
            date,
        });
    }

    fn on_state_changed(&self, state: &ScanState) {
        self.send(ScanEvent::StateChanged(state.clone()));
    }

    fn on_debug(&self, entry: &str) {
        self.send(ScanEvent::Debug(entry.to_string()));
    }

    fn on_error(&self, message: &str) {
        self.send(ScanEvent::Error(message.to_string()));
    }

    fn on_batch_complete(&self) {
        self.send(ScanEvent::BatchComplete);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[test]
    fn test_channel_observer_forwards() {
        let (tx, mut rx) = unbounded_channel();
        let observer = ChannelObserver::new(tx);
        let date = NaiveDate::from_ymd_opt(2026, 8, 12).unwrap();

        observer.on_state_changed(&ScanState::Scanning);
        observer.on_date_detected(Some("milk"), date);
        observer.on_batch_complete();

        assert_eq!(rx.try_recv().unwrap(), ScanEvent::StateChanged(ScanState::Scanning));
        assert_eq!(
            rx.try_recv().unwrap(),
            ScanEvent::DateDetected {
                item_id: Some("milk".to_string()),
                date,
            }
        );
        assert_eq!(rx.try_recv().unwrap(), ScanEvent::BatchComplete);
    }

    #[test]
    fn test_closed_channel_is_ignored() {
        let (tx, rx) = unbounded_channel();
        drop(rx);
        ChannelObserver::new(tx).on_error("camera unavailable");
    }
}
