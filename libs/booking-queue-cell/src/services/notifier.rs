use chrono::Utc;
use tokio::sync::broadcast;
use tracing::debug;

use crate::{QueueEntryView, QueueError};

pub type QueueSender = broadcast::Sender<String>;
pub type QueueReceiver = broadcast::Receiver<String>;

/// Fans the day's queue out to every connected viewer.
///
/// Frames are pre-serialized JSON so each viewer task only forwards text.
#[derive(Clone)]
pub struct QueueNotifier {
    sender: QueueSender,
}

impl QueueNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> QueueReceiver {
        self.sender.subscribe()
    }

    pub fn viewer_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Returns how many viewers the snapshot reached. Zero viewers is not an error.
    pub fn publish(&self, snapshot: &[QueueEntryView]) -> Result<usize, QueueError> {
        let frame = serde_json::json!({
            "type": "queue_update",
            "timestamp": Utc::now().to_rfc3339(),
            "data": snapshot
        })
        .to_string();

        match self.sender.send(frame) {
            Ok(viewers) => {
                debug!("Queue snapshot of {} entries sent to {} viewers", snapshot.len(), viewers);
                Ok(viewers)
            }
            Err(_) => {
                debug!("No queue viewers connected; snapshot dropped");
                Ok(0)
            }
        }
    }
}

impl Default for QueueNotifier {
    fn default() -> Self {
        Self::new(256)
    }
}
