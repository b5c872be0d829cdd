use tokio::sync::broadcast;

/// Change notifications published by the API after successful writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEvent {
    MessagePosted { chat_id: String, sender_id: String },
    ChatRead { chat_id: String, user_id: String },
    NotificationCreated { user_id: String },
    NotificationsCleared { user_id: String },
}

/// In-process change feed
///
/// Every subscriber sees every event and filters for what it cares about.
/// Slow subscribers may lag; they are expected to recompute from storage.
pub struct LiveHub {
    sender: broadcast::Sender<LiveEvent>,
}

impl LiveHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, event: LiveEvent) {
        // No subscribers is normal when nobody is signed in
        if self.sender.send(event).is_err() {
            tracing::trace!("Live event dropped: no subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for LiveHub {
    fn default() -> Self {
        Self::new(1024)
    }
}
