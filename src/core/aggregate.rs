//! Unread counters for a signed-in user.
//!
//! Each watched chat (and the notification feed) gets its own listener task
//! with its own cancellation token. Listeners send their latest count over an
//! mpsc channel to a single fold task, which sums them and publishes the
//! aggregate through a watch channel.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::models::UnreadStats;
use crate::services::live::{LiveEvent, LiveHub};

pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// Where listeners read authoritative counts from
#[async_trait]
pub trait UnreadSource: Send + Sync {
    async fn unread_in_chat(&self, chat_id: &str, user_id: &str) -> Result<u64, SourceError>;

    async fn unread_notification_count(&self, user_id: &str) -> Result<u64, SourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CounterKey {
    Chat(String),
    Notifications,
}

impl CounterKey {
    fn affected_by(&self, user_id: &str, event: &LiveEvent) -> bool {
        match (self, event) {
            (CounterKey::Chat(id), LiveEvent::MessagePosted { chat_id, sender_id }) => {
                id == chat_id && sender_id != user_id
            }
            (CounterKey::Chat(id), LiveEvent::ChatRead { chat_id, user_id: reader }) => {
                id == chat_id && reader == user_id
            }
            (CounterKey::Notifications, LiveEvent::NotificationCreated { user_id: owner })
            | (CounterKey::Notifications, LiveEvent::NotificationsCleared { user_id: owner }) => {
                owner == user_id
            }
            _ => false,
        }
    }
}

/// A listener's latest count; `None` removes its contribution
struct CountUpdate {
    key: CounterKey,
    count: Option<u64>,
    token: CancellationToken,
}

/// Per-user fan-in of unread counts
pub struct UnreadAggregator {
    user_id: String,
    source: Arc<dyn UnreadSource>,
    hub: Arc<LiveHub>,
    updates: mpsc::Sender<CountUpdate>,
    stats: watch::Receiver<UnreadStats>,
    token: CancellationToken,
    tracker: TaskTracker,
    listeners: Mutex<HashMap<CounterKey, CancellationToken>>,
}

impl UnreadAggregator {
    /// Start the fold task; must be called from within a tokio runtime
    pub fn start(user_id: impl Into<String>, source: Arc<dyn UnreadSource>, hub: Arc<LiveHub>) -> Self {
        let (updates_tx, updates_rx) = mpsc::channel(64);
        let (stats_tx, stats_rx) = watch::channel(UnreadStats::default());
        let token = CancellationToken::new();
        let tracker = TaskTracker::new();

        tracker.spawn(fold_counts(updates_rx, stats_tx, token.clone()));

        Self {
            user_id: user_id.into(),
            source,
            hub,
            updates: updates_tx,
            stats: stats_rx,
            token,
            tracker,
            listeners: Mutex::new(HashMap::new()),
        }
    }

    /// Current aggregate
    pub fn stats(&self) -> UnreadStats {
        *self.stats.borrow()
    }

    /// Receiver that changes whenever the aggregate does
    pub fn subscribe(&self) -> watch::Receiver<UnreadStats> {
        self.stats.clone()
    }

    /// Start counting a chat; returns false if already watched or shut down
    pub async fn watch_chat(&self, chat_id: &str) -> bool {
        self.watch(CounterKey::Chat(chat_id.to_string())).await
    }

    /// Start counting unread notifications
    pub async fn watch_notifications(&self) -> bool {
        self.watch(CounterKey::Notifications).await
    }

    /// Stop counting a chat and drop its contribution
    pub async fn unwatch_chat(&self, chat_id: &str) -> bool {
        let key = CounterKey::Chat(chat_id.to_string());
        let Some(token) = self.listeners.lock().await.remove(&key) else {
            return false;
        };

        token.cancel();
        // Removal travels with the cancelled token so late counts are discarded
        let _ = self
            .updates
            .send(CountUpdate {
                key,
                count: None,
                token,
            })
            .await;
        true
    }

    async fn watch(&self, key: CounterKey) -> bool {
        if self.token.is_cancelled() {
            return false;
        }

        let mut listeners = self.listeners.lock().await;
        if listeners.contains_key(&key) {
            return false;
        }

        let token = self.token.child_token();
        listeners.insert(key.clone(), token.clone());
        drop(listeners);

        // Subscribe before the first count so no event slips between the two
        let listener = Listener {
            key,
            user_id: self.user_id.clone(),
            source: Arc::clone(&self.source),
            events: self.hub.subscribe(),
            updates: self.updates.clone(),
            token,
        };
        self.tracker.spawn(listener.run());
        true
    }

    /// Cancel every listener and wait for them to finish
    pub async fn shutdown(&self) {
        self.token.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        tracing::debug!("Unread aggregator for {} shut down", self.user_id);
    }
}

impl Drop for UnreadAggregator {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

struct Listener {
    key: CounterKey,
    user_id: String,
    source: Arc<dyn UnreadSource>,
    events: broadcast::Receiver<LiveEvent>,
    updates: mpsc::Sender<CountUpdate>,
    token: CancellationToken,
}

async fn count_for(key: &CounterKey, user_id: &str, source: &dyn UnreadSource) -> Result<u64, SourceError> {
    match key {
        CounterKey::Chat(chat_id) => source.unread_in_chat(chat_id, user_id).await,
        CounterKey::Notifications => source.unread_notification_count(user_id).await,
    }
}

impl Listener {
    async fn run(mut self) {
        let mut refresh = true;

        loop {
            if std::mem::take(&mut refresh) {
                match count_for(&self.key, &self.user_id, self.source.as_ref()).await {
                    Ok(count) => {
                        let update = CountUpdate {
                            key: self.key.clone(),
                            count: Some(count),
                            token: self.token.clone(),
                        };
                        if self.updates.send(update).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to count unread {:?} for {}: {}", self.key, self.user_id, e);
                    }
                }
            }

            tokio::select! {
                _ = self.token.cancelled() => break,
                event = self.events.recv() => match event {
                    Ok(event) => refresh = self.key.affected_by(&self.user_id, &event),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!("Listener {:?} lagged by {} events", self.key, skipped);
                        refresh = true;
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }

        tracing::trace!("Listener {:?} for {} stopped", self.key, self.user_id);
    }
}

async fn fold_counts(
    mut updates: mpsc::Receiver<CountUpdate>,
    stats: watch::Sender<UnreadStats>,
    token: CancellationToken,
) {
    let mut counts: HashMap<CounterKey, u64> = HashMap::new();

    loop {
        let update = tokio::select! {
            _ = token.cancelled() => break,
            update = updates.recv() => match update {
                Some(update) => update,
                None => break,
            },
        };

        match update.count {
            Some(_) if update.token.is_cancelled() => continue,
            Some(count) => {
                counts.insert(update.key, count);
            }
            None => {
                counts.remove(&update.key);
            }
        }

        let next = summarize(&counts);
        stats.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

fn summarize(counts: &HashMap<CounterKey, u64>) -> UnreadStats {
    let mut stats = UnreadStats::default();

    for (key, count) in counts {
        match key {
            CounterKey::Chat(_) => {
                stats.unread_messages += count;
                if *count > 0 {
                    stats.chats_with_unread += 1;
                }
            }
            CounterKey::Notifications => stats.unread_notifications += count,
        }
    }

    stats
}
