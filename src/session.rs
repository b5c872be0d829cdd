use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::core::aggregate::{UnreadAggregator, UnreadSource};
use crate::models::UnreadStats;
use crate::services::live::LiveHub;

/// A signed-in user's context: identity plus live unread counters
///
/// Created on sign-in, torn down on sign-out or once its token has expired.
pub struct Session {
    pub session_id: String,
    pub user_id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    aggregator: UnreadAggregator,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    pub fn unread(&self) -> UnreadStats {
        self.aggregator.stats()
    }

    pub fn aggregator(&self) -> &UnreadAggregator {
        &self.aggregator
    }
}

/// Live sessions keyed by session id
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    source: Arc<dyn UnreadSource>,
    hub: Arc<LiveHub>,
    token: CancellationToken,
    tracker: TaskTracker,
}

impl SessionRegistry {
    pub fn new(source: Arc<dyn UnreadSource>, hub: Arc<LiveHub>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            source,
            hub,
            token: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Close expired sessions every `every` until `close_all`
    ///
    /// The task holds only a weak reference, so dropping the registry ends it too.
    pub fn start_sweeper(self: &Arc<Self>, every: Duration) {
        let registry = Arc::downgrade(self);
        let token = self.token.clone();

        self.tracker.spawn(async move {
            let mut ticks = tokio::time::interval(every);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticks.tick() => {}
                }

                let Some(registry) = registry.upgrade() else {
                    break;
                };
                let closed = registry.close_expired().await;
                if closed > 0 {
                    tracing::info!("Swept {} expired sessions", closed);
                }
            }

            tracing::debug!("Session sweeper stopped");
        });
    }

    /// Open a session watching the given chats and the notification feed
    pub async fn open(
        &self,
        user_id: &str,
        email: &str,
        chat_ids: &[String],
        expires_at: DateTime<Utc>,
    ) -> Arc<Session> {
        let aggregator = UnreadAggregator::start(user_id, Arc::clone(&self.source), Arc::clone(&self.hub));
        aggregator.watch_notifications().await;
        for chat_id in chat_ids {
            aggregator.watch_chat(chat_id).await;
        }

        let session = Arc::new(Session {
            session_id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
            expires_at,
            aggregator,
        });

        self.sessions
            .write()
            .await
            .insert(session.session_id.clone(), Arc::clone(&session));

        tracing::info!(
            "Opened session {} for {} watching {} chats",
            session.session_id,
            user_id,
            chat_ids.len()
        );

        session
    }

    /// A live session; an expired one is closed on the spot
    pub async fn get(&self, session_id: &str) -> Option<Arc<Session>> {
        let session = self.sessions.read().await.get(session_id).cloned()?;

        if session.is_expired() {
            self.close(session_id).await;
            return None;
        }

        Some(session)
    }

    /// Remove a session and stop its listeners
    pub async fn close(&self, session_id: &str) -> bool {
        let Some(session) = self.sessions.write().await.remove(session_id) else {
            return false;
        };

        session.aggregator.shutdown().await;
        tracing::info!("Closed session {} for {}", session_id, session.user_id);
        true
    }

    /// Close every expired session, returning how many were closed
    pub async fn close_expired(&self) -> usize {
        let expired: Vec<String> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.is_expired())
            .map(|s| s.session_id.clone())
            .collect();

        let mut closed = 0;
        for session_id in &expired {
            if self.close(session_id).await {
                closed += 1;
            }
        }

        closed
    }

    /// Start counting a chat in every live session of `user_id`
    pub async fn attach_chat(&self, user_id: &str, chat_id: &str) {
        let sessions: Vec<Arc<Session>> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();

        for session in sessions {
            session.aggregator.watch_chat(chat_id).await;
        }
    }

    /// Close every session and stop the sweeper, used on server shutdown
    pub async fn close_all(&self) {
        self.token.cancel();

        let sessions: Vec<Arc<Session>> = self.sessions.write().await.drain().map(|(_, s)| s).collect();

        for session in &sessions {
            session.aggregator.shutdown().await;
        }

        self.tracker.close();
        self.tracker.wait().await;

        tracing::info!("Closed {} sessions", sessions.len());
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
