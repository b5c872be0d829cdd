use crate::core::aggregate::{SourceError, UnreadSource};
use crate::models::{Account, Chat, ChatMessage, ChatSummary, Notification};
use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when interacting with PostgreSQL
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// PostgreSQL client for accounts, chats and notifications
///
/// User records (quiz answers, mood) live in the document store; this
/// database holds everything the auth API and the chat feed need.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Connect and run pending migrations
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout_secs: u64,
        idle_timeout_secs: u64,
    ) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(idle_timeout_secs))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a client from optional settings, falling back to defaults
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, PostgresError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            acquire_timeout_secs.unwrap_or(5),
            idle_timeout_secs.unwrap_or(600),
        )
        .await
    }

    /// Pool that connects on first use, without running migrations
    pub fn connect_lazy(database_url: &str) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_secs(1))
            .connect_lazy(database_url)?;

        Ok(Self { pool })
    }

    // ---- accounts ----

    /// Insert a new account; a duplicate email is a conflict
    pub async fn create_account(&self, account: &Account) -> Result<(), PostgresError> {
        let query = r#"
            INSERT INTO accounts (user_id, email, name, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5)
        "#;

        let result = sqlx::query(query)
            .bind(&account.user_id)
            .bind(&account.email)
            .bind(&account.name)
            .bind(&account.password_hash)
            .bind(account.created_at)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(
                PostgresError::Conflict(format!("Email already registered: {}", account.email)),
            ),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, PostgresError> {
        let query = r#"
            SELECT user_id, email, name, password_hash, created_at
            FROM accounts
            WHERE email = $1
        "#;

        let row = sqlx::query(query).bind(email).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(account_from_row))
    }

    pub async fn get_account(&self, user_id: &str) -> Result<Option<Account>, PostgresError> {
        let query = r#"
            SELECT user_id, email, name, password_hash, created_at
            FROM accounts
            WHERE user_id = $1
        "#;

        let row = sqlx::query(query).bind(user_id).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(account_from_row))
    }

    /// Remove an account, used to undo a sign-up that could not finish
    pub async fn delete_account(&self, user_id: &str) -> Result<(), PostgresError> {
        sqlx::query("DELETE FROM accounts WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ---- chats ----

    pub async fn get_chat(&self, chat_id: &str) -> Result<Option<Chat>, PostgresError> {
        let Some(chat_row) = sqlx::query("SELECT chat_id, created_at FROM chats WHERE chat_id = $1")
            .bind(chat_id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let participants: Vec<String> = sqlx::query(
            "SELECT user_id FROM chat_members WHERE chat_id = $1 ORDER BY user_id",
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|row| row.get("user_id"))
        .collect();

        Ok(Some(Chat {
            chat_id: chat_row.get("chat_id"),
            participants,
            created_at: chat_row.get("created_at"),
        }))
    }

    /// The chat shared by two users, if one exists
    pub async fn find_chat_between(&self, user_a: &str, user_b: &str) -> Result<Option<Chat>, PostgresError> {
        let row = sqlx::query("SELECT chat_id FROM chats WHERE pair_key = $1")
            .bind(chat_pair_key(user_a, user_b))
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let chat_id: String = row.get("chat_id");
                self.get_chat(&chat_id).await
            }
            None => Ok(None),
        }
    }

    /// Find or create the two-person chat for a pair of users
    ///
    /// Returns the chat and whether this call created it. Concurrent calls for
    /// the same pair converge on one row through the unique `pair_key`; both
    /// members start fully read.
    pub async fn open_chat_between(&self, user_a: &str, user_b: &str) -> Result<(Chat, bool), PostgresError> {
        let chat_id = uuid::Uuid::new_v4().to_string();
        let pair_key = chat_pair_key(user_a, user_b);
        let mut tx = self.pool.begin().await?;

        let query = r#"
            INSERT INTO chats (chat_id, pair_key, created_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (pair_key) DO NOTHING
            RETURNING chat_id
        "#;

        let created = sqlx::query(query)
            .bind(&chat_id)
            .bind(&pair_key)
            .fetch_optional(&mut *tx)
            .await?
            .is_some();

        if created {
            for user_id in [user_a, user_b] {
                sqlx::query(
                    "INSERT INTO chat_members (chat_id, user_id, last_read_at) VALUES ($1, $2, NOW())",
                )
                .bind(&chat_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        if created {
            tracing::debug!("Created chat {} for {} and {}", chat_id, user_a, user_b);
        }

        let chat = self
            .find_chat_between(user_a, user_b)
            .await?
            .ok_or_else(|| PostgresError::NotFound(format!("Chat {}", pair_key)))?;

        Ok((chat, created))
    }

    /// The caller's chats with participants and unread counts, most recently active first
    pub async fn chat_summaries(&self, user_id: &str) -> Result<Vec<ChatSummary>, PostgresError> {
        let query = r#"
            SELECT * FROM (
                SELECT
                    c.chat_id,
                    c.created_at,
                    ARRAY(
                        SELECT cm.user_id FROM chat_members cm
                        WHERE cm.chat_id = c.chat_id
                        ORDER BY cm.user_id
                    ) AS participants,
                    (
                        SELECT COUNT(*) FROM messages m
                        WHERE m.chat_id = c.chat_id
                          AND m.sender_id <> $1
                          AND m.created_at > me.last_read_at
                    ) AS unread,
                    (SELECT MAX(m.created_at) FROM messages m WHERE m.chat_id = c.chat_id) AS last_message_at
                FROM chats c
                JOIN chat_members me ON me.chat_id = c.chat_id AND me.user_id = $1
            ) summaries
            ORDER BY COALESCE(last_message_at, created_at) DESC
        "#;

        let rows = sqlx::query(query).bind(user_id).fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .map(|row| {
                let unread: i64 = row.get("unread");
                ChatSummary {
                    chat_id: row.get("chat_id"),
                    participants: row.get("participants"),
                    created_at: row.get("created_at"),
                    last_message_at: row.get("last_message_at"),
                    unread_count: unread.max(0) as u64,
                }
            })
            .collect())
    }

    /// Ids of every chat the user belongs to
    pub async fn chats_for_user(&self, user_id: &str) -> Result<Vec<String>, PostgresError> {
        let rows = sqlx::query("SELECT chat_id FROM chat_members WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(|row| row.get("chat_id")).collect())
    }

    pub async fn insert_message(
        &self,
        chat_id: &str,
        sender_id: &str,
        sender_name: &str,
        text: &str,
    ) -> Result<ChatMessage, PostgresError> {
        let message_id = uuid::Uuid::new_v4().to_string();
        let query = r#"
            INSERT INTO messages (message_id, chat_id, sender_id, sender_name, body, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING created_at
        "#;

        let row = sqlx::query(query)
            .bind(&message_id)
            .bind(chat_id)
            .bind(sender_id)
            .bind(sender_name)
            .bind(text)
            .fetch_one(&self.pool)
            .await?;

        Ok(ChatMessage {
            message_id,
            chat_id: chat_id.to_string(),
            sender_id: sender_id.to_string(),
            sender_name: sender_name.to_string(),
            text: text.to_string(),
            created_at: row.get("created_at"),
        })
    }

    /// Messages in a chat, oldest first
    pub async fn list_messages(&self, chat_id: &str) -> Result<Vec<ChatMessage>, PostgresError> {
        let query = r#"
            SELECT message_id, chat_id, sender_id, sender_name, body, created_at
            FROM messages
            WHERE chat_id = $1
            ORDER BY created_at ASC, message_id ASC
        "#;

        let rows = sqlx::query(query).bind(chat_id).fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .map(|row| ChatMessage {
                message_id: row.get("message_id"),
                chat_id: row.get("chat_id"),
                sender_id: row.get("sender_id"),
                sender_name: row.get("sender_name"),
                text: row.get("body"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    pub async fn mark_chat_read(&self, chat_id: &str, user_id: &str) -> Result<(), PostgresError> {
        let result = sqlx::query(
            "UPDATE chat_members SET last_read_at = NOW() WHERE chat_id = $1 AND user_id = $2",
        )
        .bind(chat_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PostgresError::NotFound(format!(
                "{} is not a member of chat {}",
                user_id, chat_id
            )));
        }

        Ok(())
    }

    // ---- notifications ----

    pub async fn create_notification(
        &self,
        user_id: &str,
        kind: &str,
        message: &str,
    ) -> Result<Notification, PostgresError> {
        let notification_id = uuid::Uuid::new_v4().to_string();
        let query = r#"
            INSERT INTO notifications (notification_id, user_id, kind, message, read, created_at)
            VALUES ($1, $2, $3, $4, FALSE, NOW())
            RETURNING created_at
        "#;

        let row = sqlx::query(query)
            .bind(&notification_id)
            .bind(user_id)
            .bind(kind)
            .bind(message)
            .fetch_one(&self.pool)
            .await?;

        Ok(Notification {
            notification_id,
            user_id: user_id.to_string(),
            kind: kind.to_string(),
            message: message.to_string(),
            read: false,
            created_at: row.get("created_at"),
        })
    }

    /// Unread notifications, newest first
    pub async fn unread_notifications(&self, user_id: &str) -> Result<Vec<Notification>, PostgresError> {
        let query = r#"
            SELECT notification_id, user_id, kind, message, read, created_at
            FROM notifications
            WHERE user_id = $1 AND read = FALSE
            ORDER BY created_at DESC
        "#;

        let rows = sqlx::query(query).bind(user_id).fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .map(|row| Notification {
                notification_id: row.get("notification_id"),
                user_id: row.get("user_id"),
                kind: row.get("kind"),
                message: row.get("message"),
                read: row.get("read"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    /// Mark every unread notification read in one statement
    pub async fn mark_all_notifications_read(&self, user_id: &str) -> Result<u64, PostgresError> {
        let result = sqlx::query(
            "UPDATE notifications SET read = TRUE WHERE user_id = $1 AND read = FALSE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            "Marked {} notifications read for {}",
            result.rows_affected(),
            user_id
        );

        Ok(result.rows_affected())
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, PostgresError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

/// Order-independent key identifying the chat between two users
pub fn chat_pair_key(user_a: &str, user_b: &str) -> String {
    if user_a <= user_b {
        format!("{}:{}", user_a, user_b)
    } else {
        format!("{}:{}", user_b, user_a)
    }
}

fn account_from_row(row: &PgRow) -> Account {
    Account {
        user_id: row.get("user_id"),
        email: row.get("email"),
        name: row.get("name"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl UnreadSource for PostgresClient {
    async fn unread_in_chat(&self, chat_id: &str, user_id: &str) -> Result<u64, SourceError> {
        let query = r#"
            SELECT COUNT(*) AS unread
            FROM messages m
            JOIN chat_members cm ON cm.chat_id = m.chat_id AND cm.user_id = $2
            WHERE m.chat_id = $1
              AND m.sender_id <> $2
              AND m.created_at > cm.last_read_at
        "#;

        let unread: i64 = sqlx::query(query)
            .bind(chat_id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?
            .get("unread");

        Ok(unread.max(0) as u64)
    }

    async fn unread_notification_count(&self, user_id: &str) -> Result<u64, SourceError> {
        let unread: i64 = sqlx::query(
            "SELECT COUNT(*) AS unread FROM notifications WHERE user_id = $1 AND read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?
        .get("unread");

        Ok(unread.max(0) as u64)
    }
}
