//! Repository for the internal admin chat.

use std::sync::Arc;

use sqlx::PgPool;

use crate::{error::Result, models::ChatMessage};

/// Repository for chat message database operations.
pub struct Repository {
    pool: Arc<PgPool>,
}

impl Repository {
    /// Creates a new repository instance.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Returns a reference to the database pool.
    pub fn pool(&self) -> Arc<PgPool> {
        self.pool.clone()
    }

    /// Messages in ascending id order.
    ///
    /// With `since_id > 0` returns messages newer than it; otherwise the
    /// last `limit` messages.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn list(&self, since_id: i64, limit: i64) -> Result<Vec<ChatMessage>> {
        let messages = if since_id > 0 {
            sqlx::query_as::<_, ChatMessage>(
                r"
                SELECT m.id, m.login, a.avatar, m.text, m.ref AS reference, m.created_at
                FROM chat_messages m
                LEFT JOIN admins a ON LOWER(a.login) = LOWER(m.login)
                WHERE m.id > $1
                ORDER BY m.id ASC
                LIMIT $2
                ",
            )
            .bind(since_id)
            .bind(limit)
            .fetch_all(&*self.pool)
            .await?
        } else {
            sqlx::query_as::<_, ChatMessage>(
                r"
                SELECT * FROM (
                    SELECT m.id, m.login, a.avatar, m.text, m.ref AS reference, m.created_at
                    FROM chat_messages m
                    LEFT JOIN admins a ON LOWER(a.login) = LOWER(m.login)
                    ORDER BY m.id DESC
                    LIMIT $1
                ) latest
                ORDER BY id ASC
                ",
            )
            .bind(limit)
            .fetch_all(&*self.pool)
            .await?
        };

        Ok(messages)
    }

    /// Appends a message.
    ///
    /// # Errors
    ///
    /// Returns error if insert fails.
    pub async fn send(
        &self,
        login: &str,
        text: &str,
        reference: Option<&str>,
    ) -> Result<ChatMessage> {
        let message = sqlx::query_as::<_, ChatMessage>(
            r"
            WITH inserted AS (
                INSERT INTO chat_messages (login, text, ref)
                VALUES ($1, $2, $3)
                RETURNING id, login, text, ref, created_at
            )
            SELECT i.id, i.login, a.avatar, i.text, i.ref AS reference, i.created_at
            FROM inserted i
            LEFT JOIN admins a ON LOWER(a.login) = LOWER(i.login)
            ",
        )
        .bind(login)
        .bind(text)
        .bind(reference.filter(|r| !r.is_empty()))
        .fetch_one(&*self.pool)
        .await?;

        Ok(message)
    }
}
