//! Repository for order participants and their delivery payment flags.

use std::sync::Arc;

use sqlx::PgPool;

use crate::{error::Result, models::Participant, parse::normalize_username};

/// Repository for participant database operations.
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

    /// Adds usernames to an order, skipping ones already present.
    ///
    /// Usernames are normalized before insert and blanks are dropped.
    ///
    /// # Errors
    ///
    /// Returns error if the transaction fails.
    pub async fn ensure(&self, order_id: &str, usernames: &[String]) -> Result<()> {
        let usernames: Vec<String> =
            usernames.iter().map(|u| normalize_username(u)).filter(|u| !u.is_empty()).collect();
        if usernames.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for username in &usernames {
            sqlx::query(
                r"
                INSERT INTO participants (order_id, username)
                VALUES ($1, $2)
                ON CONFLICT (order_id, username) DO NOTHING
                ",
            )
            .bind(order_id)
            .bind(username)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(())
    }

    /// Participants of an order sorted by username.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn list(&self, order_id: &str) -> Result<Vec<Participant>> {
        let participants = sqlx::query_as::<_, Participant>(
            r"
            SELECT order_id, username, paid, qty, created_at, updated_at
            FROM participants
            WHERE LOWER(order_id) = LOWER($1)
            ORDER BY username ASC
            ",
        )
        .bind(order_id)
        .fetch_all(&*self.pool)
        .await?;

        Ok(participants)
    }

    /// Flips the paid flag. Returns the new value, or `None` when the
    /// participant does not exist.
    ///
    /// # Errors
    ///
    /// Returns error if the update fails.
    pub async fn toggle_paid(&self, order_id: &str, username: &str) -> Result<Option<bool>> {
        let paid = sqlx::query_scalar::<_, bool>(
            r"
            UPDATE participants
            SET paid = NOT paid, updated_at = NOW()
            WHERE LOWER(order_id) = LOWER($1) AND LOWER(username) = $2
            RETURNING paid
            ",
        )
        .bind(order_id)
        .bind(normalize_username(username))
        .fetch_optional(&*self.pool)
        .await?;

        Ok(paid)
    }

    /// Sets the paid flag. Returns whether the participant exists.
    ///
    /// # Errors
    ///
    /// Returns error if the update fails.
    pub async fn set_paid(&self, order_id: &str, username: &str, paid: bool) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE participants
            SET paid = $3, updated_at = NOW()
            WHERE LOWER(order_id) = LOWER($1) AND LOWER(username) = $2
            ",
        )
        .bind(order_id)
        .bind(normalize_username(username))
        .bind(paid)
        .execute(&*self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Usernames that have not paid for delivery of an order.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn unpaid_usernames(&self, order_id: &str) -> Result<Vec<String>> {
        let usernames = sqlx::query_scalar::<_, String>(
            r"
            SELECT username
            FROM participants
            WHERE LOWER(order_id) = LOWER($1) AND NOT paid
            ORDER BY username ASC
            ",
        )
        .bind(order_id)
        .fetch_all(&*self.pool)
        .await?;

        Ok(usernames)
    }

    /// Debtors of every order, grouped by order id.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn unpaid_grouped(&self) -> Result<Vec<(String, Vec<String>)>> {
        let rows = sqlx::query_as::<_, (String, Vec<String>)>(
            r"
            SELECT order_id, ARRAY_AGG(username ORDER BY username)
            FROM participants
            WHERE NOT paid
            GROUP BY order_id
            ORDER BY order_id ASC
            ",
        )
        .fetch_all(&*self.pool)
        .await?;

        Ok(rows)
    }
}
