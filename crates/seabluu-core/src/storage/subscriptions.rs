//! Repository for order status subscriptions.

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    error::Result,
    models::{Subscription, SubscriptionView, UserId},
};

/// Repository for subscription database operations.
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

    /// Subscribes a user to an order. Subscribing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns error if insert fails.
    pub async fn subscribe(&self, user_id: UserId, order_id: &str) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO subscriptions (user_id, order_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, order_id) DO NOTHING
            ",
        )
        .bind(user_id)
        .bind(order_id)
        .execute(&*self.pool)
        .await?;

        Ok(())
    }

    /// Removes a subscription. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns error if delete fails.
    pub async fn unsubscribe(&self, user_id: UserId, order_id: &str) -> Result<bool> {
        let result = sqlx::query(
            r"
            DELETE FROM subscriptions
            WHERE user_id = $1 AND LOWER(order_id) = LOWER($2)
            ",
        )
        .bind(user_id)
        .bind(order_id)
        .execute(&*self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Whether the user follows the order.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn is_subscribed(&self, user_id: UserId, order_id: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS (
                SELECT 1 FROM subscriptions
                WHERE user_id = $1 AND LOWER(order_id) = LOWER($2)
            )
            ",
        )
        .bind(user_id)
        .bind(order_id)
        .fetch_one(&*self.pool)
        .await?;

        Ok(exists)
    }

    /// Subscriptions of a user with current order status, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn for_user(&self, user_id: UserId) -> Result<Vec<SubscriptionView>> {
        let views = sqlx::query_as::<_, SubscriptionView>(
            r"
            SELECT s.order_id, o.status, s.last_sent_status
            FROM subscriptions s
            LEFT JOIN orders o ON LOWER(o.order_id) = LOWER(s.order_id)
            WHERE s.user_id = $1
            ORDER BY s.created_at DESC
            ",
        )
        .bind(user_id)
        .fetch_all(&*self.pool)
        .await?;

        Ok(views)
    }

    /// Subscribers of an order.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn for_order(&self, order_id: &str) -> Result<Vec<Subscription>> {
        let subs = sqlx::query_as::<_, Subscription>(
            r"
            SELECT user_id, order_id, last_sent_status, created_at, updated_at
            FROM subscriptions
            WHERE LOWER(order_id) = LOWER($1)
            ORDER BY created_at ASC
            ",
        )
        .bind(order_id)
        .fetch_all(&*self.pool)
        .await?;

        Ok(subs)
    }

    /// Records the last status delivered to a subscriber. `None` resets it.
    ///
    /// # Errors
    ///
    /// Returns error if the update fails.
    pub async fn set_last_sent_status(
        &self,
        user_id: UserId,
        order_id: &str,
        status: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r"
            UPDATE subscriptions
            SET last_sent_status = $3, updated_at = NOW()
            WHERE user_id = $1 AND LOWER(order_id) = LOWER($2)
            ",
        )
        .bind(user_id)
        .bind(order_id)
        .bind(status)
        .execute(&*self.pool)
        .await?;

        Ok(())
    }

    /// Clears the last sent status for every subscriber of an order.
    ///
    /// # Errors
    ///
    /// Returns error if the update fails.
    pub async fn reset_last_sent(&self, order_id: &str) -> Result<()> {
        sqlx::query(
            r"
            UPDATE subscriptions
            SET last_sent_status = NULL, updated_at = NOW()
            WHERE LOWER(order_id) = LOWER($1)
            ",
        )
        .bind(order_id)
        .execute(&*self.pool)
        .await?;

        Ok(())
    }
}
