//! Repository for order database operations.
//!
//! Orders are looked up case-insensitively by their public id. Listings are
//! ordered newest-first by last update.

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    error::Result,
    models::{NewOrder, Order},
    parse::{digits_only, normalize_username},
};

/// Repository for order database operations.
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

    /// Finds an order by its public id, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn find(&self, order_id: &str) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r"
            SELECT id, order_id, client_name, phone, origin, status, note, country,
                   created_at, updated_at
            FROM orders
            WHERE LOWER(order_id) = LOWER($1)
            ",
        )
        .bind(order_id.trim())
        .fetch_optional(&*self.pool)
        .await?;

        Ok(order)
    }

    /// Inserts an order or overwrites an existing one. A missing client name
    /// or phone keeps the recorded value.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    pub async fn upsert(&self, order: &NewOrder) -> Result<Order> {
        let order = sqlx::query_as::<_, Order>(
            r"
            INSERT INTO orders (order_id, client_name, phone, origin, status, note, country)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (order_id) DO UPDATE SET
                client_name = COALESCE(EXCLUDED.client_name, orders.client_name),
                phone = COALESCE(EXCLUDED.phone, orders.phone),
                origin = EXCLUDED.origin,
                status = EXCLUDED.status,
                note = EXCLUDED.note,
                country = EXCLUDED.country,
                updated_at = NOW()
            RETURNING id, order_id, client_name, phone, origin, status, note, country,
                      created_at, updated_at
            ",
        )
        .bind(&order.order_id)
        .bind(&order.client_name)
        .bind(&order.phone)
        .bind(&order.origin)
        .bind(&order.status)
        .bind(&order.note)
        .bind(&order.country)
        .fetch_one(&*self.pool)
        .await?;

        Ok(order)
    }

    /// Sets the status of an order. Returns whether a row was updated.
    ///
    /// # Errors
    ///
    /// Returns error if the update fails.
    pub async fn update_status(&self, order_id: &str, status: &str) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE orders
            SET status = $2, updated_at = NOW()
            WHERE LOWER(order_id) = LOWER($1)
            ",
        )
        .bind(order_id.trim())
        .bind(status)
        .execute(&*self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Most recently touched orders.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn recent(&self, limit: i64) -> Result<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r"
            SELECT id, order_id, client_name, phone, origin, status, note, country,
                   created_at, updated_at
            FROM orders
            ORDER BY updated_at DESC NULLS LAST, created_at DESC NULLS LAST
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(&*self.pool)
        .await?;

        Ok(orders)
    }

    /// Orders currently in `status`.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn by_status(&self, status: &str, limit: i64) -> Result<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r"
            SELECT id, order_id, client_name, phone, origin, status, note, country,
                   created_at, updated_at
            FROM orders
            WHERE status = $1
            ORDER BY updated_at DESC NULLS LAST
            LIMIT $2
            ",
        )
        .bind(status)
        .bind(limit)
        .fetch_all(&*self.pool)
        .await?;

        Ok(orders)
    }

    /// Orders whose note contains `marker`, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn by_note(&self, marker: &str) -> Result<Vec<Order>> {
        let marker = marker.trim();
        if marker.is_empty() {
            return Ok(Vec::new());
        }

        let orders = sqlx::query_as::<_, Order>(
            r"
            SELECT id, order_id, client_name, phone, origin, status, note, country,
                   created_at, updated_at
            FROM orders
            WHERE POSITION(LOWER($1) IN LOWER(COALESCE(note, ''))) > 0
            ORDER BY updated_at DESC NULLS LAST, created_at DESC NULLS LAST
            ",
        )
        .bind(marker)
        .fetch_all(&*self.pool)
        .await?;

        Ok(orders)
    }

    /// Orders the username participates in.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn by_username(&self, username: &str) -> Result<Vec<Order>> {
        let username = normalize_username(username);
        if username.is_empty() {
            return Ok(Vec::new());
        }

        let orders = sqlx::query_as::<_, Order>(
            r"
            SELECT o.id, o.order_id, o.client_name, o.phone, o.origin, o.status, o.note,
                   o.country, o.created_at, o.updated_at
            FROM orders o
            JOIN participants p ON LOWER(p.order_id) = LOWER(o.order_id)
            WHERE LOWER(p.username) = $1
            ORDER BY o.updated_at DESC NULLS LAST, o.created_at DESC NULLS LAST
            ",
        )
        .bind(username)
        .fetch_all(&*self.pool)
        .await?;

        Ok(orders)
    }

    /// Orders whose phone has exactly the digits of `phone`.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn by_phone(&self, phone: &str) -> Result<Vec<Order>> {
        let digits = digits_only(phone);
        if digits.is_empty() {
            return Ok(Vec::new());
        }

        let orders = sqlx::query_as::<_, Order>(
            r"
            SELECT id, order_id, client_name, phone, origin, status, note, country,
                   created_at, updated_at
            FROM orders
            WHERE REGEXP_REPLACE(COALESCE(phone, ''), '\D', '', 'g') = $1
            ORDER BY updated_at DESC NULLS LAST
            ",
        )
        .bind(digits)
        .fetch_all(&*self.pool)
        .await?;

        Ok(orders)
    }
}
