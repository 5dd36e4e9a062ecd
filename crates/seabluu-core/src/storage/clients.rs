//! Repository for known Telegram users.
//!
//! A client row is written whenever a user saves an address, which is how
//! usernames get mapped back to chat ids for notifications.

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    error::Result,
    models::{ClientProfile, ClientRecord, UserId},
    parse::{digits_only, normalize_username},
};

/// Repository for client database operations.
pub struct Repository {
    pool: Arc<PgPool>,
}

fn normalized(usernames: &[String]) -> Vec<String> {
    usernames.iter().map(|u| normalize_username(u)).filter(|u| !u.is_empty()).collect()
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

    /// Inserts or refreshes a client.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    pub async fn upsert(&self, client: &ClientProfile) -> Result<()> {
        let username = client.username.as_deref().map(normalize_username);
        sqlx::query(
            r"
            INSERT INTO clients (user_id, username, full_name, phone)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE SET
                username = COALESCE(EXCLUDED.username, clients.username),
                full_name = COALESCE(EXCLUDED.full_name, clients.full_name),
                phone = COALESCE(EXCLUDED.phone, clients.phone),
                updated_at = NOW()
            ",
        )
        .bind(client.user_id)
        .bind(username.filter(|u| !u.is_empty()))
        .bind(client.full_name.as_deref().filter(|s| !s.is_empty()))
        .bind(client.phone.as_deref().filter(|s| !s.is_empty()))
        .execute(&*self.pool)
        .await?;

        Ok(())
    }

    /// Chat ids of the clients with the given usernames.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn user_ids_by_usernames(&self, usernames: &[String]) -> Result<Vec<UserId>> {
        let usernames = normalized(usernames);
        if usernames.is_empty() {
            return Ok(Vec::new());
        }

        let ids = sqlx::query_scalar::<_, UserId>(
            r"
            SELECT user_id FROM clients WHERE LOWER(username) = ANY($1)
            ",
        )
        .bind(usernames)
        .fetch_all(&*self.pool)
        .await?;

        Ok(ids)
    }

    /// Clients with their addresses, for the given usernames.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn records_by_usernames(&self, usernames: &[String]) -> Result<Vec<ClientRecord>> {
        let usernames = normalized(usernames);
        if usernames.is_empty() {
            return Ok(Vec::new());
        }

        let records = sqlx::query_as::<_, ClientRecord>(
            r"
            SELECT c.user_id, c.username,
                   COALESCE(a.full_name, c.full_name) AS full_name,
                   COALESCE(a.phone, c.phone) AS phone,
                   a.city, a.address, a.postcode,
                   c.created_at, c.updated_at
            FROM clients c
            LEFT JOIN addresses a ON a.user_id = c.user_id
            WHERE LOWER(c.username) = ANY($1)
            ORDER BY c.username ASC
            ",
        )
        .bind(usernames)
        .fetch_all(&*self.pool)
        .await?;

        Ok(records)
    }

    /// A page of clients, newest first, optionally filtered by a query on
    /// username, full name or phone digits. Returns the items and the total
    /// match count.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn page(
        &self,
        page: i64,
        size: i64,
        query: Option<&str>,
    ) -> Result<(Vec<ClientRecord>, i64)> {
        let q = query.map(|q| q.trim().to_lowercase()).filter(|q| !q.is_empty());
        let pattern = q.as_ref().map(|q| format!("%{}%", q.trim_start_matches('@')));
        let digits = q.as_deref().map(digits_only).filter(|d| !d.is_empty()).map(|d| format!("%{d}%"));

        let total = sqlx::query_scalar::<_, i64>(
            r"
            SELECT COUNT(*)
            FROM clients c
            LEFT JOIN addresses a ON a.user_id = c.user_id
            WHERE $1::TEXT IS NULL
               OR LOWER(COALESCE(c.username, '')) LIKE $1
               OR LOWER(COALESCE(a.full_name, c.full_name, '')) LIKE $1
               OR ($2::TEXT IS NOT NULL
                   AND REGEXP_REPLACE(COALESCE(a.phone, c.phone, ''), '\D', '', 'g') LIKE $2)
            ",
        )
        .bind(&pattern)
        .bind(&digits)
        .fetch_one(&*self.pool)
        .await?;

        let items = sqlx::query_as::<_, ClientRecord>(
            r"
            SELECT c.user_id, c.username,
                   COALESCE(a.full_name, c.full_name) AS full_name,
                   COALESCE(a.phone, c.phone) AS phone,
                   a.city, a.address, a.postcode,
                   c.created_at, c.updated_at
            FROM clients c
            LEFT JOIN addresses a ON a.user_id = c.user_id
            WHERE $1::TEXT IS NULL
               OR LOWER(COALESCE(c.username, '')) LIKE $1
               OR LOWER(COALESCE(a.full_name, c.full_name, '')) LIKE $1
               OR ($2::TEXT IS NOT NULL
                   AND REGEXP_REPLACE(COALESCE(a.phone, c.phone, ''), '\D', '', 'g') LIKE $2)
            ORDER BY c.updated_at DESC NULLS LAST, c.created_at DESC NULLS LAST
            LIMIT $3 OFFSET $4
            ",
        )
        .bind(&pattern)
        .bind(&digits)
        .bind(size)
        .bind(page.max(0).saturating_mul(size.max(0)))
        .fetch_all(&*self.pool)
        .await?;

        Ok((items, total))
    }
}
