//! Repository for delivery addresses. Each user has at most one address.

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    error::Result,
    models::{Address, NewAddress, UserId},
    parse::normalize_username,
};

/// Repository for address database operations.
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

    /// Saves the address of a user and refreshes the matching client row
    /// in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns error if the transaction fails.
    pub async fn upsert(&self, address: &NewAddress) -> Result<Address> {
        let username = normalize_username(&address.username);
        let username = (!username.is_empty()).then_some(username);
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            INSERT INTO clients (user_id, username, full_name, phone)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE SET
                username = COALESCE(EXCLUDED.username, clients.username),
                full_name = EXCLUDED.full_name,
                phone = EXCLUDED.phone,
                updated_at = NOW()
            ",
        )
        .bind(address.user_id)
        .bind(&username)
        .bind(&address.full_name)
        .bind(&address.phone)
        .execute(&mut *tx)
        .await?;

        let saved = sqlx::query_as::<_, Address>(
            r"
            INSERT INTO addresses (user_id, username, full_name, phone, city, address, postcode)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id) DO UPDATE SET
                username = EXCLUDED.username,
                full_name = EXCLUDED.full_name,
                phone = EXCLUDED.phone,
                city = EXCLUDED.city,
                address = EXCLUDED.address,
                postcode = EXCLUDED.postcode,
                updated_at = NOW()
            RETURNING user_id, username, full_name, phone, city, address, postcode,
                      created_at, updated_at
            ",
        )
        .bind(address.user_id)
        .bind(&username)
        .bind(&address.full_name)
        .bind(&address.phone)
        .bind(&address.city)
        .bind(&address.address)
        .bind(&address.postcode)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(saved)
    }

    /// Address of a user, if saved.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn for_user(&self, user_id: UserId) -> Result<Option<Address>> {
        let address = sqlx::query_as::<_, Address>(
            r"
            SELECT user_id, username, full_name, phone, city, address, postcode,
                   created_at, updated_at
            FROM addresses
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(address)
    }

    /// Deletes the address of a user. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns error if delete fails.
    pub async fn delete(&self, user_id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM addresses WHERE user_id = $1")
            .bind(user_id)
            .execute(&*self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Latest addresses, optionally restricted to one username.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn recent(&self, username: Option<&str>, limit: i64) -> Result<Vec<Address>> {
        let username = username.map(normalize_username).filter(|u| !u.is_empty());
        let addresses = sqlx::query_as::<_, Address>(
            r"
            SELECT user_id, username, full_name, phone, city, address, postcode,
                   created_at, updated_at
            FROM addresses
            WHERE $1::TEXT IS NULL OR LOWER(username) = $1
            ORDER BY updated_at DESC NULLS LAST, created_at DESC NULLS LAST
            LIMIT $2
            ",
        )
        .bind(username)
        .bind(limit)
        .fetch_all(&*self.pool)
        .await?;

        Ok(addresses)
    }
}
