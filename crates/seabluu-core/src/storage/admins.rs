//! Repository for web admin accounts.

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    error::Result,
    models::{AdminAccount, AdminRole},
};

/// Repository for admin account database operations.
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

    /// Finds an admin by login, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn find(&self, login: &str) -> Result<Option<AdminAccount>> {
        let admin = sqlx::query_as::<_, AdminAccount>(
            r"
            SELECT login, password_hash, role, avatar, created_at
            FROM admins
            WHERE LOWER(login) = LOWER($1)
            ",
        )
        .bind(login.trim())
        .fetch_optional(&*self.pool)
        .await?;

        Ok(admin)
    }

    /// All admins, owner first.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn list(&self) -> Result<Vec<AdminAccount>> {
        let admins = sqlx::query_as::<_, AdminAccount>(
            r"
            SELECT login, password_hash, role, avatar, created_at
            FROM admins
            ORDER BY (role = 'owner') DESC, login ASC
            ",
        )
        .fetch_all(&*self.pool)
        .await?;

        Ok(admins)
    }

    /// Creates an admin with a lowercased login. Returns false when the
    /// login is taken.
    ///
    /// # Errors
    ///
    /// Returns error if insert fails.
    pub async fn create(
        &self,
        login: &str,
        password_hash: &str,
        role: AdminRole,
        avatar: Option<&str>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r"
            INSERT INTO admins (login, password_hash, role, avatar)
            SELECT $1, $2, $3, $4
            WHERE NOT EXISTS (SELECT 1 FROM admins WHERE LOWER(login) = LOWER($1))
            ",
        )
        .bind(login.trim().to_lowercase())
        .bind(password_hash)
        .bind(role)
        .bind(avatar)
        .execute(&*self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Replaces the avatar URL of an admin.
    ///
    /// # Errors
    ///
    /// Returns error if the update fails.
    pub async fn set_avatar(&self, login: &str, avatar: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE admins SET avatar = $2 WHERE LOWER(login) = LOWER($1)")
            .bind(login.trim())
            .bind(avatar)
            .execute(&*self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Creates or refreshes the owner account from startup configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    pub async fn upsert_owner(
        &self,
        login: &str,
        password_hash: &str,
        avatar: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO admins (login, password_hash, role, avatar)
            VALUES ($1, $2, 'owner', $3)
            ON CONFLICT (login) DO UPDATE SET
                password_hash = EXCLUDED.password_hash,
                role = 'owner',
                avatar = COALESCE(EXCLUDED.avatar, admins.avatar)
            ",
        )
        .bind(login.trim().to_lowercase())
        .bind(password_hash)
        .bind(avatar.filter(|a| !a.is_empty()))
        .execute(&*self.pool)
        .await?;

        Ok(())
    }
}
