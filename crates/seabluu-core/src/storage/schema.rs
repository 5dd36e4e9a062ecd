//! Database schema.
//!
//! Tables are created with `IF NOT EXISTS`, so [`migrate`] runs on every
//! start and against fresh test databases alike.

use sqlx::PgPool;
use tracing::debug;

use crate::error::{CoreError, Result};

/// Schema statements, applied in order. Each one is idempotent.
pub const SCHEMA: &[(&str, &str)] = &[
    (
        "orders",
        r"
        CREATE TABLE IF NOT EXISTS orders (
            id SERIAL PRIMARY KEY,
            order_id TEXT NOT NULL UNIQUE,
            client_name TEXT,
            phone TEXT,
            origin TEXT,
            status TEXT NOT NULL,
            note TEXT,
            country TEXT,
            created_at TIMESTAMPTZ DEFAULT NOW(),
            updated_at TIMESTAMPTZ DEFAULT NOW()
        )
        ",
    ),
    (
        "participants",
        r"
        CREATE TABLE IF NOT EXISTS participants (
            order_id TEXT NOT NULL,
            username TEXT NOT NULL,
            paid BOOLEAN NOT NULL DEFAULT FALSE,
            qty INTEGER,
            created_at TIMESTAMPTZ DEFAULT NOW(),
            updated_at TIMESTAMPTZ DEFAULT NOW(),
            PRIMARY KEY (order_id, username)
        )
        ",
    ),
    (
        "subscriptions",
        r"
        CREATE TABLE IF NOT EXISTS subscriptions (
            user_id BIGINT NOT NULL,
            order_id TEXT NOT NULL,
            last_sent_status TEXT,
            created_at TIMESTAMPTZ DEFAULT NOW(),
            updated_at TIMESTAMPTZ DEFAULT NOW(),
            PRIMARY KEY (user_id, order_id)
        )
        ",
    ),
    (
        "clients",
        r"
        CREATE TABLE IF NOT EXISTS clients (
            user_id BIGINT PRIMARY KEY,
            username TEXT,
            full_name TEXT,
            phone TEXT,
            created_at TIMESTAMPTZ DEFAULT NOW(),
            updated_at TIMESTAMPTZ DEFAULT NOW()
        )
        ",
    ),
    (
        "addresses",
        r"
        CREATE TABLE IF NOT EXISTS addresses (
            user_id BIGINT PRIMARY KEY,
            username TEXT,
            full_name TEXT NOT NULL,
            phone TEXT NOT NULL,
            city TEXT NOT NULL,
            address TEXT NOT NULL,
            postcode TEXT NOT NULL,
            created_at TIMESTAMPTZ DEFAULT NOW(),
            updated_at TIMESTAMPTZ DEFAULT NOW()
        )
        ",
    ),
    (
        "admins",
        r"
        CREATE TABLE IF NOT EXISTS admins (
            login TEXT PRIMARY KEY,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'admin',
            avatar TEXT,
            created_at TIMESTAMPTZ DEFAULT NOW()
        )
        ",
    ),
    (
        "chat_messages",
        r"
        CREATE TABLE IF NOT EXISTS chat_messages (
            id BIGSERIAL PRIMARY KEY,
            login TEXT NOT NULL,
            text TEXT NOT NULL,
            ref TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        ",
    ),
    (
        "orders status index",
        "CREATE INDEX IF NOT EXISTS idx_orders_status ON orders(status, updated_at DESC)",
    ),
    (
        "participants username index",
        "CREATE INDEX IF NOT EXISTS idx_participants_username ON participants(LOWER(username))",
    ),
    (
        "clients username index",
        "CREATE INDEX IF NOT EXISTS idx_clients_username ON clients(LOWER(username))",
    ),
    (
        "subscriptions user index",
        "CREATE INDEX IF NOT EXISTS idx_subscriptions_user ON subscriptions(user_id)",
    ),
    (
        "chat created index",
        "CREATE INDEX IF NOT EXISTS idx_chat_created ON chat_messages(created_at)",
    ),
];

/// Applies [`SCHEMA`] statement by statement.
///
/// # Errors
///
/// Returns `CoreError::Database` naming the first statement that failed.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    for (name, statement) in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| CoreError::Database(format!("failed to create {name}: {e}")))?;
        debug!(name, "schema statement applied");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_statement_is_idempotent() {
        for (name, statement) in SCHEMA {
            assert!(statement.contains("IF NOT EXISTS"), "{name} is not idempotent");
        }
    }

    #[test]
    fn lookup_columns_are_indexed() {
        let indexes: Vec<&str> =
            SCHEMA.iter().map(|(_, s)| *s).filter(|s| s.contains("CREATE INDEX")).collect();
        for column in ["subscriptions(user_id)", "chat_messages(created_at)", "orders(status"] {
            assert!(indexes.iter().any(|s| s.contains(column)), "{column} has no index");
        }
    }
}
