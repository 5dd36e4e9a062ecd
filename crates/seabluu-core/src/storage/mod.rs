//! PostgreSQL access layer, one repository per table.
//!
//! All SQL lives in these repositories. The bot and the admin API reach
//! them through [`crate::store::BotStore`], which `Storage` implements.

use std::sync::Arc;

use sqlx::PgPool;

pub mod addresses;
pub mod admins;
pub mod chat;
pub mod clients;
pub mod orders;
pub mod participants;
pub mod schema;
pub mod subscriptions;

pub use schema::migrate;

use crate::error::Result;

/// Container for all repository instances sharing one connection pool.
#[derive(Clone)]
pub struct Storage {
    /// Orders.
    pub orders: Arc<orders::Repository>,

    /// Order participants and payment flags.
    pub participants: Arc<participants::Repository>,

    /// Status subscriptions.
    pub subscriptions: Arc<subscriptions::Repository>,

    /// Known Telegram users.
    pub clients: Arc<clients::Repository>,

    /// Delivery addresses.
    pub addresses: Arc<addresses::Repository>,

    /// Web admin accounts.
    pub admins: Arc<admins::Repository>,

    /// Admin chat.
    pub chat: Arc<chat::Repository>,
}

impl Storage {
    /// Creates a new storage instance with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        let pool = Arc::new(pool);

        Self {
            orders: Arc::new(orders::Repository::new(pool.clone())),
            participants: Arc::new(participants::Repository::new(pool.clone())),
            subscriptions: Arc::new(subscriptions::Repository::new(pool.clone())),
            clients: Arc::new(clients::Repository::new(pool.clone())),
            addresses: Arc::new(addresses::Repository::new(pool.clone())),
            admins: Arc::new(admins::Repository::new(pool.clone())),
            chat: Arc::new(chat::Repository::new(pool)),
        }
    }

    /// Verifies database connectivity with `SELECT 1`.
    ///
    /// Used by the `/health` and `/ready` endpoints.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Database` if the connection is unhealthy.
    pub async fn health_check(&self) -> Result<()> {
        let _: (i32,) = sqlx::query_as("SELECT 1").fetch_one(&*self.orders.pool()).await?;

        Ok(())
    }
}
