//! SEABLUU order-tracking bot.
//!
//! Main entry point. Loads configuration, prepares the database, registers
//! the Telegram webhook and serves the HTTP API until a shutdown signal.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use seabluu_api::{hash_password, AppState, Config};
use seabluu_bot::Dispatcher;
use seabluu_core::{BotStore, Storage};
use seabluu_telegram::TelegramClient;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!("Starting SEABLUU bot");

    let config = Config::load()?;
    info!(
        database_url = %config.database_url_masked(),
        host = %config.host,
        port = config.port,
        max_connections = config.database_max_connections,
        "Configuration loaded"
    );

    let db_pool = create_database_pool(&config).await?;
    info!("Database connection pool established");

    seabluu_core::storage::migrate(&db_pool).await.context("Failed to run database migrations")?;
    info!("Database migrations completed");

    let store: Arc<dyn BotStore> = Arc::new(Storage::new(db_pool.clone()));
    seed_owner(store.as_ref(), &config).await?;

    let api = Arc::new(TelegramClient::new(config.bot_token()?, config.to_client_config())?);
    match config.webhook_url() {
        Some(url) => {
            api.set_webhook(&url).await.context("Failed to register Telegram webhook")?;
            info!(url = %url, "Telegram webhook registered");
        },
        None => warn!("PUBLIC_URL is not set, Telegram webhook not registered"),
    }

    let admin_ids = config.admin_ids();
    info!(admins = admin_ids.len(), "Bot admins configured");
    let dispatcher = Arc::new(Dispatcher::new(store.clone(), api, admin_ids));
    let state = AppState::new(store, dispatcher, &config);

    let addr = config.parse_server_addr()?;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = seabluu_api::start_server(state, addr).await {
            error!(error = %e, "Server failed");
        }
    });

    info!(addr = %addr, "SEABLUU is ready to receive updates");

    seabluu_api::shutdown_signal().await;
    info!("Shutdown signal received, starting graceful shutdown");

    tokio::select! {
        () = tokio::time::sleep(Duration::from_secs(30)) => {
            info!("Shutdown grace period expired");
        }
        _ = server_handle => {
            info!("Server stopped");
        }
    }

    db_pool.close().await;
    info!("Database connections closed");

    info!("SEABLUU shutdown complete");
    Ok(())
}

/// Initializes tracing with environment-based configuration.
fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,seabluu=debug,tower_http=debug"));

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}

/// Creates the database connection pool with retry logic.
async fn create_database_pool(config: &Config) -> Result<sqlx::PgPool> {
    const MAX_RETRIES: u32 = 5;
    const RETRY_DELAY: Duration = Duration::from_secs(2);
    let mut retries = 0;

    loop {
        match PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connection_timeout))
            .idle_timeout(Duration::from_secs(config.database_idle_timeout))
            .max_lifetime(Duration::from_secs(config.database_max_lifetime))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => {
                sqlx::query("SELECT 1")
                    .execute(&pool)
                    .await
                    .context("Failed to verify database connection")?;

                return Ok(pool);
            },
            Err(e) if retries < MAX_RETRIES => {
                retries += 1;
                warn!(
                    attempt = retries,
                    max_retries = MAX_RETRIES,
                    error = %e,
                    "Database connection failed, retrying"
                );
                tokio::time::sleep(RETRY_DELAY).await;
            },
            Err(e) => {
                return Err(e).context("Failed to create database connection pool after retries");
            },
        }
    }
}

/// Creates or refreshes the owner account from configuration.
async fn seed_owner(store: &dyn BotStore, config: &Config) -> Result<()> {
    let login = config.admin_login.trim().to_lowercase();
    let hash = hash_password(&login, &config.admin_password, &config.admin_secret);
    let avatar = Some(config.admin_avatar.trim()).filter(|a| !a.is_empty());

    store.upsert_owner(&login, &hash, avatar).await.context("Failed to seed owner account")?;
    info!(login = %login, "Owner account ready");
    Ok(())
}
