mod config;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use inbox_api::oauth::GoogleProvider;
use inbox_api::session::{self, CookieKey, SESSION_MAX_AGE, SessionStore};
use inbox_api::{AppStateInner, build_router};
use inbox_db::{Database, MessageStore, PostgrestStore, SqliteStore};

use crate::config::{Cli, Config, StoreConfig};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const SESSION_PURGE_INTERVAL_SECS: u64 = 600;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "inbox=debug,inbox_api=debug,inbox_db=debug,tower_http=debug".into()
            }),
        )
        .init();

    // Config
    let config = Config::from_cli_and_env(Cli::parse(), |key| std::env::var(key).ok())?;
    info!("Starting in {:?} mode", config.environment);

    // One outbound client for the store and the identity provider. No
    // redirects: the token request carries the client secret.
    let http = reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(config.http_timeout)
        .redirect(reqwest::redirect::Policy::none())
        .build()?;

    let store: Arc<dyn MessageStore> = match &config.store {
        StoreConfig::Postgrest {
            url,
            api_key,
            schema,
        } => {
            info!("Reading messages from {} (schema {})", url, schema);
            Arc::new(PostgrestStore::new(http.clone(), url, api_key, schema))
        }
        StoreConfig::Sqlite { path } => {
            let db = Database::open(path)?;
            Arc::new(SqliteStore::new(Arc::new(db)))
        }
    };

    let sessions = Arc::new(SessionStore::new(SESSION_MAX_AGE));
    tokio::spawn(session::run_purge_loop(
        sessions.clone(),
        SESSION_PURGE_INTERVAL_SECS,
    ));

    let provider = GoogleProvider::new(http, config.oauth.clone())?;
    let cookie_key = CookieKey::derive(config.session_secret.as_bytes())
        .ok_or_else(|| anyhow::anyhow!("SESSION_SECRET is too short to key cookies"))?;

    let state = Arc::new(AppStateInner {
        store,
        provider: Arc::new(provider),
        sessions,
        cookie_key,
        cookie_secure: config.cookie_secure,
        dev_receiver_id: config.dev_receiver_id,
    });

    let app = build_router(state, config.gate, &config.public_dir);

    info!("Inbox server listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Cannot install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
