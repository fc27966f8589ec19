//! Vocab Agent: keeps menus and permissions in sync for the signed-in user
//!
//! Main entry point that wires the crates together and runs the sync client
//! until interrupted.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{EnvFilter, fmt};

use vocab_auth::guard::inspect_token;
use vocab_auth::{AuthBackend, HttpBackend, PermissionResolver, RbacEnforcer, Role, UserInfo};
use vocab_cache::{StorageKeys, open_local_store};
use vocab_core::config::AppConfig;
use vocab_core::error::AppError;
use vocab_core::events::{ClientEvent, EventPayload};
use vocab_core::traits::LocalStore;
use vocab_core::types::SubjectId;
use vocab_sync::{SyncClient, SyncDependencies, SyncSession, WsTransport};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Agent error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    match std::env::var("VOCAB_CONFIG") {
        Ok(path) => AppConfig::load_from(&path),
        Err(_) => {
            let env = std::env::var("VOCAB_ENV").unwrap_or_else(|_| "development".to_string());
            AppConfig::load(&env)
        }
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main agent run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting vocab-agent v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Local store ──────────────────────────────────────
    tracing::info!(
        "Opening local store (provider: {})...",
        config.storage.provider
    );
    let store = open_local_store(&config.storage).await?;
    let keys = StorageKeys::new(config.storage.key_prefix.clone());

    // ── Step 2: Permission catalog and cache ─────────────────────
    let enforcer = Arc::new(RbacEnforcer::from_config(&config.catalog)?);
    let resolver = Arc::new(PermissionResolver::new(enforcer, &config.cache));
    tracing::info!(
        roles = resolver.enforcer().policies().roles().count(),
        caching = resolver.is_caching(),
        "Permission catalog loaded"
    );

    // ── Step 3: Backend and session ──────────────────────────────
    let backend = Arc::new(HttpBackend::new(&config.api)?);
    let session = resolve_session(backend.as_ref(), &store, &keys).await;
    tracing::info!(subject = %session.subject, role = %session.role, "Session resolved");

    // ── Step 4: Sync client ──────────────────────────────────────
    let transport = Arc::new(WsTransport::new(Duration::from_millis(
        config.sync.connect_timeout_ms,
    )));
    let client = SyncClient::new(
        session,
        SyncDependencies {
            config: config.sync.clone(),
            ws_base_url: config.api.ws_base_url.clone(),
            resolver,
            menus: backend,
            store,
            keys,
            transport,
        },
    );

    let events = tokio::spawn(log_events(client.subscribe()));
    client.init().await?;
    tracing::info!("vocab-agent running; press Ctrl+C to stop");

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, stopping sync client...");

    client.destroy().await;
    events.abort();

    let metrics = client.metrics();
    tracing::info!(
        received = metrics.messages_received,
        dropped = metrics.messages_dropped,
        reconnects = metrics.reconnect_attempts,
        refetches = metrics.refetches,
        "vocab-agent stopped"
    );
    Ok(())
}

/// Work out who to sync for.
///
/// The backend is authoritative; when it cannot answer the last cached user
/// is used, and failing that the anonymous subject with the lowest role.
async fn resolve_session(
    backend: &dyn AuthBackend,
    store: &Arc<dyn LocalStore>,
    keys: &StorageKeys,
) -> SyncSession {
    let token = match store.get(&keys.auth_token()).await {
        Ok(token) => token,
        Err(e) => {
            tracing::warn!(error = %e, "Could not read auth token");
            None
        }
    };

    let status = inspect_token(token.as_deref(), Utc::now());
    let user = if status.is_usable() {
        match backend.current_user(token.as_deref()).await {
            Ok(user) => {
                if let Err(e) = store.set_json(&keys.current_user(), &user).await {
                    tracing::warn!(error = %e, "Failed to cache current user");
                }
                Some(user)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Backend user lookup failed, trying cached user");
                cached_user(store, keys).await
            }
        }
    } else {
        tracing::info!(token = ?status, "No usable auth token");
        None
    };

    match user.map(|u| (u.role(), u)) {
        Some((Ok(role), user)) => SyncSession {
            subject: user.id,
            role,
        },
        Some((Err(e), user)) => {
            tracing::warn!(user_id = %user.id, error = %e, "User has unknown role, syncing anonymously");
            anonymous_session()
        }
        None => anonymous_session(),
    }
}

async fn cached_user(store: &Arc<dyn LocalStore>, keys: &StorageKeys) -> Option<UserInfo> {
    store
        .get_json::<UserInfo>(&keys.current_user())
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Cached user unreadable");
            None
        })
}

fn anonymous_session() -> SyncSession {
    SyncSession {
        subject: SubjectId::anonymous(),
        role: Role::Student,
    }
}

async fn log_events(mut rx: tokio::sync::broadcast::Receiver<ClientEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => match &event.payload {
                EventPayload::Connection(e) => tracing::info!(event = ?e, "Connection event"),
                EventPayload::Permission(e) => tracing::info!(event = ?e, "Permission event"),
                EventPayload::Menu(e) => tracing::debug!(event = ?e, "Menu event"),
            },
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event logger lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
