//! NexTalk Chat Server Library
//!
//! Two-party real-time chat: authenticated WebSocket connections, point-to-
//! point delivery with acknowledgements, presence, and typing signals,
//! backed by a SQLite message history.

pub mod auth;
pub mod chat;
pub mod config;
pub mod ctx;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod presence;
pub mod registry;
pub mod store;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use auth::AuthManager;
use chat::{MessageRouter, TypingRelay};
use config::{AppState, ChatServerConfig};
use handlers::{
    get_history, list_users, login, logout, me, signup, update_profile, ws_connect,
};
use presence::PresenceTracker;
use registry::ConnectionRegistry;
use store::MessageStore;

pub async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        // Already set, ignore
    }

    let config = ChatServerConfig::default();
    config.ensure_dirs().await?;

    info!("=== NexTalk Server ===");
    info!("Data directory: {:?}", config.base_dir);
    info!("Database: {:?}", config.db_path);

    let pool = db::connect(&config.db_path).await?;

    let auth_manager = Arc::new(AuthManager::new(pool.clone(), config.session_ttl_days).await?);
    info!("Auth Manager initialized");

    let store = Arc::new(MessageStore::new(pool).await?);

    let registry = Arc::new(ConnectionRegistry::new());
    let presence = Arc::new(PresenceTracker::new(auth_manager.clone(), registry.clone()));
    let router = Arc::new(MessageRouter::new(store.clone(), registry.clone()));
    let typing = Arc::new(TypingRelay::new(registry.clone()));
    info!("Realtime core initialized");

    let app_state = AppState {
        auth: auth_manager,
        store,
        registry,
        presence,
        router,
        typing,
    };

    let app = app_router(app_state);

    info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the full application router.
pub fn app_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me).put(update_profile))
        .route("/users", get(list_users))
        .route("/messages/{peer_id}", get(get_history))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::mw_require_auth,
        ));

    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        // The socket carries its own token; auth happens before the upgrade.
        .route("/ws", get(ws_connect))
        .merge(protected)
        .route("/health", get(health_check))
        .with_state(state)
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

async fn health_check() -> &'static str {
    "OK - NexTalk Server"
}
