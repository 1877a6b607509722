mod config;
mod handlers;
mod models;
mod session;

use axum::{
    Router,
    routing::{delete, get},
};
use session::registry::RegistryState;
use session::store::create_session_store;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cti_session_registry=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Load session configuration
    let settings = match config::load_config_with_fallback() {
        Ok(config) => {
            tracing::info!("✓ Configuration loaded successfully");
            config.session.clone()
        }
        Err(e) => {
            tracing::warn!(
                "⚠ Failed to load configuration: {}. Falling back to in-memory session defaults.",
                e
            );
            models::SessionSettings::default()
        }
    };

    // Build the session store once at startup; everything shares this handle
    let store = match create_session_store(&settings).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Failed to initialize session store: {}", e);
            std::process::exit(1);
        }
    };

    let state = RegistryState::new(store);

    // Build our application with routes
    let app = Router::new()
        // Health check routes (always available)
        .route("/", get(handlers::health::health_check))
        .route("/health", get(handlers::health::health_check))
        // Administrative session routes
        .route(
            "/api/v1/sessions",
            get(handlers::sessions::list_sessions).delete(handlers::sessions::kill_user_sessions),
        )
        .route(
            "/api/v1/session/:session_id",
            delete(handlers::sessions::kill_session),
        )
        .with_state(state)
        // Add global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("🚀 Starting CTI Session Registry API on {}", addr);
    tracing::info!("📖 Session routes: /api/v1/sessions, /api/v1/session/{{session-id}}");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
