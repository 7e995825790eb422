use axum::Router;
use mimalloc::MiMalloc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use runtrack_rs::{config, routes, state};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "runtrack_rs=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::from_env();
    let state = match state::AppState::new(config.clone()) {
        Ok(state) => state,
        Err(err) => {
            tracing::error!("Failed to set up location source: {}", err);
            std::process::exit(1);
        }
    };

    // Run history eviction
    let runs = state.runs.clone();
    let history_ttl = config.run_history_ttl;
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(tokio::time::Duration::from_secs(300)).await; // Every 5 minutes
            runs.evict_expired(history_ttl);
        }
    });

    let app = Router::new()
        .merge(routes::health::router())
        .merge(routes::run::router())
        .merge(routes::device::router())
        .merge(routes::runs::router())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("Failed to bind {}: {}", addr, err);
            std::process::exit(1);
        }
    };

    tracing::info!("RunTrack listening on {}", addr);
    tracing::info!("Location source: {:?}", config.location_source);
    tracing::info!("Run: GET http://{}/api/run, POST /api/run/toggle", addr);
    tracing::info!("Events: GET http://{}/api/run/events", addr);

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", err);
    }
}
