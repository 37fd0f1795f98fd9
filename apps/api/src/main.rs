use std::net::SocketAddr;
use std::sync::Arc;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::{self, TraceLayer};
use tracing::{Level, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use shared_config::{AppConfig, StoreBackend};
use shared_database::{InMemoryStore, SchedulingStore, SupabaseSchedulingStore};
use waitlist_cell::dispatcher_from_config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting booking API server");

    // Load configuration
    let config = Arc::new(AppConfig::from_env());

    let store = select_store(&config);
    let dispatcher = dispatcher_from_config(&config);
    info!(
        "Using {} store, {} notifications",
        store.backend_name(),
        dispatcher.channel()
    );

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the application router
    let app = router::create_router(Arc::clone(&config), store, dispatcher)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new()
                    .level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new()
                    .level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn select_store(config: &AppConfig) -> Arc<dyn SchedulingStore> {
    match config.store_backend {
        StoreBackend::Supabase if config.is_configured() => {
            Arc::new(SupabaseSchedulingStore::new(config))
        }
        StoreBackend::Supabase => {
            warn!("STORE_BACKEND=supabase but Supabase is not configured, falling back to memory");
            Arc::new(InMemoryStore::new())
        }
        StoreBackend::Memory => Arc::new(InMemoryStore::new()),
    }
}
