use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod events;
mod matching;
mod models;
mod routes;
mod schema;
mod services;
mod socket;

use amora_shared::clients::db::{create_pool, DbPool};
use amora_shared::clients::rabbitmq::RabbitMQClient;
use config::AppConfig;
use socket::registry::ConnectionRegistry;

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub rabbitmq: RabbitMQClient,
    pub registry: ConnectionRegistry,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    amora_shared::middleware::init_tracing("amora-matching");

    let config = AppConfig::load()?;
    let port = config.port;

    let db = create_pool(&config.database_url);
    let rabbitmq = RabbitMQClient::connect(&config.rabbitmq_url).await?;

    let state = Arc::new(AppState {
        db,
        config,
        rabbitmq,
        registry: ConnectionRegistry::new(),
    });

    // Spawn RabbitMQ subscriber for user.registered events
    let sub_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = events::subscriber::listen_user_registered(sub_state).await {
            tracing::error!(error = %e, "user.registered subscriber failed");
        }
    });

    let app = Router::new()
        // Health
        .route("/health", get(routes::health::health_check))
        // Discovery
        .route("/discovery", get(routes::discovery::get_discovery))
        // Swipes and matches
        .route("/swipes", post(routes::swipes::create_swipe))
        .route("/matches", get(routes::matches::list_matches))
        .route("/matches/:id/messages", get(routes::messages::list_messages))
        // Profile
        .route(
            "/me",
            get(routes::profile::get_profile).patch(routes::profile::update_profile),
        )
        // Live chat channel
        .route("/ws", get(socket::handlers::ws_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "amora-matching starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
