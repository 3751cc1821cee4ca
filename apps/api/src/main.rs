//! Tieline API composition root.

#![forbid(unsafe_code)]

mod dto;
mod error;
mod handlers;
mod state;

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use sqlx::postgres::PgPoolOptions;
use tieline_application::ConnectionService;
use tieline_core::AppError;
use tieline_infrastructure::PostgresConnectionRepository;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let database_url = required_env("DATABASE_URL")?;
    let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
    let api_port = env::var("API_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(3001);

    // The registry schema is provisioned by the ingestion pipeline; this
    // service only reads it.
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    let connection_repository = Arc::new(PostgresConnectionRepository::new(pool));
    let app_state = AppState {
        connection_service: ConnectionService::new(connection_repository),
    };

    let app = Router::new()
        .route("/health", get(handlers::health_handler))
        .route(
            "/api/connections/query",
            post(handlers::query_connections_handler),
        )
        .route(
            "/api/connections/explain",
            post(handlers::explain_connections_handler),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let host = IpAddr::from_str(&api_host)
        .map_err(|error| AppError::Internal(format!("invalid API_HOST '{api_host}': {error}")))?;
    let address = SocketAddr::from((host, api_port));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "tieline-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}
