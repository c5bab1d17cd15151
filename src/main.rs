// src/main.rs
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use axum::http::Method;
use axum::{routing::get, Router};
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

use bazaar_backoffice::services::notifier::Notifier;
use bazaar_backoffice::{database, routes, state::AppState};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    dotenv().ok();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let db_pool = database::create_pool(&database_url)
        .await
        .expect("Failed to create database pool");

    database::MIGRATOR
        .run(&db_pool)
        .await
        .expect("Failed to run migrations");

    let notifier = Notifier::spawn(db_pool.clone());
    let app_state = AppState::new(db_pool, notifier);

    spawn_maintenance(app_state.clone());

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
        .allow_origin(Any);

    let api = routes::create_router().route("/health", get(health_check));

    let app = Router::new()
        .nest("/api/v1", api)
        .layer(cors)
        .with_state(app_state);

    let host_str = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let host: IpAddr = host_str
        .parse()
        .unwrap_or_else(|_| "127.0.0.1".parse().unwrap());
    let base_port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(3000);

    // Try base_port..base_port+20 to avoid crashing when the address is in use
    let listener = {
        let mut bound = None;
        for offset in 0u16..=20 {
            let port = base_port.saturating_add(offset);
            let addr = SocketAddr::from((host, port));
            match TcpListener::bind(addr).await {
                Ok(l) => {
                    bound = Some((l, addr));
                    break;
                }
                Err(e) => {
                    if offset == 0 {
                        tracing::warn!(%addr, error=%e, "Port in use, trying next");
                    }
                }
            }
        }
        match bound {
            Some((l, addr)) => {
                tracing::info!("Server running on {}", addr);
                l
            }
            None => {
                tracing::error!(
                    "Failed to bind to any port starting at {} on {}",
                    base_port,
                    host
                );
                return;
            }
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error=%e, "Server error");
    }
}

/// Hourly background pass: expire overdue reservations, send pickup
/// reminders, flag overdue receivables. Each sweep is also reachable over
/// HTTP for manual runs.
fn spawn_maintenance(state: AppState) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(3600));
        loop {
            ticker.tick().await;
            if let Err(e) = state.reservations.expire_sweep().await {
                tracing::error!(error = %e, "Reservation expiration sweep failed");
            }
            if let Err(e) = state.reservations.send_reminders(48).await {
                tracing::error!(error = %e, "Reservation reminder sweep failed");
            }
            if let Err(e) = state.receivables.overdue_sweep().await {
                tracing::error!(error = %e, "Receivable overdue sweep failed");
            }
        }
    });
}

async fn health_check() -> &'static str {
    "OK"
}
