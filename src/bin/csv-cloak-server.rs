// Standalone HTTP server for the CSV anonymization pipeline.
// Use: cargo run --bin csv-cloak-server

use csv_cloak::http_server;
use csv_cloak::SessionStore;
use std::env;
use std::sync::Arc;
use std::time::Duration;

/// How old a session may get before the sweep drops it.
const SESSION_TTL_SECS: i64 = 60 * 60;
/// How often the expiry sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Try to bind to a port, returning the actual port used
async fn try_bind_port(start_port: u16) -> u16 {
    let mut port = start_port;
    for _ in 0..10 {
        match tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await {
            Ok(listener) => {
                // Successfully bound, drop the listener so the server can use it
                drop(listener);
                return port;
            }
            Err(_) => {
                tracing::warn!("Port {} is in use, trying {}...", port, port + 1);
                port += 1;
            }
        }
    }
    // Return the last tried port, let the server fail with a clear message
    port
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let preferred_port: u16 = env::var("CSV_CLOAK_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(5000);
    let port = try_bind_port(preferred_port).await;

    let store = Arc::new(SessionStore::new());

    // Periodic sweep drops sessions that were never cleaned up explicitly
    let sweep_store = store.clone();
    tokio::spawn(async move {
        let max_age = chrono::Duration::seconds(SESSION_TTL_SECS);
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = sweep_store.purge_expired(max_age);
            if removed > 0 {
                tracing::info!(removed, "expired sessions purged");
            }
        }
    });

    http_server::run_http_server(store, port).await;
    Ok(())
}
