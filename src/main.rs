use actix_web::{web, App, HttpServer};
use signaling_relay::{AppError, AppState, Settings};
use dotenv::dotenv;
use std::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[actix_web::main]
async fn main() -> signaling_relay::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    // Positional `[host] [port]` override the layered configuration
    let config = Settings::new()?.with_args(std::env::args().skip(1))?;
    info!("Configuration loaded successfully");

    let state = web::Data::new(AppState::new(config.clone()));

    let listener = TcpListener::bind(config.bind_address())?;
    info!("Server listening on {}", config.bind_address());

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(signaling_relay::configure)
    })
    .listen(listener)?
    .workers(config.server.workers as usize)
    .run()
    .await
    .map_err(|e| AppError::InternalError(e.to_string()))?;

    Ok(())
}
