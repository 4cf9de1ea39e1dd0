pub mod config;
pub mod error;
pub mod signaling;

use std::sync::Arc;
use actix_web::{web, HttpResponse};

pub use error::{AppError, RelayError};
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;

pub use signaling::{Registry, Router};

/// Health check endpoint handler
/// Returns a JSON response with server status, timestamp and connected peer count
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "peers": state.registry().count(),
    }))
}

/// Mounts the relay's routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/ws/{username}", web::get().to(signaling::ws_route));
}

/// Application state shared across all workers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub router: Router,
}

impl AppState {
    pub fn new(config: Settings) -> Self {
        Self {
            config: Arc::new(config),
            router: Router::new(Registry::new()),
        }
    }

    pub fn registry(&self) -> &Registry {
        self.router.registry()
    }
}
