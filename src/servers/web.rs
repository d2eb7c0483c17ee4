use axum::{response::Json, routing::get, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::auth::{auth_router, AuthState, CurrentActiveUser};

#[derive(Serialize, Debug, Clone)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
}

/// Web server configuration
#[derive(Debug, Clone)]
pub struct WebServerConfig {
    pub port: u16,
    pub host: String,
}

impl Default for WebServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            host: "0.0.0.0".to_string(),
        }
    }
}

/// HTTP server mounting the auth routers
pub struct WebServer {
    config: WebServerConfig,
    auth_state: Arc<AuthState>,
}

impl WebServer {
    pub fn new(config: WebServerConfig, auth_state: Arc<AuthState>) -> Self {
        Self { config, auth_state }
    }

    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error>> {
        let app = self.create_router();
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;
        let listener = TcpListener::bind(addr).await?;

        log::info!("🌐 Auth server listening on http://{}", addr);

        axum::serve(listener, app).await?;
        Ok(())
    }

    pub fn create_router(&self) -> Router {
        let protected = Router::new()
            .route("/authenticated-route", get(authenticated_route))
            .with_state(Arc::clone(&self.auth_state));

        Router::new()
            .route("/api/status", get(api_status))
            .merge(auth_router(Arc::clone(&self.auth_state)))
            .merge(protected)
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
    }
}

async fn api_status() -> Json<ApiResponse> {
    Json(ApiResponse {
        status: "ready".to_string(),
        message: format!("{} {} is running", crate::NAME, crate::VERSION),
    })
}

/// Example of a route guarded by the current active user
async fn authenticated_route(CurrentActiveUser(user): CurrentActiveUser) -> Json<ApiResponse> {
    Json(ApiResponse {
        status: "ok".to_string(),
        message: format!("Hello {}!", user.email),
    })
}
