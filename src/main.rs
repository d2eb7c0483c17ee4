use clap::Parser;
use std::sync::Arc;

use user_auth::{
    auth::AuthState,
    config::Settings,
    logging::setup_logging,
    servers::{WebServer, WebServerConfig},
};

#[derive(Parser, Debug)]
#[command(name = "user_auth", version, about)]
struct Config {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short = 'p', long, default_value_t = 8000)]
    port: u16,

    /// Path to the SQLite user database
    #[arg(long, env = "DATABASE_PATH", default_value = "data/users.db")]
    db_path: String,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Write rotating log files into this directory
    #[arg(long)]
    log_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();

    let _logger = setup_logging(&config.log_level, config.log_dir.as_deref())?;

    if let Some(parent) = std::path::Path::new(&config.db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let settings = Settings::from_env()?;
    log::debug!("Loaded settings: {:?}", settings);

    let auth_state = AuthState::new(settings, &config.db_path)?;
    log::info!("🔐 Authentication ready (db: {})", config.db_path);

    let server = WebServer::new(
        WebServerConfig {
            port: config.port,
            host: config.host,
        },
        Arc::new(auth_state),
    );

    server.start().await
}
