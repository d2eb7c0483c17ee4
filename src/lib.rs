//! # User Auth
//!
//! Authentication for a web service built on axum.
//!
//! ## Features
//!
//! - **Registration**: email/password accounts hashed with Argon2id
//! - **JWT bearer login**: stateless HS256 access tokens
//! - **Password reset & email verification**: signed, single-purpose tokens
//!   delivered through lifecycle hooks and email
//! - **Google OAuth2**: authorization URL, code exchange and account linking
//!
//! ## Usage
//!
//! ```rust,no_run
//! use user_auth::{config::Settings, auth::AuthState, servers::{WebServer, WebServerConfig}};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let state = AuthState::new(Settings::from_env()?, "data/users.db")?;
//! WebServer::new(WebServerConfig::default(), std::sync::Arc::new(state)).start().await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// PUBLIC API MODULES
// ============================================================================

/// Authentication: users, tokens, OAuth and HTTP routes
pub mod auth;

/// Runtime configuration read from the environment
pub mod config;

/// Error types
pub mod error;

/// Logger initialisation
pub mod logging;

/// HTTP server hosting the auth routers
pub mod servers;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

pub use auth::{AuthState, CurrentActiveUser, User, UserManager};
pub use error::{AuthError, Result};
pub use servers::{WebServer, WebServerConfig};

// ============================================================================
// LIBRARY VERSION INFO
// ============================================================================

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Library description
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
