//! Authentication module
//!
//! Provides complete authentication functionality:
//! - User registration with email/password
//! - Email verification
//! - Password reset via email
//! - Google OAuth login
//! - JWT bearer tokens

pub mod api_error;
pub mod backend;
pub mod current_user;
pub mod database;
pub mod email;
pub mod jwt;
pub mod manager;
pub mod models;
pub mod oauth;
pub mod password;
pub mod routes;
pub mod setup;
pub mod transport;

pub use api_error::{ApiError, ErrorCode};
pub use backend::AuthenticationBackend;
pub use current_user::{CurrentActiveUser, CurrentSuperuser, CurrentUser};
pub use database::AuthDatabase;
pub use email::EmailSender;
pub use jwt::JwtStrategy;
pub use manager::UserManager;
pub use models::*;
pub use oauth::GoogleOAuth2;
pub use routes::auth_router;
pub use setup::{
    auth_backend, bearer_transport, get_jwt_strategy, get_user_manager, google_oauth_client,
    AuthState,
};
pub use transport::BearerTransport;
