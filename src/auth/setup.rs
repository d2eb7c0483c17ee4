//! Wiring: the OAuth client, the user manager factory, the bearer transport,
//! the JWT strategy and the authentication backend assembled into [`AuthState`].

use axum::extract::FromRef;
use std::sync::Arc;

use super::backend::AuthenticationBackend;
use super::database::AuthDatabase;
use super::email::EmailSender;
use super::jwt::JwtStrategy;
use super::manager::UserManager;
use super::oauth::GoogleOAuth2;
use super::transport::BearerTransport;
use crate::config::Settings;
use crate::error::Result;

/// Where clients post credentials, relative to the service root
pub const TOKEN_URL: &str = "auth/jwt/login";

/// Google client from the configured id and secret; `None` when either is missing
pub fn google_oauth_client(settings: &Settings) -> Result<Option<GoogleOAuth2>> {
    match (&settings.google_client_id, &settings.google_client_secret) {
        (Some(client_id), Some(client_secret)) => Ok(Some(GoogleOAuth2::new(
            client_id,
            client_secret,
            &settings.oauth_redirect_url,
        )?)),
        _ => Ok(None),
    }
}

pub fn get_user_manager(db: AuthDatabase, email: Arc<EmailSender>, secret: &str) -> UserManager {
    UserManager::new(db, email, secret)
}

pub fn bearer_transport() -> BearerTransport {
    BearerTransport::new(TOKEN_URL)
}

pub fn get_jwt_strategy(secret: &str, lifetime_seconds: u64) -> JwtStrategy {
    JwtStrategy::new(secret, lifetime_seconds)
}

pub fn auth_backend(settings: &Settings) -> AuthenticationBackend {
    AuthenticationBackend::new(
        "jwt",
        bearer_transport(),
        get_jwt_strategy,
        settings.secret.clone(),
        settings.jwt_lifetime_seconds,
    )
}

/// Shared authentication state
pub struct AuthState {
    pub settings: Settings,
    pub db: AuthDatabase,
    pub backend: AuthenticationBackend,
    pub google: Option<GoogleOAuth2>,
    pub email: Arc<EmailSender>,
}

impl AuthState {
    /// Open the database at `db_path` and pick up SMTP settings from the environment
    pub fn new(settings: Settings, db_path: &str) -> Result<Self> {
        let db = AuthDatabase::new(db_path)?;
        let email = EmailSender::from_env(&settings.app_url);
        Self::with_parts(settings, db, email)
    }

    pub fn with_parts(settings: Settings, db: AuthDatabase, email: EmailSender) -> Result<Self> {
        let google = google_oauth_client(&settings)?;
        if google.is_none() {
            log::info!("Google OAuth not configured; /auth/google routes disabled");
        }

        Ok(Self {
            backend: auth_backend(&settings),
            settings,
            db,
            google,
            email: Arc::new(email),
        })
    }

    pub fn user_manager(&self) -> UserManager {
        get_user_manager(self.db.clone(), Arc::clone(&self.email), &self.settings.secret)
    }
}

impl FromRef<Arc<AuthState>> for UserManager {
    fn from_ref(state: &Arc<AuthState>) -> Self {
        state.user_manager()
    }
}
