//! Runtime settings read from the environment

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

use crate::error::{AuthError, Result};

/// Default lifetime of access, reset and verification tokens
pub const DEFAULT_TOKEN_LIFETIME_SECONDS: u64 = 3600;

/// Service settings
#[derive(Clone)]
pub struct Settings {
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    /// Signs access tokens, reset tokens, verification tokens and OAuth state
    pub secret: String,
    pub jwt_lifetime_seconds: u64,
    pub app_url: String,
    pub oauth_redirect_url: String,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let secret = std::env::var("SECRET").ok().filter(|s| !s.is_empty());
        let secret = match secret {
            Some(secret) => secret,
            None => {
                log::warn!("SECRET not set, using an ephemeral secret; tokens will not survive a restart");
                generate_secret()?
            }
        };
        let jwt_lifetime_seconds = std::env::var("JWT_LIFETIME_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECONDS);
        let app_url =
            std::env::var("APP_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());
        let oauth_redirect_url = std::env::var("OAUTH_REDIRECT_URL")
            .unwrap_or_else(|_| format!("{}/auth/google/callback", app_url));

        Ok(Self {
            google_client_id: std::env::var("GOOGLE_CLIENT_ID").ok(),
            google_client_secret: std::env::var("GOOGLE_CLIENT_SECRET").ok(),
            secret,
            jwt_lifetime_seconds,
            app_url,
            oauth_redirect_url,
        })
    }

    /// Settings for tests and local tooling
    pub fn with_secret(secret: impl Into<String>) -> Self {
        let app_url = "http://localhost:8000".to_string();
        Self {
            google_client_id: None,
            google_client_secret: None,
            secret: secret.into(),
            jwt_lifetime_seconds: DEFAULT_TOKEN_LIFETIME_SECONDS,
            oauth_redirect_url: format!("{}/auth/google/callback", app_url),
            app_url,
        }
    }

    pub fn google_configured(&self) -> bool {
        self.google_client_id.is_some() && self.google_client_secret.is_some()
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("google_client_id", &self.google_client_id)
            .field("google_client_secret", &self.google_client_secret.as_ref().map(|_| "***"))
            .field("secret", &"***")
            .field("jwt_lifetime_seconds", &self.jwt_lifetime_seconds)
            .field("app_url", &self.app_url)
            .field("oauth_redirect_url", &self.oauth_redirect_url)
            .finish()
    }
}

/// 32 random bytes, URL-safe base64
pub fn generate_secret() -> Result<String> {
    let mut bytes = [0u8; 32];
    getrandom::getrandom(&mut bytes).map_err(|e| AuthError::Random(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_secret_is_random() {
        let a = generate_secret().unwrap();
        let b = generate_secret().unwrap();
        assert_eq!(a.len(), 43);
        assert_ne!(a, b);
    }

    #[test]
    fn test_from_env_always_has_a_secret() {
        let settings = Settings::from_env().unwrap();
        assert!(!settings.secret.is_empty());
    }

    #[test]
    fn test_with_secret_defaults() {
        let settings = Settings::with_secret("s3cret");
        assert_eq!(settings.secret, "s3cret");
        assert_eq!(settings.jwt_lifetime_seconds, 3600);
        assert_eq!(
            settings.oauth_redirect_url,
            "http://localhost:8000/auth/google/callback"
        );
        assert!(!settings.google_configured());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let mut settings = Settings::with_secret("top-secret-value");
        settings.google_client_secret = Some("google-secret".to_string());
        let rendered = format!("{:?}", settings);
        assert!(!rendered.contains("top-secret-value"));
        assert!(!rendered.contains("google-secret"));
    }
}
