//! Error types shared by the user manager, strategies and routes

/// Errors raised by the authentication layer.
///
/// Routes translate these into the error codes clients see; the variants
/// themselves carry no HTTP semantics.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("user already exists")]
    UserAlreadyExists,

    #[error("user does not exist")]
    UserNotExists,

    #[error("user is inactive")]
    UserInactive,

    #[error("user is already verified")]
    UserAlreadyVerified,

    #[error("invalid verification token")]
    InvalidVerifyToken,

    #[error("invalid reset password token")]
    InvalidResetPasswordToken,

    #[error("invalid password: {0}")]
    InvalidPassword(String),

    #[error("invalid OAuth state")]
    InvalidOAuthState,

    #[error("OAuth provider did not return an email")]
    OAuthEmailUnavailable,

    #[error("OAuth error: {0}")]
    OAuth(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Email error: {0}")]
    Email(String),

    #[error("OS random source failed: {0}")]
    Random(String),
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(e: argon2::password_hash::Error) -> Self {
        AuthError::PasswordHash(e.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AuthError>;
