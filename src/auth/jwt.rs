//! JWT token handling

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use super::database::AuthDatabase;
use super::models::{Claims, User};
use crate::error::Result;

/// Audience of access tokens issued by [`JwtStrategy`]
pub const AUTH_AUDIENCE: &str = "fastapi-users:auth";
/// Audience of password reset tokens
pub const RESET_PASSWORD_AUDIENCE: &str = "fastapi-users:reset";
/// Audience of email verification tokens
pub const VERIFY_AUDIENCE: &str = "fastapi-users:verify";
/// Audience of OAuth state parameters
pub const OAUTH_STATE_AUDIENCE: &str = "fastapi-users:oauth-state";

/// Seconds since the unix epoch
pub fn now_timestamp() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

/// Build claims for `sub` valid for `lifetime_seconds` from now
pub fn claims_for(sub: impl Into<String>, audience: &str, lifetime_seconds: u64) -> Claims {
    Claims {
        sub: sub.into(),
        aud: vec![audience.to_string()],
        exp: now_timestamp() + lifetime_seconds,
        email: None,
        password_fgpt: None,
    }
}

/// Sign claims with HS256
pub fn generate_jwt(claims: &Claims, secret: &str) -> Result<String> {
    let token = encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

/// Verify signature, expiry and audience, returning the claims
pub fn decode_jwt(token: &str, secret: &str, audience: &str) -> Result<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[audience]);

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

/// Stateless access-token strategy
#[derive(Clone)]
pub struct JwtStrategy {
    secret: String,
    lifetime_seconds: u64,
    audience: String,
}

impl JwtStrategy {
    pub fn new(secret: impl Into<String>, lifetime_seconds: u64) -> Self {
        Self {
            secret: secret.into(),
            lifetime_seconds,
            audience: AUTH_AUDIENCE.to_string(),
        }
    }

    pub fn lifetime_seconds(&self) -> u64 {
        self.lifetime_seconds
    }

    /// Issue an access token for a user
    pub fn write_token(&self, user: &User) -> Result<String> {
        let claims = claims_for(user.id.to_string(), &self.audience, self.lifetime_seconds);
        generate_jwt(&claims, &self.secret)
    }

    /// Resolve a token to its user.
    ///
    /// Bad signatures, expired tokens, foreign audiences and unknown users all
    /// come back as `Ok(None)`; only storage failures are errors.
    pub fn read_token(&self, token: &str, db: &AuthDatabase) -> Result<Option<User>> {
        let claims = match decode_jwt(token, &self.secret, &self.audience) {
            Ok(claims) => claims,
            Err(e) => {
                log::debug!("Rejected access token: {}", e);
                return Ok(None);
            }
        };

        let user_id = match Uuid::parse_str(&claims.sub) {
            Ok(id) => id,
            Err(_) => return Ok(None),
        };

        Ok(db.get_user(user_id)?)
    }

    /// JWTs cannot be revoked server-side
    pub fn destroy_token(&self, _token: &str, _user: &User) -> Result<()> {
        Ok(())
    }
}

impl std::fmt::Debug for JwtStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtStrategy")
            .field("lifetime_seconds", &self.lifetime_seconds)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}
