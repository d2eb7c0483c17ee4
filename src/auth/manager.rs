//! User manager: the lifecycle of user accounts and their hooks
//!
//! Registration, authentication, password reset, email verification, profile
//! updates and OAuth account linking all go through [`UserManager`]. After the
//! relevant steps it fires the hooks `on_after_register`,
//! `on_after_forgot_password` and `on_after_request_verify`. Hooks only log and
//! send mail; their failures are logged and never abort the flow.

use std::sync::Arc;
use uuid::Uuid;

use super::database::AuthDatabase;
use super::email::EmailSender;
use super::jwt::{
    claims_for, decode_jwt, generate_jwt, RESET_PASSWORD_AUDIENCE, VERIFY_AUDIENCE,
};
use super::models::{MessageResponse, OAuthAccount, OAuthToken, User, UserCreate, UserUpdate};
use super::password::{generate_password, hash_password, validate_password, verify_password};
use crate::config::DEFAULT_TOKEN_LIFETIME_SECONDS;
use crate::error::{AuthError, Result};

/// A concurrent writer claimed the email between the lookup and the write
fn email_taken(error: rusqlite::Error) -> AuthError {
    match error.sqlite_error_code() {
        Some(rusqlite::ErrorCode::ConstraintViolation) => AuthError::UserAlreadyExists,
        _ => AuthError::Database(error),
    }
}

/// Linked-account details handed over by an OAuth callback
#[derive(Debug, Clone)]
pub struct OAuthCallbackData<'a> {
    pub oauth_name: &'a str,
    pub token: OAuthToken,
    pub account_id: &'a str,
    pub account_email: &'a str,
    /// Link to an existing user with the same email instead of refusing
    pub associate_by_email: bool,
    /// New users start out verified
    pub is_verified_by_default: bool,
}

#[derive(Clone)]
pub struct UserManager {
    db: AuthDatabase,
    email: Arc<EmailSender>,
    reset_password_token_secret: String,
    reset_password_token_lifetime_seconds: u64,
    verification_token_secret: String,
    verification_token_lifetime_seconds: u64,
}

impl UserManager {
    pub fn new(db: AuthDatabase, email: Arc<EmailSender>, secret: &str) -> Self {
        Self {
            db,
            email,
            reset_password_token_secret: secret.to_string(),
            reset_password_token_lifetime_seconds: DEFAULT_TOKEN_LIFETIME_SECONDS,
            verification_token_secret: secret.to_string(),
            verification_token_lifetime_seconds: DEFAULT_TOKEN_LIFETIME_SECONDS,
        }
    }

    pub fn db(&self) -> &AuthDatabase {
        &self.db
    }

    // ==================== Lookups ====================

    pub fn get(&self, id: Uuid) -> Result<User> {
        self.db.get_user(id)?.ok_or(AuthError::UserNotExists)
    }

    pub fn get_by_email(&self, email: &str) -> Result<User> {
        self.db
            .get_user_by_email(email)?
            .ok_or(AuthError::UserNotExists)
    }

    pub fn get_by_oauth_account(&self, oauth_name: &str, account_id: &str) -> Result<User> {
        self.db
            .get_user_by_oauth_account(oauth_name, account_id)?
            .ok_or(AuthError::UserNotExists)
    }

    // ==================== Registration & login ====================

    /// Create a user.
    ///
    /// With `safe` the privilege flags of the payload are ignored, which is
    /// what the public register route wants.
    pub async fn create(&self, user_create: UserCreate, safe: bool) -> Result<User> {
        self.validate_password(&user_create.password, &user_create.email)?;

        if self.db.get_user_by_email(&user_create.email)?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }

        let (is_active, is_superuser, is_verified) = if safe {
            (true, false, false)
        } else {
            (
                user_create.is_active.unwrap_or(true),
                user_create.is_superuser.unwrap_or(false),
                user_create.is_verified.unwrap_or(false),
            )
        };

        let user = User {
            id: Uuid::new_v4(),
            email: user_create.email,
            hashed_password: hash_password(&user_create.password)?,
            is_active,
            is_superuser,
            is_verified,
        };
        self.db.create_user(&user).map_err(email_taken)?;

        self.on_after_register(&user).await;
        Ok(user)
    }

    /// Check credentials; `Ok(None)` on unknown email or wrong password
    pub fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>> {
        let user = match self.db.get_user_by_email(email)? {
            Some(user) => user,
            None => {
                // Spend the same time as a real verification.
                let _ = hash_password(password);
                return Ok(None);
            }
        };

        if verify_password(password, &user.hashed_password)? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    fn validate_password(&self, password: &str, email: &str) -> Result<()> {
        validate_password(password, email).map_err(|reason| AuthError::InvalidPassword(reason.to_string()))
    }

    // ==================== Password reset ====================

    /// Issue a reset token and fire `on_after_forgot_password`
    pub async fn forgot_password(&self, user: &User) -> Result<MessageResponse> {
        if !user.is_active {
            return Err(AuthError::UserInactive);
        }

        let mut claims = claims_for(
            user.id.to_string(),
            RESET_PASSWORD_AUDIENCE,
            self.reset_password_token_lifetime_seconds,
        );
        claims.password_fgpt = Some(hash_password(&user.hashed_password)?);
        let token = generate_jwt(&claims, &self.reset_password_token_secret)?;

        Ok(self.on_after_forgot_password(user, &token).await)
    }

    /// Set a new password from a reset token.
    ///
    /// The token embeds a fingerprint of the password hash it was issued
    /// against, so it stops working once the password changed.
    pub async fn reset_password(&self, token: &str, password: &str) -> Result<User> {
        let claims = decode_jwt(token, &self.reset_password_token_secret, RESET_PASSWORD_AUDIENCE)
            .map_err(|_| AuthError::InvalidResetPasswordToken)?;

        let user_id =
            Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidResetPasswordToken)?;
        let mut user = match self.get(user_id) {
            Ok(user) => user,
            Err(AuthError::UserNotExists) => return Err(AuthError::InvalidResetPasswordToken),
            Err(e) => return Err(e),
        };

        let fingerprint = claims
            .password_fgpt
            .ok_or(AuthError::InvalidResetPasswordToken)?;
        let fingerprint_matches =
            verify_password(&user.hashed_password, &fingerprint).unwrap_or(false);
        if !fingerprint_matches {
            return Err(AuthError::InvalidResetPasswordToken);
        }

        if !user.is_active {
            return Err(AuthError::UserInactive);
        }

        self.validate_password(password, &user.email)?;
        user.hashed_password = hash_password(password)?;
        self.db.update_user(&user)?;

        log::info!("User {} has reset their password.", user.id);
        Ok(user)
    }

    // ==================== Email verification ====================

    /// Issue a verification token and fire `on_after_request_verify`
    pub async fn request_verify(&self, user: &User) -> Result<()> {
        if !user.is_active {
            return Err(AuthError::UserInactive);
        }
        if user.is_verified {
            return Err(AuthError::UserAlreadyVerified);
        }

        let mut claims = claims_for(
            user.id.to_string(),
            VERIFY_AUDIENCE,
            self.verification_token_lifetime_seconds,
        );
        claims.email = Some(user.email.clone());
        let token = generate_jwt(&claims, &self.verification_token_secret)?;

        self.on_after_request_verify(user, &token).await;
        Ok(())
    }

    pub async fn verify(&self, token: &str) -> Result<User> {
        let claims = decode_jwt(token, &self.verification_token_secret, VERIFY_AUDIENCE)
            .map_err(|_| AuthError::InvalidVerifyToken)?;

        let email = claims.email.ok_or(AuthError::InvalidVerifyToken)?;
        let mut user = match self.get_by_email(&email) {
            Ok(user) => user,
            Err(AuthError::UserNotExists) => return Err(AuthError::InvalidVerifyToken),
            Err(e) => return Err(e),
        };

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidVerifyToken)?;
        if user_id != user.id {
            return Err(AuthError::InvalidVerifyToken);
        }

        if user.is_verified {
            return Err(AuthError::UserAlreadyVerified);
        }

        user.is_verified = true;
        self.db.update_user(&user)?;
        log::info!("User {} has been verified.", user.id);
        Ok(user)
    }

    // ==================== Profile ====================

    /// Apply an update.
    ///
    /// With `safe` the privilege flags are ignored. Changing the email resets
    /// the verification flag.
    pub async fn update(&self, user: &User, update: UserUpdate, safe: bool) -> Result<User> {
        let mut updated = user.clone();

        if let Some(email) = update.email {
            if !email.eq_ignore_ascii_case(&user.email) {
                if self.db.get_user_by_email(&email)?.is_some() {
                    return Err(AuthError::UserAlreadyExists);
                }
                updated.is_verified = false;
            }
            updated.email = email;
        }

        if let Some(password) = update.password {
            self.validate_password(&password, &updated.email)?;
            updated.hashed_password = hash_password(&password)?;
        }

        if !safe {
            if let Some(is_active) = update.is_active {
                updated.is_active = is_active;
            }
            if let Some(is_superuser) = update.is_superuser {
                updated.is_superuser = is_superuser;
            }
            if let Some(is_verified) = update.is_verified {
                updated.is_verified = is_verified;
            }
        }

        if !self.db.update_user(&updated).map_err(email_taken)? {
            return Err(AuthError::UserNotExists);
        }
        Ok(updated)
    }

    pub async fn delete(&self, user: &User) -> Result<()> {
        if !self.db.delete_user(user.id)? {
            return Err(AuthError::UserNotExists);
        }
        log::info!("User {} has been deleted.", user.id);
        Ok(())
    }

    // ==================== OAuth ====================

    /// Resolve the user behind an OAuth login, creating or linking as needed
    pub async fn oauth_callback(&self, data: OAuthCallbackData<'_>) -> Result<User> {
        let account = OAuthAccount {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            oauth_name: data.oauth_name.to_string(),
            access_token: data.token.access_token.clone(),
            expires_at: data.token.expires_at,
            refresh_token: data.token.refresh_token.clone(),
            account_id: data.account_id.to_string(),
            account_email: data.account_email.to_string(),
        };

        if let Some(user) = self
            .db
            .get_user_by_oauth_account(data.oauth_name, data.account_id)?
        {
            self.db.update_oauth_account(&account)?;
            return Ok(user);
        }

        if let Some(user) = self.db.get_user_by_email(data.account_email)? {
            if !data.associate_by_email {
                return Err(AuthError::UserAlreadyExists);
            }
            self.db.add_oauth_account(&OAuthAccount {
                user_id: user.id,
                ..account
            })?;
            log::info!("Linked {} account to user {}", data.oauth_name, user.id);
            return Ok(user);
        }

        let user = User {
            id: Uuid::new_v4(),
            email: data.account_email.to_string(),
            hashed_password: hash_password(&generate_password()?)?,
            is_active: true,
            is_superuser: false,
            is_verified: data.is_verified_by_default,
        };
        self.db.create_user(&user).map_err(email_taken)?;
        self.db.add_oauth_account(&OAuthAccount {
            user_id: user.id,
            ..account
        })?;

        self.on_after_register(&user).await;
        Ok(user)
    }

    // ==================== Hooks ====================

    pub async fn on_after_register(&self, user: &User) {
        log::info!("User {} has registered.", user.id);
    }

    /// Logs, mails the reset link and builds the response body
    pub async fn on_after_forgot_password(&self, user: &User, token: &str) -> MessageResponse {
        log::info!(
            "User {} has forgot their password. Reset token: {}",
            user.id,
            token
        );

        if let Err(e) = self.email.send_password_reset_email(&user.email, token).await {
            log::error!("Failed to send reset email to user {}: {}", user.id, e);
        }

        MessageResponse {
            message: "email has been sent".to_string(),
        }
    }

    pub async fn on_after_request_verify(&self, user: &User, token: &str) {
        log::info!(
            "Verification requested for user {}. Verification token: {}",
            user.id,
            token
        );

        if let Err(e) = self.email.send_verification_email(&user.email, token).await {
            log::error!("Failed to send verification email to user {}: {}", user.id, e);
        }
    }
}
