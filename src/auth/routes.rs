//! Authentication REST API routes

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use std::sync::Arc;
use uuid::Uuid;

use super::{
    api_error::{ApiError, ErrorCode},
    current_user::{CurrentActiveUser, CurrentSuperuser},
    manager::{OAuthCallbackData, UserManager},
    models::*,
    oauth::{generate_state_token, validate_state_token},
    setup::AuthState,
};
use crate::error::AuthError;

/// OAuth logins never attach to an existing password account by email
const OAUTH_ASSOCIATE_BY_EMAIL: bool = false;
/// Accounts created through OAuth still have to verify their email
const OAUTH_IS_VERIFIED_BY_DEFAULT: bool = false;

/// Create auth router: `/auth/...` and `/users/...`
pub fn auth_router(state: Arc<AuthState>) -> Router {
    let mut auth = Router::new()
        .nest("/jwt", jwt_routes())
        .merge(register_routes())
        .merge(reset_password_routes())
        .merge(verify_routes());

    if state.google.is_some() {
        auth = auth.nest("/google", oauth_routes());
    }

    Router::new()
        .nest("/auth", auth)
        .nest("/users", users_routes())
        .with_state(state)
}

pub fn jwt_routes() -> Router<Arc<AuthState>> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
}

pub fn register_routes() -> Router<Arc<AuthState>> {
    Router::new().route("/register", post(register))
}

pub fn reset_password_routes() -> Router<Arc<AuthState>> {
    Router::new()
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}

pub fn verify_routes() -> Router<Arc<AuthState>> {
    Router::new()
        .route("/request-verify-token", post(request_verify_token))
        .route("/verify", post(verify))
}

pub fn oauth_routes() -> Router<Arc<AuthState>> {
    Router::new()
        .route("/authorize", get(oauth_authorize))
        .route("/callback", get(oauth_callback))
}

pub fn users_routes() -> Router<Arc<AuthState>> {
    Router::new()
        .route("/me", get(get_me).patch(update_me))
        .route("/{id}", get(get_user).patch(update_user).delete(delete_user))
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    }
}

fn invalid_email() -> ApiError {
    ApiError::message(StatusCode::UNPROCESSABLE_ENTITY, "Invalid email format")
}

// ==================== JWT login ====================

/// POST /auth/jwt/login - OAuth2 password form
async fn login(
    State(state): State<Arc<AuthState>>,
    State(manager): State<UserManager>,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    match manager.authenticate(&form.username, &form.password)? {
        Some(user) if user.is_active => Ok(state.backend.login(&user)?),
        _ => Err(ApiError::bad_request(ErrorCode::LoginBadCredentials)),
    }
}

/// POST /auth/jwt/logout
async fn logout(
    State(state): State<Arc<AuthState>>,
    CurrentActiveUser(user): CurrentActiveUser,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let token = state
        .backend
        .transport
        .extract_token(&headers)
        .ok_or_else(ApiError::unauthorized)?;
    Ok(state.backend.logout(token, &user)?)
}

// ==================== Register ====================

/// POST /auth/register
async fn register(
    State(manager): State<UserManager>,
    Json(req): Json<UserCreate>,
) -> Result<Response, ApiError> {
    if !looks_like_email(&req.email) {
        return Err(invalid_email());
    }

    match manager.create(req, true).await {
        Ok(user) => Ok((StatusCode::CREATED, Json(UserRead::from(user))).into_response()),
        Err(AuthError::UserAlreadyExists) => {
            Err(ApiError::bad_request(ErrorCode::RegisterUserAlreadyExists))
        }
        Err(AuthError::InvalidPassword(reason)) => Err(ApiError::bad_request_reason(
            ErrorCode::RegisterInvalidPassword,
            reason,
        )),
        Err(e) => Err(ApiError::internal(e)),
    }
}

// ==================== Reset password ====================

/// POST /auth/forgot-password
///
/// Answers 202 whether or not the account exists.
async fn forgot_password(
    State(manager): State<UserManager>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Response, ApiError> {
    let accepted = MessageResponse {
        message: "email has been sent".to_string(),
    };

    let user = match manager.get_by_email(&req.email) {
        Ok(user) => user,
        Err(AuthError::UserNotExists) => {
            return Ok((StatusCode::ACCEPTED, Json(accepted)).into_response())
        }
        Err(e) => return Err(ApiError::internal(e)),
    };

    match manager.forgot_password(&user).await {
        Ok(response) => Ok((StatusCode::ACCEPTED, Json(response)).into_response()),
        Err(AuthError::UserInactive) => Ok((StatusCode::ACCEPTED, Json(accepted)).into_response()),
        Err(e) => Err(ApiError::internal(e)),
    }
}

/// POST /auth/reset-password
async fn reset_password(
    State(manager): State<UserManager>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    match manager.reset_password(&req.token, &req.password).await {
        Ok(_) => Ok(Json(MessageResponse {
            message: "Password reset successfully".to_string(),
        })),
        Err(
            AuthError::InvalidResetPasswordToken
            | AuthError::UserNotExists
            | AuthError::UserInactive,
        ) => Err(ApiError::bad_request(ErrorCode::ResetPasswordBadToken)),
        Err(AuthError::InvalidPassword(reason)) => Err(ApiError::bad_request_reason(
            ErrorCode::ResetPasswordInvalidPassword,
            reason,
        )),
        Err(e) => Err(ApiError::internal(e)),
    }
}

// ==================== Verify ====================

/// POST /auth/request-verify-token
///
/// Answers 202 for unknown, inactive and already verified accounts alike.
async fn request_verify_token(
    State(manager): State<UserManager>,
    Json(req): Json<RequestVerifyRequest>,
) -> Result<StatusCode, ApiError> {
    let user = match manager.get_by_email(&req.email) {
        Ok(user) => user,
        Err(AuthError::UserNotExists) => return Ok(StatusCode::ACCEPTED),
        Err(e) => return Err(ApiError::internal(e)),
    };

    match manager.request_verify(&user).await {
        Ok(()) | Err(AuthError::UserInactive | AuthError::UserAlreadyVerified) => {
            Ok(StatusCode::ACCEPTED)
        }
        Err(e) => Err(ApiError::internal(e)),
    }
}

/// POST /auth/verify
async fn verify(
    State(manager): State<UserManager>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<UserRead>, ApiError> {
    match manager.verify(&req.token).await {
        Ok(user) => Ok(Json(UserRead::from(user))),
        Err(AuthError::InvalidVerifyToken | AuthError::UserNotExists) => {
            Err(ApiError::bad_request(ErrorCode::VerifyUserBadToken))
        }
        Err(AuthError::UserAlreadyVerified) => {
            Err(ApiError::bad_request(ErrorCode::VerifyUserAlreadyVerified))
        }
        Err(e) => Err(ApiError::internal(e)),
    }
}

// ==================== OAuth ====================

/// GET /auth/google/authorize
async fn oauth_authorize(
    State(state): State<Arc<AuthState>>,
) -> Result<Json<OAuthAuthorizeResponse>, ApiError> {
    let client = state.google.as_ref().ok_or_else(ApiError::not_found)?;
    let oauth_state = generate_state_token(&state.settings.secret)?;

    Ok(Json(OAuthAuthorizeResponse {
        authorization_url: client.authorization_url(&oauth_state),
    }))
}

/// GET /auth/google/callback?code=...&state=...
async fn oauth_callback(
    State(state): State<Arc<AuthState>>,
    State(manager): State<UserManager>,
    Query(callback): Query<OAuthCallback>,
) -> Result<Response, ApiError> {
    let client = state.google.as_ref().ok_or_else(ApiError::not_found)?;

    if let Some(error) = callback.error {
        log::warn!("OAuth provider returned an error: {}", error);
        return Err(ApiError::message(StatusCode::BAD_REQUEST, error));
    }
    let code = callback
        .code
        .ok_or_else(|| ApiError::message(StatusCode::BAD_REQUEST, "Missing authorization code"))?;

    let oauth_state = callback
        .state
        .ok_or_else(|| ApiError::bad_request(ErrorCode::AccessTokenDecodeError))?;
    validate_state_token(&oauth_state, &state.settings.secret)
        .map_err(|_| ApiError::bad_request(ErrorCode::AccessTokenDecodeError))?;

    let token = client.get_access_token(&code).await.map_err(|e| {
        log::error!("OAuth exchange error: {}", e);
        ApiError::message(StatusCode::BAD_REQUEST, "OAuth login failed")
    })?;

    let (account_id, account_email) = client.get_id_email(&token.access_token).await.map_err(|e| {
        log::error!("OAuth user info error: {}", e);
        ApiError::message(StatusCode::BAD_REQUEST, "OAuth login failed")
    })?;
    let account_email =
        account_email.ok_or_else(|| ApiError::bad_request(ErrorCode::OauthNotAvailableEmail))?;

    let data = OAuthCallbackData {
        oauth_name: client.name(),
        token,
        account_id: &account_id,
        account_email: &account_email,
        associate_by_email: OAUTH_ASSOCIATE_BY_EMAIL,
        is_verified_by_default: OAUTH_IS_VERIFIED_BY_DEFAULT,
    };

    let user = match manager.oauth_callback(data).await {
        Ok(user) => user,
        Err(AuthError::UserAlreadyExists) => {
            return Err(ApiError::bad_request(ErrorCode::OauthUserAlreadyExists))
        }
        Err(e) => return Err(ApiError::internal(e)),
    };

    if !user.is_active {
        return Err(ApiError::bad_request(ErrorCode::LoginBadCredentials));
    }

    Ok(state.backend.login(&user)?)
}

// ==================== Users ====================

/// GET /users/me
async fn get_me(CurrentActiveUser(user): CurrentActiveUser) -> Json<UserRead> {
    Json(UserRead::from(user))
}

fn update_error(error: AuthError) -> ApiError {
    match error {
        AuthError::UserAlreadyExists => {
            ApiError::bad_request(ErrorCode::UpdateUserEmailAlreadyExists)
        }
        AuthError::InvalidPassword(reason) => {
            ApiError::bad_request_reason(ErrorCode::UpdateUserInvalidPassword, reason)
        }
        AuthError::UserNotExists => ApiError::not_found(),
        e => ApiError::internal(e),
    }
}

fn check_update_email(update: &UserUpdate) -> Result<(), ApiError> {
    match &update.email {
        Some(email) if !looks_like_email(email) => Err(invalid_email()),
        _ => Ok(()),
    }
}

/// PATCH /users/me - privilege flags in the body are ignored
async fn update_me(
    State(manager): State<UserManager>,
    CurrentActiveUser(user): CurrentActiveUser,
    Json(update): Json<UserUpdate>,
) -> Result<Json<UserRead>, ApiError> {
    check_update_email(&update)?;

    let user = manager.update(&user, update, true).await.map_err(update_error)?;
    Ok(Json(UserRead::from(user)))
}

fn find_user(manager: &UserManager, id: Uuid) -> Result<User, ApiError> {
    match manager.get(id) {
        Ok(user) => Ok(user),
        Err(AuthError::UserNotExists) => Err(ApiError::not_found()),
        Err(e) => Err(ApiError::internal(e)),
    }
}

/// GET /users/{id} - superuser only
async fn get_user(
    State(manager): State<UserManager>,
    CurrentSuperuser(_admin): CurrentSuperuser,
    Path(id): Path<Uuid>,
) -> Result<Json<UserRead>, ApiError> {
    let user = find_user(&manager, id)?;
    Ok(Json(UserRead::from(user)))
}

/// PATCH /users/{id} - superuser only, may change privilege flags
async fn update_user(
    State(manager): State<UserManager>,
    CurrentSuperuser(_admin): CurrentSuperuser,
    Path(id): Path<Uuid>,
    Json(update): Json<UserUpdate>,
) -> Result<Json<UserRead>, ApiError> {
    check_update_email(&update)?;

    let user = find_user(&manager, id)?;
    let user = manager.update(&user, update, false).await.map_err(update_error)?;
    Ok(Json(UserRead::from(user)))
}

/// DELETE /users/{id} - superuser only
async fn delete_user(
    State(manager): State<UserManager>,
    CurrentSuperuser(_admin): CurrentSuperuser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let user = find_user(&manager, id)?;
    manager.delete(&user).await.map_err(update_error)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looks_like_email() {
        assert!(looks_like_email("user@example.com"));
        assert!(!looks_like_email("user@localhost"));
        assert!(!looks_like_email("@example.com"));
        assert!(!looks_like_email("user.example.com"));
        assert!(!looks_like_email("user@example."));
    }
}
