//! Request extractors resolving the bearer token to a user

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::sync::Arc;

use super::api_error::ApiError;
use super::models::User;
use super::setup::AuthState;

/// Requirements a resolved user must meet
#[derive(Debug, Clone, Copy, Default)]
pub struct UserRequirements {
    pub active: bool,
    pub verified: bool,
    pub superuser: bool,
}

/// Resolve the request's bearer token to a user.
///
/// Missing or invalid tokens and inactive users (when `active` is required)
/// give 401; unverified users and non-superusers give 403.
pub fn current_user(
    parts: &Parts,
    state: &AuthState,
    requirements: UserRequirements,
) -> Result<User, ApiError> {
    let token = state
        .backend
        .transport
        .extract_token(&parts.headers)
        .ok_or_else(ApiError::unauthorized)?;

    let user = state
        .backend
        .strategy()
        .read_token(token, &state.db)?
        .ok_or_else(ApiError::unauthorized)?;

    if requirements.active && !user.is_active {
        return Err(ApiError::unauthorized());
    }
    if requirements.verified && !user.is_verified {
        return Err(ApiError::forbidden());
    }
    if requirements.superuser && !user.is_superuser {
        return Err(ApiError::forbidden());
    }
    Ok(user)
}

/// Any authenticated user, active or not
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// An authenticated, active user
#[derive(Debug, Clone)]
pub struct CurrentActiveUser(pub User);

/// An authenticated, active superuser
#[derive(Debug, Clone)]
pub struct CurrentSuperuser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    Arc<AuthState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = Arc::<AuthState>::from_ref(state);
        current_user(parts, &auth, UserRequirements::default()).map(CurrentUser)
    }
}

impl<S> FromRequestParts<S> for CurrentActiveUser
where
    Arc<AuthState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = Arc::<AuthState>::from_ref(state);
        let requirements = UserRequirements {
            active: true,
            ..Default::default()
        };
        current_user(parts, &auth, requirements).map(CurrentActiveUser)
    }
}

impl<S> FromRequestParts<S> for CurrentSuperuser
where
    Arc<AuthState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = Arc::<AuthState>::from_ref(state);
        let requirements = UserRequirements {
            active: true,
            superuser: true,
            ..Default::default()
        };
        current_user(parts, &auth, requirements).map(CurrentSuperuser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{database::AuthDatabase, email::EmailSender, UserUpdate};
    use crate::config::Settings;
    use axum::http::{header::AUTHORIZATION, Request, StatusCode};

    fn state() -> AuthState {
        AuthState::with_parts(
            Settings::with_secret("secret"),
            AuthDatabase::in_memory().unwrap(),
            EmailSender::mock("http://app.test"),
        )
        .unwrap()
    }

    fn parts_with(token: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/users/me");
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(()).unwrap().into_parts().0
    }

    async fn user_with_token(state: &AuthState, update: UserUpdate) -> (User, String) {
        let manager = state.user_manager();
        let user = manager
            .create(crate::auth::UserCreate::new("me@example.com", "SecurePass1"), true)
            .await
            .unwrap();
        let user = manager.update(&user, update, false).await.unwrap();
        let token = state.backend.strategy().write_token(&user).unwrap();
        (user, token)
    }

    #[tokio::test]
    async fn test_missing_and_invalid_tokens() {
        let state = state();
        let err = current_user(&parts_with(None), &state, UserRequirements::default()).unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);

        let err = current_user(&parts_with(Some("bogus")), &state, UserRequirements::default())
            .unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_active_requirement() {
        let state = state();
        let inactive = UserUpdate {
            is_active: Some(false),
            ..Default::default()
        };
        let (user, token) = user_with_token(&state, inactive).await;
        let parts = parts_with(Some(&token));

        let any = current_user(&parts, &state, UserRequirements::default()).unwrap();
        assert_eq!(any.id, user.id);

        let active = UserRequirements {
            active: true,
            ..Default::default()
        };
        let err = current_user(&parts, &state, active).unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_verified_and_superuser_requirements() {
        let state = state();
        let (_, token) = user_with_token(&state, UserUpdate::default()).await;
        let parts = parts_with(Some(&token));

        let verified = UserRequirements {
            active: true,
            verified: true,
            ..Default::default()
        };
        assert_eq!(
            current_user(&parts, &state, verified).unwrap_err().status,
            StatusCode::FORBIDDEN
        );

        let superuser = UserRequirements {
            active: true,
            superuser: true,
            ..Default::default()
        };
        assert_eq!(
            current_user(&parts, &state, superuser).unwrap_err().status,
            StatusCode::FORBIDDEN
        );
    }
}
