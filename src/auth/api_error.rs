//! HTTP error bodies
//!
//! Errors render as `{"detail": ...}` where the detail is an error code, a
//! code with a human-readable reason, or a plain message.

use axum::{
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::AuthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    RegisterUserAlreadyExists,
    RegisterInvalidPassword,
    LoginBadCredentials,
    ResetPasswordBadToken,
    ResetPasswordInvalidPassword,
    VerifyUserBadToken,
    VerifyUserAlreadyVerified,
    UpdateUserEmailAlreadyExists,
    UpdateUserInvalidPassword,
    OauthNotAvailableEmail,
    OauthUserAlreadyExists,
    AccessTokenDecodeError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Code(ErrorCode),
    Reason { code: ErrorCode, reason: String },
    Message(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: ErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: ErrorDetail,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: ErrorDetail) -> Self {
        Self { status, detail }
    }

    pub fn bad_request(code: ErrorCode) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorDetail::Code(code))
    }

    pub fn bad_request_reason(code: ErrorCode, reason: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            ErrorDetail::Reason {
                code,
                reason: reason.into(),
            },
        )
    }

    pub fn message(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(status, ErrorDetail::Message(message.into()))
    }

    pub fn unauthorized() -> Self {
        Self::message(StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    pub fn forbidden() -> Self {
        Self::message(StatusCode::FORBIDDEN, "Forbidden")
    }

    pub fn not_found() -> Self {
        Self::message(StatusCode::NOT_FOUND, "Not Found")
    }

    /// Log the cause and hide it from the client
    pub fn internal(error: AuthError) -> Self {
        log::error!("Internal error: {}", error);
        Self::message(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        ApiError::internal(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(ErrorResponse { detail: self.detail })).into_response();
        if self.status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_serialization() {
        let code = serde_json::to_value(ErrorDetail::Code(ErrorCode::LoginBadCredentials)).unwrap();
        assert_eq!(code, serde_json::json!("LOGIN_BAD_CREDENTIALS"));

        let reason = serde_json::to_value(ErrorDetail::Reason {
            code: ErrorCode::RegisterInvalidPassword,
            reason: "too short".to_string(),
        })
        .unwrap();
        assert_eq!(
            reason,
            serde_json::json!({"code": "REGISTER_INVALID_PASSWORD", "reason": "too short"})
        );

        let oauth = serde_json::to_value(ErrorDetail::Code(ErrorCode::OauthNotAvailableEmail)).unwrap();
        assert_eq!(oauth, serde_json::json!("OAUTH_NOT_AVAILABLE_EMAIL"));
    }

    #[test]
    fn test_unauthorized_sets_challenge_header() {
        let response = ApiError::unauthorized().into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers().get(WWW_AUTHENTICATE).unwrap(), "Bearer");
    }

    #[test]
    fn test_internal_hides_cause() {
        let error = ApiError::from(AuthError::Email("smtp down".to_string()));
        assert_eq!(error.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            error.detail,
            ErrorDetail::Message("Internal Server Error".to_string())
        );
    }
}
