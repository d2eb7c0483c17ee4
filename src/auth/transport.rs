//! Bearer token transport
//!
//! Reads the credential from the `Authorization` header and shapes the login
//! and logout responses.

use axum::{
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use super::models::BearerResponse;

#[derive(Debug, Clone)]
pub struct BearerTransport {
    token_url: String,
}

impl BearerTransport {
    pub fn new(token_url: impl Into<String>) -> Self {
        Self {
            token_url: token_url.into(),
        }
    }

    /// Relative URL clients post credentials to
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Token from an `Authorization: Bearer <token>` header; scheme is case-insensitive
    pub fn extract_token<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
        let (scheme, token) = value.split_once(' ')?;
        let token = token.trim();
        if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
            Some(token)
        } else {
            None
        }
    }

    pub fn login_response(&self, token: String) -> Response {
        Json(BearerResponse {
            access_token: token,
            token_type: "bearer".to_string(),
        })
        .into_response()
    }

    pub fn logout_response(&self) -> Response {
        StatusCode::NO_CONTENT.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_extract_token_valid() {
        let transport = BearerTransport::new("auth/jwt/login");
        assert_eq!(transport.extract_token(&headers("Bearer abc.def")), Some("abc.def"));
        assert_eq!(transport.extract_token(&headers("bearer abc.def")), Some("abc.def"));
    }

    #[test]
    fn test_extract_token_rejects_other_schemes() {
        let transport = BearerTransport::new("auth/jwt/login");
        assert!(transport.extract_token(&headers("Basic dXNlcjpwYXNz")).is_none());
        assert!(transport.extract_token(&headers("Bearer ")).is_none());
        assert!(transport.extract_token(&headers("Bearer")).is_none());
        assert!(transport.extract_token(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_responses() {
        let transport = BearerTransport::new("auth/jwt/login");
        assert_eq!(transport.token_url(), "auth/jwt/login");
        assert_eq!(transport.login_response("t".to_string()).status(), StatusCode::OK);
        assert_eq!(transport.logout_response().status(), StatusCode::NO_CONTENT);
    }
}
