//! Authentication backend: a transport paired with a token strategy

use axum::response::Response;

use super::jwt::JwtStrategy;
use super::models::User;
use super::transport::BearerTransport;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct AuthenticationBackend {
    pub name: String,
    pub transport: BearerTransport,
    get_strategy: fn(&str, u64) -> JwtStrategy,
    secret: String,
    lifetime_seconds: u64,
}

impl AuthenticationBackend {
    /// `get_strategy` is called with the secret and lifetime each time a
    /// strategy is needed.
    pub fn new(
        name: impl Into<String>,
        transport: BearerTransport,
        get_strategy: fn(&str, u64) -> JwtStrategy,
        secret: impl Into<String>,
        lifetime_seconds: u64,
    ) -> Self {
        Self {
            name: name.into(),
            transport,
            get_strategy,
            secret: secret.into(),
            lifetime_seconds,
        }
    }

    pub fn strategy(&self) -> JwtStrategy {
        (self.get_strategy)(&self.secret, self.lifetime_seconds)
    }

    pub fn login(&self, user: &User) -> Result<Response> {
        let token = self.strategy().write_token(user)?;
        log::info!("User {} logged in through backend {}", user.id, self.name);
        Ok(self.transport.login_response(token))
    }

    pub fn logout(&self, token: &str, user: &User) -> Result<Response> {
        self.strategy().destroy_token(token, user)?;
        Ok(self.transport.logout_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::database::AuthDatabase;
    use axum::http::StatusCode;
    use uuid::Uuid;

    #[test]
    fn test_login_issues_token_readable_by_strategy() {
        let db = AuthDatabase::in_memory().unwrap();
        let user = User {
            id: Uuid::new_v4(),
            email: "backend@example.com".to_string(),
            hashed_password: "hash".to_string(),
            is_active: true,
            is_superuser: false,
            is_verified: false,
        };
        db.create_user(&user).unwrap();

        let backend = AuthenticationBackend::new(
            "jwt",
            BearerTransport::new("auth/jwt/login"),
            |secret, lifetime| JwtStrategy::new(secret, lifetime),
            "test-secret",
            3600,
        );

        let response = backend.login(&user).unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let token = backend.strategy().write_token(&user).unwrap();
        let resolved = backend.strategy().read_token(&token, &db).unwrap();
        assert_eq!(resolved.map(|u| u.id), Some(user.id));

        let response = backend.logout(&token, &user).unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
