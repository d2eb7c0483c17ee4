//! Google OAuth2 client

use oauth2::{
    basic::BasicClient, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use reqwest::Client as HttpClient;
use serde::Deserialize;

use super::jwt::{claims_for, decode_jwt, generate_jwt, now_timestamp, OAUTH_STATE_AUDIENCE};
use super::models::OAuthToken;
use crate::error::{AuthError, Result};

const GOOGLE_AUTHORIZE_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
const GOOGLE_SCOPES: [&str; 3] = ["openid", "email", "profile"];

/// Lifetime of the signed `state` parameter
pub const STATE_TOKEN_LIFETIME_SECONDS: u64 = 3600;

type GoogleBasicClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// OAuth2 client for Google sign-in
#[derive(Clone)]
pub struct GoogleOAuth2 {
    client: GoogleBasicClient,
    http_client: HttpClient,
}

impl std::fmt::Debug for GoogleOAuth2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleOAuth2")
            .field("client_id", self.client.client_id())
            .field("client_secret", &"<redacted>")
            .field("redirect_url", &self.client.redirect_uri().map(|u| u.as_str()))
            .finish()
    }
}

impl GoogleOAuth2 {
    /// Name under which linked accounts are stored
    pub const NAME: &'static str = "google";

    pub fn new(client_id: &str, client_secret: &str, redirect_url: &str) -> Result<Self> {
        let client = BasicClient::new(ClientId::new(client_id.to_string()))
            .set_client_secret(ClientSecret::new(client_secret.to_string()))
            .set_auth_uri(AuthUrl::new(GOOGLE_AUTHORIZE_ENDPOINT.to_string()).map_err(oauth_error)?)
            .set_token_uri(TokenUrl::new(GOOGLE_TOKEN_ENDPOINT.to_string()).map_err(oauth_error)?)
            .set_redirect_uri(RedirectUrl::new(redirect_url.to_string()).map_err(oauth_error)?);

        // Following redirects during the token exchange opens an SSRF hole.
        let http_client = HttpClient::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(oauth_error)?;

        Ok(Self {
            client,
            http_client,
        })
    }

    pub fn name(&self) -> &'static str {
        Self::NAME
    }

    /// URL the user is sent to, carrying `state` back to the callback
    pub fn authorization_url(&self, state: &str) -> String {
        let state = state.to_string();
        let mut request = self.client.authorize_url(move || CsrfToken::new(state));
        for scope in GOOGLE_SCOPES {
            request = request.add_scope(Scope::new(scope.to_string()));
        }
        let (url, _csrf_token) = request.url();
        url.to_string()
    }

    /// Exchange an authorization code for tokens
    pub async fn get_access_token(&self, code: &str) -> Result<OAuthToken> {
        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http_client)
            .await
            .map_err(|e| AuthError::OAuth(format!("Token exchange failed: {}", e)))?;

        Ok(OAuthToken {
            access_token: token.access_token().secret().clone(),
            expires_at: token
                .expires_in()
                .map(|lifetime| (now_timestamp() + lifetime.as_secs()) as i64),
            refresh_token: token.refresh_token().map(|t| t.secret().clone()),
        })
    }

    /// Google account id and email for an access token
    pub async fn get_id_email(&self, access_token: &str) -> Result<(String, Option<String>)> {
        #[derive(Deserialize)]
        struct GoogleUser {
            id: String,
            email: Option<String>,
        }

        let response = self
            .http_client
            .get(GOOGLE_USERINFO_ENDPOINT)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::OAuth(format!("Failed to fetch Google user info: {}", e)))?
            .error_for_status()
            .map_err(|e| AuthError::OAuth(format!("Google user info rejected: {}", e)))?;

        let user: GoogleUser = response
            .json()
            .await
            .map_err(|e| AuthError::OAuth(format!("Failed to parse Google user info: {}", e)))?;

        Ok((user.id, user.email))
    }
}

fn oauth_error(e: impl std::fmt::Display) -> AuthError {
    AuthError::OAuth(e.to_string())
}

/// Signed, short-lived `state` parameter
pub fn generate_state_token(secret: &str) -> Result<String> {
    let claims = claims_for("", OAUTH_STATE_AUDIENCE, STATE_TOKEN_LIFETIME_SECONDS);
    generate_jwt(&claims, secret)
}

pub fn validate_state_token(state: &str, secret: &str) -> Result<()> {
    decode_jwt(state, secret, OAUTH_STATE_AUDIENCE)
        .map(|_| ())
        .map_err(|_| AuthError::InvalidOAuthState)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_authorization_url_carries_state_and_scopes() {
        let client = GoogleOAuth2::new(
            "client-id",
            "client-secret",
            "http://localhost:8000/auth/google/callback",
        )
        .unwrap();

        let url = client.authorization_url("state-123");
        assert!(url.starts_with(GOOGLE_AUTHORIZE_ENDPOINT));
        assert!(url.contains("client_id=client-id"));
        assert!(url.contains("state=state-123"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=openid+email+profile"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8000%2Fauth%2Fgoogle%2Fcallback"));
        assert_eq!(client.name(), "google");
    }

    #[test]
    fn test_debug_hides_client_secret() {
        let client = GoogleOAuth2::new(
            "client-id",
            "very-secret-value",
            "http://localhost:8000/auth/google/callback",
        )
        .unwrap();

        let debug = format!("{:?}", client);
        assert!(debug.contains("client-id"));
        assert!(!debug.contains("very-secret-value"));
    }

    #[test]
    fn test_invalid_redirect_url() {
        assert_matches!(
            GoogleOAuth2::new("id", "secret", "not a url"),
            Err(AuthError::OAuth(_))
        );
    }

    #[test]
    fn test_state_token_round_trip() {
        let state = generate_state_token("secret").unwrap();
        assert!(validate_state_token(&state, "secret").is_ok());
        assert_matches!(
            validate_state_token(&state, "other-secret"),
            Err(AuthError::InvalidOAuthState)
        );
        assert_matches!(
            validate_state_token("garbage", "secret"),
            Err(AuthError::InvalidOAuthState)
        );
    }
}
