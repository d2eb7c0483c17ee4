//! Integration tests for the user_auth library public API

use user_auth::{
    auth::{get_jwt_strategy, AuthDatabase},
    servers::WebServerConfig,
    AuthError, Result, DESCRIPTION, NAME, VERSION,
};

#[test]
fn test_library_metadata() {
    assert!(!VERSION.is_empty());
    assert_eq!(NAME, "user_auth");
    assert!(!DESCRIPTION.is_empty());
}

#[test]
fn test_error_types() {
    let inactive = AuthError::UserInactive;
    assert!(matches!(inactive, AuthError::UserInactive));

    let password = AuthError::InvalidPassword("too short".to_string());
    assert_eq!(password.to_string(), "invalid password: too short");

    let db_error: AuthError = rusqlite_error().into();
    assert!(matches!(db_error, AuthError::Database(_)));
}

fn rusqlite_error() -> rusqlite::Error {
    rusqlite::Error::QueryReturnedNoRows
}

#[test]
fn test_result_type_alias() {
    let success: Result<i32> = Ok(42);
    assert_eq!(success.unwrap(), 42);

    let failure: Result<i32> = Err(AuthError::UserNotExists);
    assert!(failure.is_err());
}

#[test]
fn test_server_config_default() {
    let web_config = WebServerConfig::default();
    assert_eq!(web_config.port, 8000);
    assert_eq!(web_config.host, "0.0.0.0");
}

#[test]
fn test_jwt_strategy_factory() {
    let strategy = get_jwt_strategy("secret", 3600);
    assert_eq!(strategy.lifetime_seconds(), 3600);

    let db = AuthDatabase::in_memory().unwrap();
    assert!(strategy.read_token("garbage", &db).unwrap().is_none());
}
