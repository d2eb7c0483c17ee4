//! Password hashing using Argon2

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Hash a password using Argon2id
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    let argon2 = Argon2::default();
    match argon2.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Random password for accounts created through OAuth
pub fn generate_password() -> crate::error::Result<String> {
    crate::config::generate_secret()
}

/// Validate password strength
pub fn validate_password(password: &str, email: &str) -> Result<(), &'static str> {
    let length = password.chars().count();
    if length < 8 {
        return Err("Password must be at least 8 characters long");
    }
    if length > 128 {
        return Err("Password must be at most 128 characters long");
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        return Err("Password must contain at least one lowercase letter");
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        return Err("Password must contain at least one uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one digit");
    }
    if !email.is_empty() && password.to_lowercase().contains(&email.to_lowercase()) {
        return Err("Password should not contain e-mail");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let password = "SecurePassword123";
        let hash = hash_password(password).unwrap();

        assert!(verify_password(password, &hash).unwrap());
        assert!(!verify_password("WrongPassword", &hash).unwrap());
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        assert!(verify_password("whatever", "not-a-phc-string").is_err());
    }

    #[test]
    fn test_password_validation() {
        assert!(validate_password("SecurePass1", "a@b.io").is_ok());
        assert!(validate_password("short", "a@b.io").is_err());
        assert!(validate_password("nouppercase1", "a@b.io").is_err());
        assert!(validate_password("NOLOWERCASE1", "a@b.io").is_err());
        assert!(validate_password("NoDigitsHere", "a@b.io").is_err());
        assert_eq!(
            validate_password("Xx1king@example.com", "King@Example.com"),
            Err("Password should not contain e-mail")
        );
    }

    #[test]
    fn test_password_length_counts_characters() {
        // 7 characters, 11 bytes
        assert_eq!(
            validate_password("Aa1éééé", "a@b.io"),
            Err("Password must be at least 8 characters long")
        );
        // 100 characters, 197 bytes
        assert!(validate_password(&format!("Aa1{}", "é".repeat(97)), "a@b.io").is_ok());
        assert_eq!(
            validate_password(&format!("Aa1{}", "é".repeat(126)), "a@b.io"),
            Err("Password must be at most 128 characters long")
        );
    }

    #[test]
    fn test_password_classes_accept_non_ascii_letters() {
        assert!(validate_password("Ébène2024", "a@b.io").is_ok());
        assert!(validate_password("ÄÖÜSTRASSE1ß", "a@b.io").is_ok());
        assert_eq!(
            validate_password("ÄÖÜSTRASSE12", "a@b.io"),
            Err("Password must contain at least one lowercase letter")
        );
    }

    #[test]
    fn test_generated_password_is_strong_enough_to_hash() {
        let password = generate_password().unwrap();
        assert!(password.len() >= 32);
        let hash = hash_password(&password).unwrap();
        assert!(verify_password(&password, &hash).unwrap());
    }
}
