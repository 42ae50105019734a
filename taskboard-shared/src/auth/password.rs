/// Password hashing and one-time credentials
///
/// Passwords are hashed with Argon2id (64 MB, 3 passes, 4 lanes) and stored
/// as PHC strings. This module also mints the random material handed out
/// when an administrator creates an account: a temporary password the user
/// signs in with, and a reset token whose SHA-256 digest is persisted.
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Corr3ct!horse")?;
/// assert!(verify_password("Corr3ct!horse", &hash)?);
/// assert!(!verify_password("wrong", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, ParamsBuilder, Version,
};
use rand::{distributions::Alphanumeric, seq::SliceRandom, Rng};
use sha2::{Digest, Sha256};

/// Length of generated temporary passwords
pub const TEMPORARY_PASSWORD_LENGTH: usize = 12;

const RESET_TOKEN_LENGTH: usize = 40;
const SPECIAL_CHARS: &[u8] = b"!@#$%*?";

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashError(String),

    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),

    #[error("Failed to verify password: {0}")]
    VerifyError(String),
}

fn argon2() -> Result<Argon2<'static>, PasswordError> {
    let params = ParamsBuilder::new()
        .m_cost(65536)
        .t_cost(3)
        .p_cost(4)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hashes `password` into a PHC string with a fresh random salt
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    argon2()?
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashError(e.to_string()))
}

/// Checks `password` against a stored PHC string
///
/// A mismatch is `Ok(false)`; only a malformed digest is an error.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(e.to_string())),
    }
}

/// Minimum strength for user-chosen passwords
///
/// At least 8 characters with an uppercase letter, a lowercase letter, a
/// digit and a non-alphanumeric character.
pub fn validate_password_strength(password: &str) -> Result<(), String> {
    if password.chars().count() < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }
    if !password.chars().any(char::is_uppercase) {
        return Err("Password must contain at least one uppercase letter".to_string());
    }
    if !password.chars().any(char::is_lowercase) {
        return Err("Password must contain at least one lowercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one digit".to_string());
    }
    if password.chars().all(char::is_alphanumeric) {
        return Err("Password must contain at least one special character".to_string());
    }

    Ok(())
}

/// Random temporary password that passes [`validate_password_strength`]
pub fn generate_temporary_password() -> String {
    let mut rng = rand::thread_rng();

    let mut chars: Vec<char> = vec![
        rng.gen_range(b'A'..=b'Z') as char,
        rng.gen_range(b'a'..=b'z') as char,
        rng.gen_range(b'0'..=b'9') as char,
        SPECIAL_CHARS[rng.gen_range(0..SPECIAL_CHARS.len())] as char,
    ];
    chars.extend(
        (&mut rng)
            .sample_iter(&Alphanumeric)
            .take(TEMPORARY_PASSWORD_LENGTH - chars.len())
            .map(char::from),
    );

    chars.shuffle(&mut rng);

    chars.into_iter().collect()
}

/// New one-time reset token and the SHA-256 hex digest to persist
pub fn generate_reset_token() -> (String, String) {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RESET_TOKEN_LENGTH)
        .map(char::from)
        .collect();
    let digest = hash_reset_token(&token);

    (token, digest)
}

/// SHA-256 hex digest of a reset token
pub fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_uses_argon2id_parameters() {
        let hash = hash_password("Some#Passw0rd").unwrap();
        assert!(hash.starts_with("$argon2id$v=19$"));
        assert!(hash.contains("m=65536,t=3,p=4"));
    }

    #[test]
    fn test_salts_differ() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn test_verify() {
        let hash = hash_password("Corr3ct!horse").unwrap();
        assert!(verify_password("Corr3ct!horse", &hash).unwrap());
        assert!(!verify_password("corr3ct!horse", &hash).unwrap());
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_verify_malformed_hash_is_error() {
        assert!(matches!(
            verify_password("x", "plaintext"),
            Err(PasswordError::InvalidHash(_))
        ));
    }

    #[test]
    fn test_strength_rules() {
        assert!(validate_password_strength("MyP@ssw0rd").is_ok());
        assert!(validate_password_strength("Sh0rt!").unwrap_err().contains("8 characters"));
        assert!(validate_password_strength("lowercase1!").unwrap_err().contains("uppercase"));
        assert!(validate_password_strength("UPPERCASE1!").unwrap_err().contains("lowercase"));
        assert!(validate_password_strength("NoDigits!!").unwrap_err().contains("digit"));
        assert!(validate_password_strength("NoSpecial12").unwrap_err().contains("special"));
    }

    #[test]
    fn test_temporary_password_is_strong() {
        for _ in 0..50 {
            let password = generate_temporary_password();
            assert_eq!(password.chars().count(), TEMPORARY_PASSWORD_LENGTH);
            assert!(validate_password_strength(&password).is_ok(), "{}", password);
        }
    }

    #[test]
    fn test_temporary_passwords_differ() {
        assert_ne!(generate_temporary_password(), generate_temporary_password());
    }

    #[test]
    fn test_reset_token_digest() {
        let (token, digest) = generate_reset_token();
        assert_eq!(token.len(), RESET_TOKEN_LENGTH);
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, hash_reset_token(&token));
        assert_ne!(digest, hash_reset_token("something else"));
    }
}
