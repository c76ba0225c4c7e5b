use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::sync::OnceLock;

/// Hash a password using Argon2id with a fresh random salt.
/// The work factor is the argon2 crate default and never varies per call.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| PasswordError::HashingFailed)
}

/// Verify a password against a stored PHC-format hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHash)?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// [`hash_password`] on the blocking pool
pub async fn hash_password_blocking(password: String) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| PasswordError::WorkerFailed(e.to_string()))?
}

/// [`verify_password`] on the blocking pool
pub async fn verify_password_blocking(password: String, hash: String) -> Result<bool, PasswordError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| PasswordError::WorkerFailed(e.to_string()))?
}

/// Burn the same verification cost as a real login when the username does
/// not exist. Always answers `false`.
pub async fn verify_unknown_user(password: String) -> Result<bool, PasswordError> {
    tokio::task::spawn_blocking(move || {
        let hash = dummy_hash()?;
        verify_password(&password, hash).map(|_| false)
    })
    .await
    .map_err(|e| PasswordError::WorkerFailed(e.to_string()))?
}

fn dummy_hash() -> Result<&'static str, PasswordError> {
    static DUMMY: OnceLock<String> = OnceLock::new();

    if let Some(hash) = DUMMY.get() {
        return Ok(hash.as_str());
    }
    let hash = hash_password(&crate::auth::generate_session_token())?;
    Ok(DUMMY.get_or_init(|| hash).as_str())
}

/// Password errors
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Password hashing failed")]
    HashingFailed,
    #[error("Invalid hash format")]
    InvalidHash,
    #[error("Password worker failed: {0}")]
    WorkerFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_never_contains_plaintext() {
        let hash = hash_password("pw1-plaintext").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("pw1-plaintext"));
        assert!(verify_password("pw1-plaintext", &hash).unwrap());
        assert!(!verify_password("pw1", &hash).unwrap());
    }

    #[test]
    fn test_salts_differ() {
        let hash1 = hash_password("same_password").unwrap();
        let hash2 = hash_password("same_password").unwrap();

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        assert!(matches!(
            verify_password("pw", "not-a-phc-string"),
            Err(PasswordError::InvalidHash)
        ));
    }

    #[tokio::test]
    async fn test_blocking_helpers_round_trip() {
        let hash = hash_password_blocking("hunter2".to_string()).await.unwrap();

        assert!(verify_password_blocking("hunter2".to_string(), hash.clone())
            .await
            .unwrap());
        assert!(!verify_password_blocking("hunter3".to_string(), hash)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_unknown_user_never_verifies() {
        assert!(!verify_unknown_user(String::new()).await.unwrap());
        assert!(!verify_unknown_user("anything".to_string()).await.unwrap());
    }
}
