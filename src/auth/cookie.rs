use axum_extra::extract::cookie::{Cookie, SameSite};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Generate a secure random session token (64 hex characters)
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// The session secret could not key the cookie MAC
#[derive(Debug, thiserror::Error)]
#[error("Session secret cannot be used as an HMAC key")]
pub struct InvalidSecret;

/// Signs session tokens for the cookie and checks them on the way back in.
///
/// Cookie value format: `<token>.<hex hmac-sha256(token)>`.
#[derive(Clone)]
pub struct CookieSigner {
    mac: HmacSha256,
}

impl CookieSigner {
    pub fn new(secret: &[u8]) -> Result<Self, InvalidSecret> {
        let mac = HmacSha256::new_from_slice(secret).map_err(|_| InvalidSecret)?;
        Ok(Self { mac })
    }

    pub fn sign(&self, token: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(token.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        format!("{}.{}", token, signature)
    }

    /// Returns the token if the signature matches. Comparison is constant time.
    pub fn verify<'a>(&self, value: &'a str) -> Option<&'a str> {
        let (token, signature) = value.rsplit_once('.')?;
        let signature = hex::decode(signature).ok()?;

        let mut mac = self.mac.clone();
        mac.update(token.as_bytes());
        mac.verify_slice(&signature).ok()?;

        Some(token)
    }
}

/// Attributes of the session cookie
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub secure: bool,
    pub max_age_seconds: u64,
}

impl CookieSettings {
    /// Cookie carrying a signed session token, valid for one full window
    pub fn issue(&self, value: String) -> Cookie<'static> {
        let max_age = i64::try_from(self.max_age_seconds).unwrap_or(i64::MAX);

        Cookie::build((self.name.clone(), value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(time::Duration::seconds(max_age))
            .build()
    }

    /// Cookie instructing the client to drop its token
    pub fn removal(&self) -> Cookie<'static> {
        let mut cookie = Cookie::build((self.name.clone(), ""))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .build();
        cookie.make_removal();
        cookie
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_token_format() {
        let token = generate_session_token();

        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_session_token());
    }

    #[test]
    fn test_sign_and_verify() {
        let signer = CookieSigner::new(b"a-long-enough-session-secret").unwrap();
        let value = signer.sign("abc123");

        assert!(value.starts_with("abc123."));
        assert_eq!(signer.verify(&value), Some("abc123"));
    }

    #[test]
    fn test_tampered_values_are_rejected() {
        let signer = CookieSigner::new(b"a-long-enough-session-secret").unwrap();
        let value = signer.sign("abc123");
        let (_, signature) = value.rsplit_once('.').unwrap();

        assert_eq!(signer.verify(&format!("abc124.{}", signature)), None);
        assert_eq!(signer.verify("abc123"), None);
        assert_eq!(signer.verify("abc123.zz"), None);
        assert_eq!(signer.verify(""), None);
    }

    #[test]
    fn test_other_secret_is_rejected() {
        let signer = CookieSigner::new(b"first-session-secret").unwrap();
        let other = CookieSigner::new(b"second-session-secret").unwrap();

        assert_eq!(other.verify(&signer.sign("abc123")), None);
    }

    #[test]
    fn test_cookie_attributes() {
        let settings = CookieSettings {
            name: "sid".to_string(),
            secure: false,
            max_age_seconds: 3600,
        };

        let issued = settings.issue("token.sig".to_string()).to_string();
        assert!(issued.starts_with("sid=token.sig"));
        assert!(issued.contains("HttpOnly"));
        assert!(issued.contains("Max-Age=3600"));

        let removal = settings.removal().to_string();
        assert!(removal.starts_with("sid=;"));
        assert!(removal.contains("Max-Age=0"));
    }
}
