use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::auth::guard::AuthenticatedUser;
use crate::auth::password::{hash_password_blocking, verify_password_blocking, verify_unknown_user};
use crate::auth::session::{Session, SessionManager};
use crate::error::{AppError, EMAIL_TAKEN, USERNAME_TAKEN};
use crate::storage::{CreateUser, User, UserStore};

const PARAMETERS_MISSING: &str = "Parameters missing.";

/// Signup request
#[derive(Debug, Default, Deserialize)]
pub struct SignupRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Login request
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Signup, login and logout workflows
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    sessions: SessionManager,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, sessions: SessionManager) -> Self {
        Self { users, sessions }
    }

    /// Create an account and log the caller in as it
    pub async fn signup(&self, session: &mut Session, request: SignupRequest) -> Result<User, AppError> {
        let (Some(username), Some(email), Some(password)) = (
            present(request.username),
            present(request.email),
            present(request.password),
        ) else {
            return Err(AppError::Validation(PARAMETERS_MISSING.to_string()));
        };

        if self.users.find_by_username(&username).await?.is_some() {
            warn!("Signup rejected, username taken: {}", username);
            return Err(AppError::Conflict(USERNAME_TAKEN.to_string()));
        }

        if self.users.find_by_email(&email).await?.is_some() {
            warn!("Signup rejected, email already registered");
            return Err(AppError::Conflict(EMAIL_TAKEN.to_string()));
        }

        let password_hash = hash_password_blocking(password).await?;

        // The store's own uniqueness check settles races with a concurrent signup
        let user = self
            .users
            .create(CreateUser {
                username,
                email,
                password_hash,
            })
            .await?;

        // The account stays; the client can log in once the store recovers
        if let Err(e) = self.sessions.authenticate(session, user.id).await {
            error!(
                "User {} created but session could not be established: {}",
                user.username, e
            );
            return Err(e.into());
        }
        info!("User {} signed up", user.username);

        Ok(user)
    }

    /// Check credentials and bind the session to the user
    pub async fn login(&self, session: &mut Session, request: LoginRequest) -> Result<User, AppError> {
        let (Some(username), Some(password)) = (present(request.username), present(request.password))
        else {
            return Err(AppError::Validation(PARAMETERS_MISSING.to_string()));
        };

        let user = match self.users.find_by_username(&username).await? {
            Some(user) => {
                let hash = user.password_hash.clone();
                verify_password_blocking(password, hash)
                    .await?
                    .then_some(user)
            }
            None => {
                verify_unknown_user(password).await?;
                None
            }
        };

        let Some(user) = user else {
            warn!("Failed login attempt for username: {}", username);
            return Err(AppError::InvalidCredentials);
        };

        self.sessions.authenticate(session, user.id).await?;
        info!("User {} logged in", user.username);

        Ok(user)
    }

    /// Destroy the session. Logging out an anonymous session succeeds.
    pub async fn logout(&self, session: &mut Session) -> Result<(), AppError> {
        let user_id = session.user_id();
        self.sessions.destroy(session).await?;

        if let Some(user_id) = user_id {
            info!("User {} logged out", user_id);
        }
        Ok(())
    }

    /// Full profile of the session's user
    pub async fn authenticated_user(&self, caller: AuthenticatedUser) -> Result<User, AppError> {
        // A session can outlive its user
        self.users
            .find_by_id(caller.user_id)
            .await?
            .ok_or(AppError::AuthRequired)
    }
}

/// `None` for absent or empty fields
fn present(field: Option<String>) -> Option<String> {
    field.filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::cookie::CookieSigner;
    use crate::storage::{
        MemorySessionStore, MemoryUserStore, SessionRecord, SessionStore, StorageError,
        StorageResult,
    };
    use chrono::{DateTime, Utc};
    use async_trait::async_trait;
    use uuid::Uuid;

    fn service_with(users: Arc<dyn UserStore>) -> (AuthService, SessionManager) {
        let signer = CookieSigner::new(b"test-session-secret").unwrap();
        let sessions = SessionManager::new(Arc::new(MemorySessionStore::new()), signer, 3600);
        (AuthService::new(users, sessions.clone()), sessions)
    }

    fn signup_request(username: &str, email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            username: Some(username.to_string()),
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[tokio::test]
    async fn test_signup_authenticates_session() {
        let (auth, sessions) = service_with(Arc::new(MemoryUserStore::new()));
        let mut session = sessions.resolve(None).await.unwrap();

        let user = auth
            .signup(&mut session, signup_request("alice", "a@x.com", "pw1"))
            .await
            .unwrap();

        assert_eq!(session.user_id(), Some(user.id));
        assert_ne!(user.password_hash, "pw1");
    }

    #[tokio::test]
    async fn test_signup_requires_every_field() {
        let (auth, sessions) = service_with(Arc::new(MemoryUserStore::new()));
        let mut session = sessions.resolve(None).await.unwrap();

        let mut request = signup_request("alice", "a@x.com", "pw1");
        request.email = Some(String::new());

        let result = auth.signup(&mut session, request).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_username_conflict_is_reported_before_email() {
        let users = MemoryUserStore::new();
        let (auth, sessions) = service_with(Arc::new(users.clone()));
        let mut session = sessions.resolve(None).await.unwrap();
        auth.signup(&mut session, signup_request("alice", "a@x.com", "pw1"))
            .await
            .unwrap();

        let mut other = sessions.resolve(None).await.unwrap();
        let result = auth
            .signup(&mut other, signup_request("alice", "a@x.com", "pw2"))
            .await;

        assert!(matches!(result, Err(AppError::Conflict(ref m)) if m == USERNAME_TAKEN));
        assert!(!other.is_authenticated());
        assert_eq!(users.list().await.unwrap().len(), 1);
    }

    /// Lookups that never find anything, as if a concurrent signup had not
    /// committed yet when the pre-checks ran.
    struct RacingUserStore {
        inner: MemoryUserStore,
    }

    #[async_trait]
    impl UserStore for RacingUserStore {
        async fn create(&self, user: CreateUser) -> StorageResult<User> {
            self.inner.create(user).await
        }

        async fn find_by_id(&self, id: Uuid) -> StorageResult<Option<User>> {
            self.inner.find_by_id(id).await
        }

        async fn find_by_username(&self, _username: &str) -> StorageResult<Option<User>> {
            Ok(None)
        }

        async fn find_by_email(&self, _email: &str) -> StorageResult<Option<User>> {
            Ok(None)
        }

        async fn list(&self) -> StorageResult<Vec<User>> {
            self.inner.list().await
        }
    }

    #[tokio::test]
    async fn test_store_constraint_settles_signup_race() {
        let inner = MemoryUserStore::new();
        let (auth, sessions) = service_with(Arc::new(RacingUserStore {
            inner: inner.clone(),
        }));

        let mut first = sessions.resolve(None).await.unwrap();
        auth.signup(&mut first, signup_request("alice", "a@x.com", "pw1"))
            .await
            .unwrap();

        let mut second = sessions.resolve(None).await.unwrap();
        let result = auth
            .signup(&mut second, signup_request("bob", "a@x.com", "pw2"))
            .await;

        assert!(matches!(result, Err(AppError::Conflict(ref m)) if m == EMAIL_TAKEN));
        assert_eq!(inner.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let (auth, sessions) = service_with(Arc::new(MemoryUserStore::new()));
        let mut session = sessions.resolve(None).await.unwrap();
        auth.signup(&mut session, signup_request("alice", "a@x.com", "pw1"))
            .await
            .unwrap();

        let mut fresh = sessions.resolve(None).await.unwrap();
        let wrong_password = auth
            .login(
                &mut fresh,
                LoginRequest {
                    username: Some("alice".to_string()),
                    password: Some("wrong".to_string()),
                },
            )
            .await
            .unwrap_err();
        let unknown_user = auth
            .login(
                &mut fresh,
                LoginRequest {
                    username: Some("mallory".to_string()),
                    password: Some("pw1".to_string()),
                },
            )
            .await
            .unwrap_err();

        assert_eq!(wrong_password.status(), unknown_user.status());
        assert_eq!(wrong_password.client_message(), unknown_user.client_message());
        assert!(!fresh.is_authenticated());
    }

    #[tokio::test]
    async fn test_logout_twice() {
        let (auth, sessions) = service_with(Arc::new(MemoryUserStore::new()));
        let mut session = sessions.resolve(None).await.unwrap();
        auth.signup(&mut session, signup_request("alice", "a@x.com", "pw1"))
            .await
            .unwrap();

        auth.logout(&mut session).await.unwrap();
        assert!(!session.is_authenticated());
        auth.logout(&mut session).await.unwrap();
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_authenticated_user_for_deleted_account() {
        let (auth, _) = service_with(Arc::new(MemoryUserStore::new()));
        let caller = AuthenticatedUser {
            user_id: Uuid::new_v4(),
        };

        assert!(matches!(
            auth.authenticated_user(caller).await,
            Err(AppError::AuthRequired)
        ));
    }

    /// Session store that cannot persist anything
    struct UnwritableSessionStore;

    #[async_trait]
    impl SessionStore for UnwritableSessionStore {
        async fn load(&self, _token: &str) -> StorageResult<Option<SessionRecord>> {
            Ok(None)
        }

        async fn save(&self, _record: &SessionRecord) -> StorageResult<()> {
            Err(StorageError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn touch(&self, _token: &str, _expires_at: DateTime<Utc>) -> StorageResult<()> {
            Ok(())
        }

        async fn delete(&self, _token: &str) -> StorageResult<()> {
            Ok(())
        }

        async fn purge_expired(&self, _now: DateTime<Utc>) -> StorageResult<u64> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_signup_keeps_account_when_session_store_fails() {
        let users = MemoryUserStore::new();
        let signer = CookieSigner::new(b"test-session-secret").unwrap();
        let sessions = SessionManager::new(Arc::new(UnwritableSessionStore), signer, 3600);
        let auth = AuthService::new(Arc::new(users.clone()), sessions.clone());
        let mut session = sessions.resolve(None).await.unwrap();

        let result = auth
            .signup(&mut session, signup_request("alice", "a@x.com", "pw1"))
            .await;

        assert!(matches!(result, Err(AppError::Internal(_))));
        assert!(!session.is_authenticated());
        assert!(users.find_by_username("alice").await.unwrap().is_some());

        let retry = auth
            .signup(&mut session, signup_request("alice", "a@x.com", "pw1"))
            .await;
        assert!(matches!(retry, Err(AppError::Conflict(ref m)) if m == USERNAME_TAKEN));
    }
}
