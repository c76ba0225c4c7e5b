use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::auth::cookie::{generate_session_token, CookieSigner};
use crate::storage::{SessionRecord, SessionStore, StorageResult};

/// Who a session speaks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No user bound; never satisfies an authentication requirement
    Anonymous,
    Authenticated { user_id: Uuid },
}

/// A resolved session, passed explicitly to whatever needs it
#[derive(Debug, Clone)]
pub struct Session {
    token: String,
    state: SessionState,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    persisted: bool,
}

impl Session {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self.state {
            SessionState::Authenticated { user_id } => Some(user_id),
            SessionState::Anonymous => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated { .. })
    }

    /// True when a backing record exists for this session
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    fn to_record(&self) -> SessionRecord {
        SessionRecord {
            token: self.token.clone(),
            user_id: self.user_id(),
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

/// Server-side session lifecycle over a [`SessionStore`] with a rolling
/// inactivity window.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    signer: CookieSigner,
    timeout: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, signer: CookieSigner, timeout_seconds: u64) -> Self {
        let timeout = i64::try_from(timeout_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);

        Self {
            store,
            signer,
            timeout,
        }
    }

    /// Resolve the client-presented cookie value to a session.
    ///
    /// A live record is extended by one full window. An expired record is
    /// purged. Anything else (no cookie, bad signature, unknown token)
    /// yields a fresh anonymous session that is not stored.
    pub async fn resolve(&self, cookie_value: Option<&str>) -> StorageResult<Session> {
        let Some(token) = cookie_value.and_then(|value| self.signer.verify(value)) else {
            return Ok(self.anonymous());
        };

        let Some(record) = self.store.load(token).await? else {
            return Ok(self.anonymous());
        };

        let now = Utc::now();
        if record.expires_at <= now {
            debug!("Dropping expired session");
            self.store.delete(token).await?;
            return Ok(self.anonymous());
        }

        let expires_at = self.expiry_from(now);
        self.store.touch(token, expires_at).await?;

        let state = match record.user_id {
            Some(user_id) => SessionState::Authenticated { user_id },
            None => SessionState::Anonymous,
        };

        Ok(Session {
            token: record.token,
            state,
            created_at: record.created_at,
            expires_at,
            persisted: true,
        })
    }

    /// Bind a user to the session and persist it. A stored session is
    /// retired and the user gets a freshly minted token, so a cookie issued
    /// before login never carries the new identity.
    pub async fn authenticate(&self, session: &mut Session, user_id: Uuid) -> StorageResult<()> {
        let mut updated = session.clone();
        if session.persisted {
            self.store.delete(&session.token).await?;
            updated.token = generate_session_token();
            updated.created_at = Utc::now();
        }
        updated.state = SessionState::Authenticated { user_id };
        updated.expires_at = self.expiry_from(Utc::now());

        self.store.save(&updated.to_record()).await?;

        updated.persisted = true;
        *session = updated;
        Ok(())
    }

    /// Remove all server-side state for the session. The session is left
    /// anonymous under a new token. A store failure is returned and leaves
    /// the session untouched.
    pub async fn destroy(&self, session: &mut Session) -> StorageResult<()> {
        if session.persisted {
            self.store.delete(&session.token).await?;
        }
        *session = self.anonymous();
        Ok(())
    }

    /// Delete every expired record
    pub async fn purge_expired(&self) -> StorageResult<u64> {
        self.store.purge_expired(Utc::now()).await
    }

    /// Signed cookie value for the session's token
    pub fn cookie_value(&self, session: &Session) -> String {
        self.signer.sign(&session.token)
    }

    fn anonymous(&self) -> Session {
        let now = Utc::now();
        Session {
            token: generate_session_token(),
            state: SessionState::Anonymous,
            created_at: now,
            expires_at: self.expiry_from(now),
            persisted: false,
        }
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(self.timeout)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
