use sqlx::PgPool;
use std::sync::Arc;
use std::time::Instant;

use crate::auth::{AuthService, CookieSettings, CookieSigner, InvalidSecret, SessionManager};
use crate::config::ServerConfig;
use crate::notes::NoteService;
use crate::storage::{
    MemoryNoteStore, MemorySessionStore, MemoryUserStore, NoteStore, PostgresNoteStore,
    PostgresSessionStore, PostgresUserStore, SessionStore, StorageResult, UserStore,
};

/// The three backing collections
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub notes: Arc<dyn NoteStore>,
    pub sessions: Arc<dyn SessionStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(MemoryUserStore::new()),
            notes: Arc::new(MemoryNoteStore::new()),
            sessions: Arc::new(MemorySessionStore::new()),
        }
    }

    /// Postgres-backed stores, with schema created if missing
    pub async fn postgres(pool: PgPool) -> StorageResult<Self> {
        let users = PostgresUserStore::new(pool.clone());
        users.initialize().await?;

        let notes = PostgresNoteStore::new(pool.clone());
        notes.initialize().await?;

        let sessions = PostgresSessionStore::new(pool);
        sessions.initialize().await?;

        Ok(Self {
            users: Arc::new(users),
            notes: Arc::new(notes),
            sessions: Arc::new(sessions),
        })
    }
}

/// Main server state shared across all handlers
pub struct ServerState {
    pub config: ServerConfig,
    pub cookies: CookieSettings,
    pub session_manager: SessionManager,
    pub auth: AuthService,
    pub notes: NoteService,
    pub start_time: Instant,
}

impl ServerState {
    pub fn new(config: ServerConfig, stores: Stores) -> Result<Self, InvalidSecret> {
        let signer = CookieSigner::new(config.session_secret.as_bytes())?;
        let session_manager =
            SessionManager::new(stores.sessions, signer, config.session_timeout_seconds);

        Ok(Self {
            cookies: config.cookie_settings(),
            auth: AuthService::new(stores.users, session_manager.clone()),
            notes: NoteService::new(stores.notes),
            session_manager,
            config,
            start_time: Instant::now(),
        })
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
