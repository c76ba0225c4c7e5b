//! In-process stores for tests and `serve --in-memory`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::notes::{NewNote, Note, NoteStore};
use super::sessions::{SessionRecord, SessionStore};
use super::traits::{StorageError, StorageResult};
use super::users::{CreateUser, User, UserStore};

/// In-memory UserStore. Uniqueness is checked under the write lock, so it
/// holds even for concurrent signups.
#[derive(Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: CreateUser) -> StorageResult<User> {
        let mut users = self.users.write();

        if users.values().any(|u| u.username == user.username) {
            return Err(StorageError::DuplicateUsername(user.username));
        }
        if users.values().any(|u| u.email == user.email) {
            return Err(StorageError::DuplicateEmail(user.email));
        }

        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        users.insert(created.id, created.clone());

        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> StorageResult<Option<User>> {
        Ok(self.users.read().get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> StorageResult<Option<User>> {
        Ok(self
            .users
            .read()
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        Ok(self.users.read().values().find(|u| u.email == email).cloned())
    }

    async fn list(&self) -> StorageResult<Vec<User>> {
        let mut users: Vec<User> = self.users.read().values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }
}

/// In-memory NoteStore
#[derive(Clone, Default)]
pub struct MemoryNoteStore {
    notes: Arc<RwLock<HashMap<Uuid, Note>>>,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NoteStore for MemoryNoteStore {
    async fn create(&self, note: NewNote) -> StorageResult<Note> {
        let now = Utc::now();
        let created = Note {
            id: Uuid::new_v4(),
            user_id: note.user_id,
            title: note.title,
            text: note.text,
            created_at: now,
            updated_at: now,
        };
        self.notes.write().insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> StorageResult<Option<Note>> {
        Ok(self.notes.read().get(&id).cloned())
    }

    async fn list_by_owner(&self, user_id: Uuid) -> StorageResult<Vec<Note>> {
        let mut notes: Vec<Note> = self
            .notes
            .read()
            .values()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        notes.sort_by_key(|n| n.created_at);
        Ok(notes)
    }

    async fn save(&self, note: &Note) -> StorageResult<()> {
        let mut notes = self.notes.write();
        let Some(stored) = notes.get_mut(&note.id) else {
            return Err(StorageError::NoteNotFound(note.id));
        };
        stored.title = note.title.clone();
        stored.text = note.text.clone();
        stored.updated_at = note.updated_at;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> StorageResult<()> {
        match self.notes.write().remove(&id) {
            Some(_) => Ok(()),
            None => Err(StorageError::NoteNotFound(id)),
        }
    }
}

/// In-memory SessionStore
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionRecord>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, expired ones included
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, token: &str) -> StorageResult<Option<SessionRecord>> {
        Ok(self.sessions.read().get(token).cloned())
    }

    async fn save(&self, record: &SessionRecord) -> StorageResult<()> {
        self.sessions
            .write()
            .insert(record.token.clone(), record.clone());
        Ok(())
    }

    async fn touch(&self, token: &str, expires_at: DateTime<Utc>) -> StorageResult<()> {
        if let Some(record) = self.sessions.write().get_mut(token) {
            record.expires_at = expires_at;
        }
        Ok(())
    }

    async fn delete(&self, token: &str) -> StorageResult<()> {
        self.sessions.write().remove(token);
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StorageResult<u64> {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, record| record.expires_at > now);
        Ok((before - sessions.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_user(username: &str, email: &str) -> CreateUser {
        CreateUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn test_user_store_rejects_duplicate_username() {
        let store = MemoryUserStore::new();
        store.create(create_user("alice", "a@x.com")).await.unwrap();

        let result = store.create(create_user("alice", "other@x.com")).await;
        assert!(matches!(result, Err(StorageError::DuplicateUsername(_))));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_user_store_rejects_duplicate_email() {
        let store = MemoryUserStore::new();
        store.create(create_user("alice", "a@x.com")).await.unwrap();

        let result = store.create(create_user("bob", "a@x.com")).await;
        assert!(matches!(result, Err(StorageError::DuplicateEmail(_))));
    }

    #[tokio::test]
    async fn test_user_lookup_is_case_sensitive() {
        let store = MemoryUserStore::new();
        store.create(create_user("alice", "a@x.com")).await.unwrap();

        assert!(store.find_by_username("alice").await.unwrap().is_some());
        assert!(store.find_by_username("Alice").await.unwrap().is_none());
        assert!(store.find_by_email("A@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_note_store_lists_only_owner_notes() {
        let store = MemoryNoteStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        for title in ["one", "two"] {
            store
                .create(NewNote {
                    user_id: alice,
                    title: title.to_string(),
                    text: None,
                })
                .await
                .unwrap();
        }
        store
            .create(NewNote {
                user_id: bob,
                title: "bob's".to_string(),
                text: None,
            })
            .await
            .unwrap();

        let notes = store.list_by_owner(alice).await.unwrap();
        assert_eq!(notes.len(), 2);
        assert!(notes.iter().all(|n| n.user_id == alice));
    }

    #[tokio::test]
    async fn test_note_store_missing_note() {
        let store = MemoryNoteStore::new();
        let id = Uuid::new_v4();

        assert!(matches!(
            store.delete(id).await,
            Err(StorageError::NoteNotFound(missing)) if missing == id
        ));
    }

    #[tokio::test]
    async fn test_session_store_purge_expired() {
        let store = MemorySessionStore::new();
        let now = Utc::now();

        for (token, offset) in [("stale", -10), ("live", 10)] {
            store
                .save(&SessionRecord {
                    token: token.to_string(),
                    user_id: Some(Uuid::new_v4()),
                    created_at: now,
                    expires_at: now + chrono::Duration::seconds(offset),
                })
                .await
                .unwrap();
        }

        assert_eq!(store.purge_expired(now).await.unwrap(), 1);
        assert!(store.load("stale").await.unwrap().is_none());
        assert!(store.load("live").await.unwrap().is_some());
    }
}
