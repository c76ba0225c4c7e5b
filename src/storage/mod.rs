mod memory;
mod notes;
mod sessions;
mod traits;
mod users;

pub use memory::{MemoryNoteStore, MemorySessionStore, MemoryUserStore};
pub use notes::{NewNote, Note, NoteStore, PostgresNoteStore};
pub use sessions::{PostgresSessionStore, SessionRecord, SessionStore};
pub use traits::{StorageError, StorageResult};
pub use users::{CreateUser, PostgresUserStore, User, UserStore};
