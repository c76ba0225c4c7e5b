mod cookie;
mod guard;
mod middleware;
mod password;
mod service;
mod session;

pub use cookie::{generate_session_token, CookieSettings, CookieSigner, InvalidSecret};
pub use guard::{assert_owner, authorize, parse_resource_id, require_auth, AuthenticatedUser, Owned};
pub use middleware::{session_middleware, SessionTransition};
pub use password::{hash_password, verify_password, PasswordError};
pub use service::{AuthService, LoginRequest, SignupRequest};
pub use session::{Session, SessionManager, SessionState};
