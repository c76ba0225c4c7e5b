//! Authorization guard: the session requirement and the ownership check.

use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::auth::session::{Session, SessionState};
use crate::error::AppError;

/// The caller's user id, present only behind a successful session check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Session>().map(Session::state) {
            Some(SessionState::Authenticated { user_id }) => Ok(Self { user_id }),
            _ => Err(AppError::AuthRequired),
        }
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session middleware is not installed".to_string()))
    }
}

/// Middleware for protected routes: rejects anonymous sessions before the
/// handler (and any storage access) runs.
pub async fn require_auth(request: Request, next: Next) -> Response {
    let authenticated = request
        .extensions()
        .get::<Session>()
        .is_some_and(Session::is_authenticated);

    if !authenticated {
        return AppError::AuthRequired.into_response();
    }

    next.run(request).await
}

/// Anything with a single fixed owner
pub trait Owned {
    fn owner_id(&self) -> Uuid;
}

/// Parse a path identifier. Runs before any lookup.
pub fn parse_resource_id(raw: &str, invalid_message: &str) -> Result<Uuid, AppError> {
    Uuid::try_parse(raw).map_err(|_| AppError::Validation(invalid_message.to_string()))
}

pub fn assert_owner(owner_id: Uuid, caller: &AuthenticatedUser, denied_message: &str) -> Result<(), AppError> {
    if owner_id != caller.user_id {
        return Err(AppError::Forbidden(denied_message.to_string()));
    }
    Ok(())
}

/// Existence first, then ownership. Ownership is never evaluated against a
/// resource that does not exist.
pub fn authorize<T: Owned>(
    resource: Option<T>,
    caller: &AuthenticatedUser,
    not_found_message: &str,
    denied_message: &str,
) -> Result<T, AppError> {
    let resource = resource.ok_or_else(|| AppError::NotFound(not_found_message.to_string()))?;
    assert_owner(resource.owner_id(), caller, denied_message)?;
    Ok(resource)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Thing {
        owner: Uuid,
    }

    impl Owned for Thing {
        fn owner_id(&self) -> Uuid {
            self.owner
        }
    }

    #[test]
    fn test_assert_owner() {
        let caller = AuthenticatedUser {
            user_id: Uuid::new_v4(),
        };

        assert!(assert_owner(caller.user_id, &caller, "no").is_ok());
        assert!(matches!(
            assert_owner(Uuid::new_v4(), &caller, "no"),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_parse_resource_id() {
        let id = Uuid::new_v4();

        assert_eq!(parse_resource_id(&id.to_string(), "bad").unwrap(), id);
        assert!(matches!(
            parse_resource_id("not-a-uuid", "bad"),
            Err(AppError::Validation(ref m)) if m == "bad"
        ));
    }

    #[test]
    fn test_authorize_checks_existence_before_ownership() {
        let caller = AuthenticatedUser {
            user_id: Uuid::new_v4(),
        };

        let missing: Option<Thing> = None;
        assert!(matches!(
            authorize(missing, &caller, "gone", "denied"),
            Err(AppError::NotFound(_))
        ));

        let foreign = Some(Thing {
            owner: Uuid::new_v4(),
        });
        assert!(matches!(
            authorize(foreign, &caller, "gone", "denied"),
            Err(AppError::Forbidden(_))
        ));

        let own = Some(Thing {
            owner: caller.user_id,
        });
        assert!(authorize(own, &caller, "gone", "denied").is_ok());
    }
}
