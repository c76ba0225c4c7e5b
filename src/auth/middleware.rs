use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, IntoResponseParts, Response, ResponseParts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::warn;

use crate::auth::session::Session;
use crate::error::AppError;
use crate::state::ServerState;

/// A change to the caller's session made by a handler. Returned as a
/// response part; the session middleware turns it into a cookie.
#[derive(Debug, Clone)]
pub enum SessionTransition {
    /// The session is now bound to a user; issue its cookie
    Established(Session),
    /// The session was destroyed; clear the cookie
    Cleared,
}

impl From<Session> for SessionTransition {
    fn from(session: Session) -> Self {
        if session.is_authenticated() {
            Self::Established(session)
        } else {
            Self::Cleared
        }
    }
}

impl IntoResponseParts for SessionTransition {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        res.extensions_mut().insert(self);
        Ok(res)
    }
}

/// Resolves the session cookie for every request and keeps the client's
/// cookie in step with the server-side record afterwards.
pub async fn session_middleware(
    State(state): State<Arc<ServerState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let cookies = &state.cookies;
    let presented = CookieJar::from_headers(request.headers())
        .get(&cookies.name)
        .map(|cookie| cookie.value().to_string());

    let session = match state.session_manager.resolve(presented.as_deref()).await {
        Ok(session) => session,
        Err(e) => return AppError::from(e).into_response(),
    };

    request.extensions_mut().insert(session.clone());
    let mut response = next.run(request).await;

    let cookie = match response.extensions_mut().remove::<SessionTransition>() {
        Some(SessionTransition::Established(updated)) => {
            Some(cookies.issue(state.session_manager.cookie_value(&updated)))
        }
        Some(SessionTransition::Cleared) => Some(cookies.removal()),
        // Rolling window: every request on a live session re-arms the cookie
        None if session.is_persisted() => {
            Some(cookies.issue(state.session_manager.cookie_value(&session)))
        }
        // Stale, forged or expired token
        None if presented.is_some() => Some(cookies.removal()),
        None => None,
    };

    if let Some(cookie) = cookie {
        append_set_cookie(&mut response, &cookie);
    }

    response
}

fn append_set_cookie(response: &mut Response, cookie: &Cookie<'static>) {
    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => warn!("Could not encode session cookie: {}", e),
    }
}
