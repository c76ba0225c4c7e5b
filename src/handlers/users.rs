use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{AuthenticatedUser, LoginRequest, Session, SessionTransition, SignupRequest};
use crate::error::AppError;
use crate::handlers::json::JsonBody;
use crate::state::ServerState;
use crate::storage::User;

/// Profile returned to the account owner. Never carries the password hash.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Signup endpoint
pub async fn signup(
    State(state): State<Arc<ServerState>>,
    mut session: Session,
    JsonBody(request): JsonBody<SignupRequest>,
) -> Result<(StatusCode, SessionTransition, Json<UserProfile>), AppError> {
    let user = state.auth.signup(&mut session, request).await?;

    Ok((
        StatusCode::CREATED,
        SessionTransition::from(session),
        Json(user.into()),
    ))
}

/// Login endpoint
pub async fn login(
    State(state): State<Arc<ServerState>>,
    mut session: Session,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<(SessionTransition, Json<UserProfile>), AppError> {
    let user = state.auth.login(&mut session, request).await?;

    Ok((SessionTransition::from(session), Json(user.into())))
}

/// Logout endpoint
pub async fn logout(
    State(state): State<Arc<ServerState>>,
    mut session: Session,
) -> Result<(SessionTransition, StatusCode), AppError> {
    state.auth.logout(&mut session).await?;

    Ok((SessionTransition::Cleared, StatusCode::OK))
}

/// Current user's full profile
pub async fn authenticated_user(
    State(state): State<Arc<ServerState>>,
    caller: AuthenticatedUser,
) -> Result<Json<UserProfile>, AppError> {
    let user = state.auth.authenticated_user(caller).await?;
    Ok(Json(user.into()))
}
