// ABOUTME: Authentication helpers and the session extractor used by endpoints
// ABOUTME: Mutating routes take `AuthUser`; read routes accept an optional viewer

use crate::{AppState, error, session};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

pub fn validate_session(jar: &CookieJar, state: &AppState) -> error::Result<session::SessionData> {
    session::extract_session_from_jar(jar, &state.sessions)
}

pub fn current_viewer(jar: &CookieJar, state: &AppState) -> Option<Uuid> {
    validate_session(jar, state).ok().map(|session| session.user_id)
}

/// The signed-in caller. Resolved from request headers alone, so it must come
/// before any body extractor: a caller without a live session is rejected with
/// `Unauthorized` whatever the body holds.
pub struct AuthUser(pub session::SessionData);

impl AuthUser {
    pub fn id(&self) -> Uuid {
        self.0.user_id
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = error::AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        Ok(AuthUser(validate_session(&jar, state)?))
    }
}
