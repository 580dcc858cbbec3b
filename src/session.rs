// ABOUTME: Session management with HttpOnly cookies for authenticated users
// ABOUTME: In-memory store keyed by random ids; sessions expire after a fixed max age

use crate::error::{AppError, Result};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub user_id: Uuid,
    pub username: String,
    pub created_at: i64,
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionData>>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn create_session(&self, user_id: Uuid, username: String) -> String {
        self.cleanup_expired_sessions(SESSION_MAX_AGE);

        let session_id = Uuid::new_v4().to_string();
        let session_data = SessionData {
            user_id,
            username,
            created_at: chrono::Utc::now().timestamp(),
        };

        if let Ok(mut sessions) = self.sessions.write() {
            sessions.insert(session_id.clone(), session_data);
        }

        session_id
    }

    pub fn get_session(&self, session_id: &str) -> Option<SessionData> {
        let cutoff = chrono::Utc::now().timestamp() - SESSION_MAX_AGE;
        let sessions = self.sessions.read().ok()?;
        sessions
            .get(session_id)
            .filter(|session| session.created_at > cutoff)
            .cloned()
    }

    pub fn remove_session(&self, session_id: &str) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.remove(session_id);
        }
    }

    /// Drops every session belonging to `user_id`, returning how many were removed.
    pub fn remove_user_sessions(&self, user_id: Uuid) -> usize {
        if let Ok(mut sessions) = self.sessions.write() {
            let before = sessions.len();
            sessions.retain(|_, session| session.user_id != user_id);
            before - sessions.len()
        } else {
            0
        }
    }

    pub fn cleanup_expired_sessions(&self, max_age_seconds: i64) {
        let cutoff = chrono::Utc::now().timestamp() - max_age_seconds;

        if let Ok(mut sessions) = self.sessions.write() {
            sessions.retain(|_, session| session.created_at > cutoff);
        }
    }
}

pub const SESSION_COOKIE_NAME: &str = "petstagram_session";
const SESSION_MAX_AGE: i64 = 24 * 60 * 60; // 24 hours

pub fn create_session_cookie(session_id: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, session_id))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::seconds(SESSION_MAX_AGE))
        .path("/")
        .build()
}

pub fn create_logout_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, ""))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::seconds(0))
        .path("/")
        .build()
}

pub fn extract_session_from_jar(
    jar: &CookieJar,
    session_store: &SessionStore,
) -> Result<SessionData> {
    let session_cookie = jar
        .get(SESSION_COOKIE_NAME)
        .ok_or_else(|| AppError::Unauthorized("No session cookie found".to_string()))?;

    let session_data = session_store
        .get_session(session_cookie.value())
        .ok_or_else(|| AppError::Unauthorized("Invalid session".to_string()))?;

    Ok(session_data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_get_remove() {
        let store = SessionStore::new();
        let user_id = Uuid::new_v4();
        let id = store.create_session(user_id, "alice".to_string());

        let session = store.get_session(&id).unwrap();
        assert_eq!(session.user_id, user_id);
        assert_eq!(session.username, "alice");

        store.remove_session(&id);
        assert!(store.get_session(&id).is_none());
    }

    #[test]
    fn removing_user_sessions_leaves_others() {
        let store = SessionStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let a1 = store.create_session(alice, "alice".to_string());
        let a2 = store.create_session(alice, "alice".to_string());
        let b1 = store.create_session(bob, "bob".to_string());

        assert_eq!(store.remove_user_sessions(alice), 2);
        assert!(store.get_session(&a1).is_none());
        assert!(store.get_session(&a2).is_none());
        assert!(store.get_session(&b1).is_some());
    }

    #[test]
    fn jar_without_cookie_is_unauthorized() {
        let store = SessionStore::new();
        let jar = CookieJar::new();
        assert!(matches!(
            extract_session_from_jar(&jar, &store),
            Err(AppError::Unauthorized(_))
        ));
    }
}
