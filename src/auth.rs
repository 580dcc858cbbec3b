// ABOUTME: Account endpoints: registration, login, logout and password change
// ABOUTME: Issues and revokes HttpOnly session cookies around the account service

use axum::{extract::State, response::Json};
use axum_extra::extract::{WithRejection, cookie::CookieJar};

use crate::auth_helpers::AuthUser;
use crate::error::{JsonBody, Result};
use crate::types::{ChangePasswordRequest, LoginRequest, Redirect, RegisterRequest, SessionUser};
use crate::{AppState, auth_helpers, session};

fn start_session(state: &AppState, jar: CookieJar, user_id: uuid::Uuid, username: String) -> CookieJar {
    let session_id = state.sessions.create_session(user_id, username);
    jar.add(session::create_session_cookie(session_id, state.cookie_secure))
}

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(req), _): JsonBody<RegisterRequest>,
) -> Result<(CookieJar, Json<Redirect<SessionUser>>)> {
    // Already signed in: nothing to register
    if let Ok(current) = auth_helpers::validate_session(&jar, &state) {
        return Ok((
            jar,
            Json(Redirect::to(
                "/dashboard",
                SessionUser {
                    user_id: current.user_id,
                    username: current.username,
                },
            )),
        ));
    }

    let user = state.storage.register(&req).await?;
    let jar = start_session(&state, jar, user.id, user.username.clone());

    Ok((
        jar,
        Json(Redirect::to(
            "/dashboard",
            SessionUser {
                user_id: user.id,
                username: user.username,
            },
        )),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(req), _): JsonBody<LoginRequest>,
) -> Result<(CookieJar, Json<Redirect<SessionUser>>)> {
    let user = state.storage.authenticate(&req.username, &req.password).await?;
    let jar = start_session(&state, jar, user.id, user.username.clone());

    tracing::info!(user_id = %user.id, "User logged in");
    Ok((
        jar,
        Json(Redirect::to(
            "/dashboard",
            SessionUser {
                user_id: user.id,
                username: user.username,
            },
        )),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<Redirect<serde_json::Value>>)> {
    if let Some(session_cookie) = jar.get(session::SESSION_COOKIE_NAME) {
        state.sessions.remove_session(session_cookie.value());
    }

    let jar = jar.add(session::create_logout_cookie(state.cookie_secure));

    Ok((jar, Json(Redirect::to("/", serde_json::json!({"success": true})))))
}

/// Every existing session of the user is revoked; the caller gets a fresh one.
pub async fn change_password(
    AuthUser(current): AuthUser,
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(req), _): JsonBody<ChangePasswordRequest>,
) -> Result<(CookieJar, Json<Redirect<SessionUser>>)> {

    state
        .storage
        .change_password(
            current.user_id,
            &req.old_password,
            &req.new_password,
            &req.new_password_confirmation,
        )
        .await?;

    let revoked = state.sessions.remove_user_sessions(current.user_id);
    tracing::info!(user_id = %current.user_id, revoked, "Revoked sessions after password change");

    let jar = start_session(&state, jar, current.user_id, current.username.clone());

    Ok((
        jar,
        Json(Redirect::to(
            "/dashboard",
            SessionUser {
                user_id: current.user_id,
                username: current.username,
            },
        )),
    ))
}
