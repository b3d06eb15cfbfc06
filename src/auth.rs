//! Session-cookie helpers shared by the HTTP handlers.
//!
//! Sessions are opaque UUID tokens stored server-side; the cookie carries
//! nothing else. Hardening (rotation, expiry, CSRF) is explicitly out of
//! scope here.

use axum::http::header::COOKIE;
use axum::http::HeaderMap;

use crate::domain::User;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "sid";

/// Pull the session id out of the Cookie header, if any.
pub fn session_id(headers: &HeaderMap) -> Option<String> {
  let raw = headers.get(COOKIE)?.to_str().ok()?;
  raw.split(';').find_map(|pair| {
    let (k, v) = pair.trim().split_once('=')?;
    (k == SESSION_COOKIE).then(|| v.to_string())
  })
}

/// Set-Cookie value for a fresh session.
pub fn session_cookie(sid: &str) -> String {
  format!("{SESSION_COOKIE}={sid}; Path=/; HttpOnly; SameSite=Lax")
}

/// Set-Cookie value that expires the session cookie.
pub fn clear_session_cookie() -> String {
  format!("{SESSION_COOKIE}=; Path=/; HttpOnly; Max-Age=0")
}

/// Resolve the current user from request headers, if a live session exists.
pub async fn current_user(state: &AppState, headers: &HeaderMap) -> Option<User> {
  let sid = session_id(headers)?;
  let user_id = state.store.session_user(&sid).await?;
  state.store.get_user(user_id).await
}
