use std::sync::Arc;

use warp::{
    reject::{self, Rejection},
    Filter,
};

use crate::constants::SESSION_COOKIE;

use super::jwt::{verify_jwt_session, SessionData};

#[derive(Debug)]
pub struct Unauthorized;

impl reject::Reject for Unauthorized {}

/// Picks the session token from the `session` cookie, falling back to an
/// `Authorization: Bearer <token>` (or `Token <token>`) header.
fn session_token(cookie: Option<String>, header: Option<String>) -> Option<String> {
    if let Some(cookie) = cookie.filter(|cookie| !cookie.is_empty()) {
        return Some(cookie);
    }

    let header = header?;
    let (scheme, token) = header.trim().split_once(' ')?;
    match scheme.to_ascii_lowercase().as_str() {
        "bearer" | "token" => Some(token.trim().to_string()),
        _ => None,
    }
}

/// Resolves the caller's session if there is a valid one; anything else is
/// treated as an anonymous request.
pub fn with_possible_session(
    secret: Arc<String>,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::cookie::optional::<String>(SESSION_COOKIE)
        .and(warp::header::optional::<String>("authorization"))
        .map(move |cookie: Option<String>, header: Option<String>| {
            let token = session_token(cookie, header)?;
            match verify_jwt_session(&token, &secret) {
                Ok(data) => Some(SessionData::from(data)),
                Err(e) => {
                    log::trace!("> Ignoring session: {e}");
                    None
                }
            }
        })
}

pub fn with_session(
    secret: Arc<String>,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    with_possible_session(secret).and_then(|session: Option<SessionData>| async move {
        session.ok_or_else(|| warp::reject::custom(Unauthorized))
    })
}
