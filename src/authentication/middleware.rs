use std::sync::Arc;

use warp::{
    reject::{self, Rejection},
    Filter,
};

use crate::{constants::SESSION_COOKIE, state::State};

use super::jwt::{verify_jwt_session, SessionData};

#[derive(Debug)]
pub struct Unauthorized;

impl reject::Reject for Unauthorized {}

/// Token from an `Authorization: Token <jwt>` or `Bearer <jwt>` header.
pub fn header_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    match scheme {
        "Token" | "Bearer" if !token.trim().is_empty() => Some(token.trim()),
        _ => None,
    }
}

/// The requesting user, if the request carries a valid session. The header
/// wins over the cookie when both are present.
pub fn with_possible_session(
    state: Arc<State>,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::cookie::optional::<String>(SESSION_COOKIE)
        .and(warp::header::optional::<String>("authorization"))
        .map(move |cookie: Option<String>, header: Option<String>| -> Option<SessionData> {
            let token = header
                .as_deref()
                .and_then(header_token)
                .map(|token| token.to_owned())
                .or(cookie)?;

            match verify_jwt_session(&token, &state.config.jwt_secret) {
                Ok(session) => Some(SessionData::from(session)),
                Err(e) => {
                    log::debug!("> Ignoring session: {:?}", e.info);
                    None
                }
            }
        })
}

pub fn with_session(
    state: Arc<State>,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    with_possible_session(state).and_then(|session: Option<SessionData>| async move {
        session.ok_or_else(|| warp::reject::custom(Unauthorized))
    })
}
