use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::database::schema::User;
use crate::error::{ErrorKind, QueryError};
use crate::schema::{Id, UserRole};

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Id, username: String, role: UserRole, lifetime: Duration) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + lifetime).timestamp();

        Self {
            user_id: id,
            username,
            role,
            iat,
            exp,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.exp <= Local::now().timestamp()
    }
}

/// The requesting user, as established from a verified session token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionData {
    pub user_id: Id,
    pub role: UserRole,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), potion::Error> {
        if !action.authenticate(self) {
            return Err(ErrorKind::PermissionDenied.default());
        }
        Ok(())
    }

    /// Authors manage their own recipes, admins manage all of them.
    pub fn can_manage_recipe_of(&self, author_id: Id) -> bool {
        ActionType::ManageAllRecipes.authenticate(self)
            || (author_id == self.user_id && ActionType::ManageOwnRecipes.authenticate(self))
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        Self {
            user_id: value.user_id,
            role: value.role,
        }
    }
}

fn signing_key(secret: &str) -> Result<Hmac<Sha256>, potion::Error> {
    Hmac::new_from_slice(secret.as_bytes())
        .map_err(|e| QueryError::new(format!("Invalid session secret: {e}")).into())
}

pub fn generate_jwt_session(
    user: &User,
    secret: &str,
    lifetime: Duration,
) -> Result<String, potion::Error> {
    let key = signing_key(secret)?;
    let claims = JwtSessionData::new(user.id, user.username.to_owned(), user.role.to_owned(), lifetime);

    claims
        .sign_with_key(&key)
        .map_err(|e| QueryError::new(format!("Could not sign session: {e}")).into())
}

pub fn verify_jwt_session(token: &str, secret: &str) -> Result<JwtSessionData, potion::Error> {
    let key = signing_key(secret)?;

    let session: JwtSessionData = token
        .verify_with_key(&key)
        .map_err(|_| ErrorKind::Unauthenticated.new("Invalid session; Invalid token"))?;

    if session.is_expired() {
        return Err(ErrorKind::Unauthenticated.new("Invalid session; Token expired"));
    }

    Ok(session)
}
