use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::constants::SESSION_LIFETIME_HOURS;
use crate::database::schema::User;
use crate::error::ApiError;
use crate::schema::{UserRole, Uuid};

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Uuid, username: String, role: UserRole) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + Duration::hours(SESSION_LIFETIME_HOURS)).timestamp();

        Self {
            user_id: id,
            username,
            role,
            iat,
            exp,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionData {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), ApiError> {
        if !action.authenticate(self) {
            return Err(ApiError::forbidden());
        }
        Ok(())
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            username: value.username,
            user_id: value.user_id,
            role: value.role,
        }
    }
}

fn signing_key(secret: &str) -> Result<Hmac<Sha256>, ApiError> {
    Hmac::new_from_slice(secret.as_bytes())
        .map_err(|_| ApiError::unauthenticated("Invalid session; Bad signing key"))
}

/// Signs a session for `user` with the shared secret.
pub fn generate_jwt_session(user: &User, secret: &str) -> Result<String, ApiError> {
    let key = signing_key(secret)?;
    let claims = JwtSessionData::new(user.id, user.username.to_owned(), user.role.to_owned());

    claims
        .sign_with_key(&key)
        .map_err(|_| ApiError::unauthenticated("Invalid session; Failed to sign token"))
}

pub fn verify_jwt_session(token: &str, secret: &str) -> Result<JwtSessionData, ApiError> {
    let key = signing_key(secret)?;

    let session: JwtSessionData = token
        .verify_with_key(&key)
        .map_err(|_| ApiError::unauthenticated("Invalid session; Invalid token"))?;

    let now = Local::now().timestamp();
    if (session.exp - now).is_negative() {
        return Err(ApiError::unauthenticated("Invalid session; Token expired"));
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole) -> User {
        User {
            id: 7,
            email: String::from("cook@example.com"),
            username: String::from("cook"),
            first_name: String::from("Ada"),
            last_name: String::from("Cook"),
            role,
        }
    }

    #[test]
    fn signed_sessions_verify_with_the_same_secret() {
        let token = generate_jwt_session(&user(UserRole::Admin), "kitchen").expect("signed");
        let session: SessionData = verify_jwt_session(&token, "kitchen")
            .expect("valid token")
            .into();

        assert_eq!(session.user_id, 7);
        assert_eq!(session.username, "cook");
        assert_eq!(session.role, UserRole::Admin);
    }

    #[test]
    fn foreign_secrets_and_garbage_are_rejected() {
        let token = generate_jwt_session(&user(UserRole::User), "kitchen").expect("signed");

        assert!(verify_jwt_session(&token, "pantry").is_err());
        assert!(verify_jwt_session("not.a.token", "kitchen").is_err());
    }

    #[test]
    fn expired_sessions_are_rejected() {
        let key = signing_key("kitchen").expect("key");
        let mut claims = JwtSessionData::new(7, String::from("cook"), UserRole::User);
        claims.exp = Local::now().timestamp() - 60;
        let token = claims.sign_with_key(&key).expect("signed");

        assert_eq!(
            verify_jwt_session(&token, "kitchen").err(),
            Some(ApiError::unauthenticated("Invalid session; Token expired"))
        );
    }
}
