//! HS256 JSON Web Token authenticator.
//!
//! The token's `sub` claim carries the numeric user id.

use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::domain::{AuthError, Authenticator, UserId};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    /// Expiry (Unix seconds)
    exp: u64,
}

/// Verifies HS256 tokens signed with a shared secret.
pub struct JwtAuthenticator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtAuthenticator {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
        }
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<UserId, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let data = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        match data.claims.sub.parse::<i64>() {
            Ok(id) if id > 0 => Ok(UserId::new(id)),
            _ => Err(AuthError::InvalidSubject(data.claims.sub)),
        }
    }
}

/// Sign a token for `user_id` that expires after `ttl`.
pub fn issue_token(
    secret: &str,
    user_id: UserId,
    ttl: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0);
    let claims = Claims {
        sub: user_id.to_string(),
        exp: now + ttl.as_secs(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}
