//! Bearer credentials.
//!
//! Issued at login next to the session token for callers that want a
//! stateless, signed statement of who logged in. Engine operations are
//! authorized by session only; a bearer is never accepted in its place.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vending_core::Identity;

use crate::error::{EngineError, EngineResult};

/// Bearer claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account id)
    pub sub: String,

    pub username: String,

    /// Always true for issued credentials
    pub authorized: bool,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// Unique identifier for this credential
    pub jti: String,
}

/// Signs and verifies HS256 bearer credentials.
pub struct BearerAuthority {
    secret: String,
    lifetime_secs: i64,
}

impl BearerAuthority {
    pub fn new(secret: String, lifetime_secs: i64) -> Self {
        BearerAuthority {
            secret,
            lifetime_secs,
        }
    }

    /// Issues a credential for `identity`.
    pub fn issue(&self, identity: &Identity) -> EngineResult<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.lifetime_secs);

        let claims = Claims {
            sub: identity.account_id.clone(),
            username: identity.username.clone(),
            authorized: true,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| EngineError::Internal(format!("Failed to issue bearer credential: {e}")))
    }

    /// Checks signature and expiry. Any failure is `Unauthorized`.
    pub fn verify(&self, token: &str) -> EngineResult<Claims> {
        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| {
            tracing::warn!(error = %e, "Rejected bearer credential");
            EngineError::Unauthorized
        })?;

        if !token_data.claims.authorized {
            return Err(EngineError::Unauthorized);
        }

        Ok(token_data.claims)
    }
}
