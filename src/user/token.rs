//! Stateless identity tokens.
//!
//! Tokens are HS256 JWTs carrying the decimal user id (`sub`) and an expiry
//! (`exp`).
//! Nothing is persisted: a token is valid as long as its signature verifies
//! against the server secret and it has not expired.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ServiceError;

const GENERATED_SECRET_LEN: usize = 64;

#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    sub: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

/// A random A-z0-9 secret, for when none is configured.
pub fn generate_secret() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_SECRET_LEN)
        .map(char::from)
        .collect()
}

impl TokenService {
    pub fn new<T: AsRef<[u8]>>(secret: T, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
            validation,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user_id: usize) -> Result<IssuedToken> {
        let expires_at = Utc::now()
            .checked_add_signed(self.ttl)
            .context("Token expiry out of range")?;
        let value = self.issue_expiring_at(user_id, expires_at)?;
        Ok(IssuedToken { value, expires_at })
    }

    pub fn issue_expiring_at(&self, user_id: usize, expires_at: DateTime<Utc>) -> Result<String> {
        let claims = TokenClaims {
            sub: user_id.to_string(),
            iat: Utc::now().timestamp(),
            exp: expires_at.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .context("Failed to sign token")
    }

    /// Resolves a token to the user id it was issued for.
    ///
    /// Every failure (garbage, bad signature, expiry, wrong algorithm) maps to
    /// the same [`ServiceError::Unauthenticated`].
    pub fn verify(&self, token: &str) -> Result<usize, ServiceError> {
        if token.is_empty() {
            return Err(ServiceError::Unauthenticated);
        }
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|err| {
                debug!("Rejected token: {}", err);
                ServiceError::Unauthenticated
            })?;
        data.claims.sub.parse::<usize>().map_err(|_| {
            debug!("Rejected token with subject {:?}", data.claims.sub);
            ServiceError::Unauthenticated
        })
    }
}
