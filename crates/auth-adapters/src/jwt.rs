//! HS256 bearer tokens.
//!
//! The claims carry the user id (`sub`) and display name (`name`); nothing
//! else about the user is trusted from the token.

use std::time::Duration;

use chrono::Utc;
use domains::{DomainError, Identity, IdentityVerifier, Result, UserId};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Lifetime of tokens minted by the seed tool and tests.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 7);

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: UserId,
    name: String,
    iat: i64,
    exp: i64,
}

pub struct JwtIdentityVerifier {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtIdentityVerifier {
    pub fn new(secret: &SecretString) -> Self {
        let secret = secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Mints a token for `identity` that expires after `ttl`.
    pub fn issue(&self, identity: &Identity, ttl: Duration) -> Result<String> {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(ttl.as_secs())
            .map_err(|_| DomainError::Internal("token lifetime out of range".into()))?;

        self.sign(&Claims {
            sub: identity.id,
            name: identity.username.clone(),
            iat: now,
            exp: now.saturating_add(ttl),
        })
    }

    fn sign(&self, claims: &Claims) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|err| DomainError::Internal(err.to_string()))
    }
}

impl IdentityVerifier for JwtIdentityVerifier {
    fn verify(&self, token: &str) -> Result<Identity> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|err| {
            match err.kind() {
                ErrorKind::ExpiredSignature => debug!("rejected expired token"),
                other => debug!(reason = ?other, "rejected token"),
            }
            DomainError::Unauthenticated
        })?;

        let username = data.claims.name.trim();
        if username.is_empty() {
            return Err(DomainError::Unauthenticated);
        }

        Ok(Identity {
            id: data.claims.sub,
            username: username.to_owned(),
        })
    }
}
