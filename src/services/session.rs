// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session lifecycle: token issuance, authentication, refresh and logout.
//!
//! A session is identified by a random session id (`ssid`) embedded in both
//! the access and the refresh token. The session is live only while the
//! cache holds `users:ssid:{ssid}`; deleting that key revokes every token of
//! the session regardless of token expiry.
//!
//! Access and refresh tokens are HS256 JWTs signed with two different keys,
//! both derived from the configured root key with HKDF-SHA256.

use crate::cache::{Cache, CacheError};
use crate::config::Config;
use hkdf::Hkdf;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const ACCESS_KEY_LABEL: &[u8] = b"swingtrack access-token v1";
const REFRESH_KEY_LABEL: &[u8] = b"swingtrack refresh-token v1";

/// Claims carried by both token classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id
    pub uid: i64,
    /// Session id
    pub ssid: String,
    /// SHA-256 fingerprint (hex) of the User-Agent the session was issued to
    pub ua: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Tokens returned on login.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub ssid: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("no token presented")]
    Missing,

    #[error("token is malformed or has a bad signature")]
    Malformed,

    #[error("token has expired")]
    Expired,

    #[error("token was issued to a different client")]
    UserAgentMismatch,

    #[error("session has been revoked")]
    Revoked,

    #[error("failed to sign token: {0}")]
    Signing(String),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

struct SigningKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKey {
    fn derive(root: &[u8], label: &[u8]) -> Result<Self, AuthError> {
        let mut okm = [0u8; 32];
        Hkdf::<Sha256>::new(None, root)
            .expand(label, &mut okm)
            .map_err(|e| AuthError::Signing(e.to_string()))?;
        Ok(Self {
            encoding: EncodingKey::from_secret(&okm),
            decoding: DecodingKey::from_secret(&okm),
        })
    }
}

/// Issues and validates session tokens. Holds no session state itself.
#[derive(Clone)]
pub struct SessionManager {
    cache: Arc<dyn Cache>,
    access: Arc<SigningKey>,
    refresh: Arc<SigningKey>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

pub fn session_key(ssid: &str) -> String {
    format!("users:ssid:{ssid}")
}

/// Hex SHA-256 of a User-Agent header value.
pub fn user_agent_fingerprint(user_agent: &str) -> String {
    hex::encode(Sha256::digest(user_agent.as_bytes()))
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

impl SessionManager {
    pub fn new(config: &Config, cache: Arc<dyn Cache>) -> Result<Self, AuthError> {
        Ok(Self {
            cache,
            access: Arc::new(SigningKey::derive(&config.jwt_signing_key, ACCESS_KEY_LABEL)?),
            refresh: Arc::new(SigningKey::derive(&config.jwt_signing_key, REFRESH_KEY_LABEL)?),
            access_ttl: config.access_token_ttl,
            refresh_ttl: config.refresh_token_ttl,
        })
    }

    /// Start a new session and mint its access and refresh tokens.
    pub async fn issue_login_tokens(
        &self,
        user_id: i64,
        user_agent: &str,
    ) -> Result<TokenPair, AuthError> {
        let ssid = uuid::Uuid::new_v4().to_string();
        let ua = user_agent_fingerprint(user_agent);

        self.cache
            .set(&session_key(&ssid), &user_id.to_string(), self.refresh_ttl)
            .await?;

        let access_token = self.mint(&self.access, user_id, &ssid, &ua, self.access_ttl)?;
        let refresh_token = self.mint(&self.refresh, user_id, &ssid, &ua, self.refresh_ttl)?;

        tracing::info!(user_id, ssid = %ssid, "Session started");

        Ok(TokenPair {
            access_token,
            refresh_token,
            ssid,
        })
    }

    /// Validate an access token presented with `user_agent`.
    pub async fn authenticate(
        &self,
        token: &str,
        user_agent: &str,
    ) -> Result<SessionClaims, AuthError> {
        let claims = Self::verify(&self.access, token)?;
        self.check_bound(&claims, user_agent).await?;
        Ok(claims)
    }

    /// Exchange a refresh token for a new access token on the same session.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        user_agent: &str,
    ) -> Result<String, AuthError> {
        let claims = Self::verify(&self.refresh, refresh_token)?;
        self.check_bound(&claims, user_agent).await?;

        tracing::debug!(user_id = claims.uid, ssid = %claims.ssid, "Access token refreshed");
        self.mint(&self.access, claims.uid, &claims.ssid, &claims.ua, self.access_ttl)
    }

    /// Revoke the session. Idempotent.
    pub async fn logout(&self, ssid: &str) -> Result<(), AuthError> {
        let removed = self.cache.delete(&session_key(ssid)).await?;
        tracing::info!(ssid = %ssid, was_active = removed, "Session ended");
        Ok(())
    }

    fn mint(
        &self,
        key: &SigningKey,
        uid: i64,
        ssid: &str,
        ua: &str,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        let iat = now_secs();
        let claims = SessionClaims {
            uid,
            ssid: ssid.to_string(),
            ua: ua.to_string(),
            iat,
            exp: iat + ttl.as_secs() as i64,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &key.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Signature and expiry only; never touches the cache.
    fn verify(key: &SigningKey, token: &str) -> Result<SessionClaims, AuthError> {
        if token.is_empty() {
            return Err(AuthError::Missing);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        decode::<SessionClaims>(token, &key.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Malformed,
            })
    }

    /// Device binding first, then session liveness.
    async fn check_bound(
        &self,
        claims: &SessionClaims,
        user_agent: &str,
    ) -> Result<(), AuthError> {
        if claims.ua != user_agent_fingerprint(user_agent) {
            return Err(AuthError::UserAgentMismatch);
        }

        match self.cache.get(&session_key(&claims.ssid)).await? {
            Some(uid) if uid == claims.uid.to_string() => Ok(()),
            _ => Err(AuthError::Revoked),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    const UA: &str = "SwingTrack/2.1 (iPhone; iOS 17.4)";

    fn manager() -> (SessionManager, MemoryCache) {
        let cache = MemoryCache::new();
        let sessions =
            SessionManager::new(&Config::test_default(), Arc::new(cache.clone())).unwrap();
        (sessions, cache)
    }

    #[test]
    fn test_fingerprint_is_stable_hex() {
        let fp = user_agent_fingerprint(UA);
        assert_eq!(fp.len(), 64);
        assert_eq!(fp, user_agent_fingerprint(UA));
        assert_ne!(fp, user_agent_fingerprint("curl/8.0"));
    }

    #[tokio::test]
    async fn test_access_and_refresh_keys_differ() {
        let (sessions, _) = manager();
        let pair = sessions.issue_login_tokens(1, UA).await.unwrap();

        assert!(matches!(
            sessions.authenticate(&pair.refresh_token, UA).await,
            Err(AuthError::Malformed)
        ));
        assert!(matches!(
            sessions.refresh(&pair.access_token, UA).await,
            Err(AuthError::Malformed)
        ));
    }

    #[tokio::test]
    async fn test_malformed_token_rejected_without_cache_access() {
        let (sessions, cache) = manager();
        let before = cache.op_count();

        assert!(matches!(
            sessions.authenticate("not.a.jwt", UA).await,
            Err(AuthError::Malformed)
        ));
        assert!(matches!(
            sessions.authenticate("", UA).await,
            Err(AuthError::Missing)
        ));
        assert_eq!(cache.op_count(), before);
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let (sessions, _) = manager();
        let past = now_secs() - 120;
        let claims = SessionClaims {
            uid: 1,
            ssid: "s".to_string(),
            ua: user_agent_fingerprint(UA),
            iat: past - 60,
            exp: past,
        };
        let token =
            encode(&Header::new(Algorithm::HS256), &claims, &sessions.access.encoding).unwrap();

        assert!(matches!(
            sessions.authenticate(&token, UA).await,
            Err(AuthError::Expired)
        ));
    }
}
