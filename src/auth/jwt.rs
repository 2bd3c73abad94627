use std::time::Duration;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};

use crate::config::JwtConfig;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub exp: usize,
    pub iat: usize,
    pub kind: TokenKind,
}

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            access_ttl_seconds,
            refresh_ttl_seconds,
        } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl: Duration::from_secs(access_ttl_seconds as u64),
            refresh_ttl: Duration::from_secs(refresh_ttl_seconds as u64),
        }
    }
}

impl JwtKeys {
    fn sign_with_kind(&self, user_id: i64, kind: TokenKind) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            kind,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id, kind = ?kind, "jwt signed");
        Ok(token)
    }

    pub fn sign_access(&self, user_id: i64) -> anyhow::Result<String> {
        self.sign_with_kind(user_id, TokenKind::Access)
    }

    pub fn sign_refresh(&self, user_id: i64) -> anyhow::Result<String> {
        self.sign_with_kind(user_id, TokenKind::Refresh)
    }

    /// Decode and check signature and expiry. The two decode failure classes
    /// surface as distinct errors; nothing else about the token is inspected.
    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        debug!(user_id = data.claims.sub, kind = ?data.claims.kind, "jwt verified");
        Ok(data.claims)
    }

    /// `verify`, plus a check that the token was minted for `kind`. A
    /// mismatched kind reads as an invalid token to the caller.
    pub fn verify_kind(&self, token: &str, kind: TokenKind) -> Result<Claims, ApiError> {
        let claims = self.verify(token)?;
        if claims.kind != kind {
            return Err(ApiError::TokenInvalid);
        }
        Ok(claims)
    }
}

/// Extracts the bearer access token from the Authorization header and
/// resolves it to a user id. Any absent or malformed header reads as an
/// invalid token; only expiry is reported separately.
pub struct AuthUser(pub i64);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::TokenInvalid)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::TokenInvalid)?;

        let claims = keys.verify_kind(token, TokenKind::Access).map_err(|err| {
            warn!(error = %err, "rejected access token");
            err
        })?;

        Ok(AuthUser(claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys() -> JwtKeys {
        JwtKeys::from_ref(&AppState::fake())
    }

    #[tokio::test]
    async fn access_token_round_trips_subject() {
        let keys = make_keys();
        let token = keys.sign_access(42).expect("sign access");
        let claims = keys.verify(&token).expect("verify token");
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.kind, TokenKind::Access);
    }

    #[tokio::test]
    async fn refresh_token_round_trips_kind() {
        let keys = make_keys();
        let token = keys.sign_refresh(42).expect("sign refresh");
        let claims = keys
            .verify_kind(&token, TokenKind::Refresh)
            .expect("verify refresh");
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.kind, TokenKind::Refresh);
    }

    #[tokio::test]
    async fn refresh_check_rejects_access_token() {
        let keys = make_keys();
        let token = keys.sign_access(42).expect("sign access");
        let err = keys.verify_kind(&token, TokenKind::Refresh).unwrap_err();
        assert!(matches!(err, ApiError::TokenInvalid));
    }

    #[tokio::test]
    async fn expired_token_is_distinguished() {
        let keys = make_keys();
        // Back-date past the validator's default leeway.
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub: 7,
            iat: (now - 600) as usize,
            exp: (now - 300) as usize,
            kind: TokenKind::Refresh,
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).expect("encode");
        let err = keys.verify(&token).unwrap_err();
        assert!(matches!(err, ApiError::TokenExpired));
    }

    #[tokio::test]
    async fn garbage_token_is_invalid() {
        let keys = make_keys();
        let err = keys.verify("not-a-token").unwrap_err();
        assert!(matches!(err, ApiError::TokenInvalid));
    }

    #[tokio::test]
    async fn token_signed_with_other_secret_is_invalid() {
        let keys = make_keys();
        let other = JwtKeys {
            encoding: EncodingKey::from_secret(b"completely-different"),
            decoding: DecodingKey::from_secret(b"completely-different"),
            access_ttl: Duration::from_secs(300),
            refresh_ttl: Duration::from_secs(3600),
        };
        let token = other.sign_access(7).expect("sign access");
        let err = keys.verify(&token).unwrap_err();
        assert!(matches!(err, ApiError::TokenInvalid));
    }
}
