use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use super::claims::{Claims, TokenKind};
use crate::config::JwtConfig;

#[derive(Debug, Error)]
pub enum TokenError {
    /// Bad signature, malformed, expired, foreign issuer/audience or wrong kind.
    #[error("invalid token")]
    Invalid,
    #[error("failed to sign token: {0}")]
    Sign(#[from] jsonwebtoken::errors::Error),
}

/// Signing and verification keys, built once from [`JwtConfig`].
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    verify_ttl: Duration,
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            access_ttl: Duration::minutes(cfg.ttl_minutes),
            refresh_ttl: Duration::minutes(cfg.refresh_ttl_minutes),
            verify_ttl: Duration::minutes(cfg.verify_ttl_minutes),
        }
    }

    fn sign_with(&self, subject: &str, kind: TokenKind, ttl: Duration) -> Result<String, TokenError> {
        let now = OffsetDateTime::now_utc();
        let exp = now + ttl;
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.unix_timestamp().max(0) as usize,
            exp: exp.unix_timestamp().max(0) as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(kind = ?kind, "jwt signed");
        Ok(token)
    }

    pub fn sign_access(&self, subject: &str) -> Result<String, TokenError> {
        self.sign_with(subject, TokenKind::Access, self.access_ttl)
    }

    pub fn sign_refresh(&self, subject: &str) -> Result<String, TokenError> {
        self.sign_with(subject, TokenKind::Refresh, self.refresh_ttl)
    }

    pub fn sign_verify(&self, subject: &str) -> Result<String, TokenError> {
        self.sign_with(subject, TokenKind::Verify, self.verify_ttl)
    }

    /// Decodes and validates signature, expiry, issuer and audience.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            debug!(error = %e, "jwt rejected");
            TokenError::Invalid
        })?;
        debug!(kind = ?data.claims.kind, "jwt verified");
        Ok(data.claims)
    }

    /// Like [`verify`](Self::verify) but also requires `kind` and a non-empty subject.
    pub fn verify_kind(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
        let claims = self.verify(token)?;
        if claims.kind != kind || claims.sub.is_empty() {
            return Err(TokenError::Invalid);
        }
        Ok(claims)
    }
}
