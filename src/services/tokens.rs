//! Stateless JWT access/refresh tokens.
//!
//! Tokens carry only the user id, their lifetime and a type discriminator.
//! Whether the user may still act is decided by the caller against the
//! database on every use.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::models::tokens::{Claims, TokenPair, TokenType};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Invalid token")]
    Invalid,

    #[error("Token has expired")]
    Expired,

    #[error("Expected {expected} token, got {found} token")]
    WrongType { expected: TokenType, found: TokenType },

    #[error("Token lifetime is out of range")]
    Lifetime,

    #[error("Failed to sign token: {0}")]
    Encode(#[from] jsonwebtoken::errors::Error),
}

pub struct TokenService {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(config: &JwtConfig) -> Self {
        Self::with_lifetimes(
            config.secret.as_bytes(),
            config.algorithm,
            Duration::minutes(config.access_token_minutes),
            Duration::days(config.refresh_token_days),
        )
    }

    pub fn with_lifetimes(
        secret: &[u8],
        algorithm: Algorithm,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn issue_pair(&self, user_id: Uuid) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue(user_id, TokenType::Access)?,
            refresh_token: self.issue(user_id, TokenType::Refresh)?,
            token_type: "bearer",
            expires_in: self.access_ttl.num_seconds(),
        })
    }

    pub fn issue(&self, user_id: Uuid, token_type: TokenType) -> Result<String, TokenError> {
        let now = Utc::now();
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            sub: user_id,
            iat: now.timestamp(),
            exp: now
                .checked_add_signed(ttl)
                .ok_or(TokenError::Lifetime)?
                .timestamp(),
            token_type,
        };

        debug!(%user_id, %token_type, "issuing token");

        Ok(encode(
            &Header::new(self.algorithm),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Verify signature and expiry, then require the given token type.
    pub fn decode(&self, token: &str, expected: TokenType) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })?
            .claims;

        if claims.token_type != expected {
            return Err(TokenError::WrongType {
                expected,
                found: claims.token_type,
            });
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str) -> TokenService {
        TokenService::with_lifetimes(
            secret.as_bytes(),
            Algorithm::HS256,
            Duration::minutes(30),
            Duration::days(7),
        )
    }

    #[test]
    fn pair_round_trips_with_matching_types() {
        let tokens = service("test-secret-key-12345");
        let user_id = Uuid::new_v4();

        let pair = tokens.issue_pair(user_id).unwrap();
        assert_eq!(pair.token_type, "bearer");
        assert_eq!(pair.expires_in, 30 * 60);

        let access = tokens.decode(&pair.access_token, TokenType::Access).unwrap();
        assert_eq!(access.sub, user_id);
        assert_eq!(access.token_type, TokenType::Access);
        assert!(access.exp > access.iat);

        let refresh = tokens
            .decode(&pair.refresh_token, TokenType::Refresh)
            .unwrap();
        assert_eq!(refresh.sub, user_id);
        assert!(refresh.exp > access.exp);
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let tokens = service("test-secret-key-12345");
        let pair = tokens.issue_pair(Uuid::new_v4()).unwrap();

        let err = tokens
            .decode(&pair.refresh_token, TokenType::Access)
            .unwrap_err();
        assert!(matches!(
            err,
            TokenError::WrongType {
                expected: TokenType::Access,
                found: TokenType::Refresh
            }
        ));

        let err = tokens
            .decode(&pair.access_token, TokenType::Refresh)
            .unwrap_err();
        assert!(matches!(err, TokenError::WrongType { .. }));
    }

    #[test]
    fn different_secrets_reject() {
        let issuer = service("secret1");
        let verifier = service("secret2");
        let token = issuer.issue(Uuid::new_v4(), TokenType::Access).unwrap();

        assert!(matches!(
            verifier.decode(&token, TokenType::Access),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn garbage_is_invalid() {
        let tokens = service("secret");
        assert!(matches!(
            tokens.decode("invalid.token.here", TokenType::Access),
            Err(TokenError::Invalid)
        ));
        assert!(matches!(
            tokens.decode("", TokenType::Access),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let tokens = TokenService::with_lifetimes(
            b"secret",
            Algorithm::HS256,
            Duration::minutes(-5),
            Duration::days(7),
        );
        let token = tokens.issue(Uuid::new_v4(), TokenType::Access).unwrap();

        assert!(matches!(
            tokens.decode(&token, TokenType::Access),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn unrepresentable_expiry_is_an_error() {
        let tokens = TokenService::with_lifetimes(
            b"secret",
            Algorithm::HS256,
            Duration::minutes(30),
            Duration::days(100_000_000),
        );

        assert!(tokens.issue(Uuid::new_v4(), TokenType::Access).is_ok());
        assert!(matches!(
            tokens.issue_pair(Uuid::new_v4()),
            Err(TokenError::Lifetime)
        ));
    }

    #[test]
    fn algorithm_mismatch_is_invalid() {
        let hs512 = TokenService::with_lifetimes(
            b"secret",
            Algorithm::HS512,
            Duration::minutes(30),
            Duration::days(7),
        );
        let token = hs512.issue(Uuid::new_v4(), TokenType::Access).unwrap();

        assert!(matches!(
            service("secret").decode(&token, TokenType::Access),
            Err(TokenError::Invalid)
        ));
    }
}
