//! Bearer-token validation and lookup-token minting.
//!
//! End-user tokens are issued elsewhere; this service only verifies them.
//! Tokens are HS256-signed JWTs whose `sub` is the caller's 24-hex object id
//! and whose `jti` names the issuance purpose, which must be `"access"`.
//!
//! The same secret signs the short-lived assertion the orphan reconciler
//! presents to the identity service.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use storyhub_core::types::ObjectId;

/// Purpose claim every accepted token must carry.
pub const ACCESS_TOKEN_PURPOSE: &str = "access";

/// JWT claims as issued by the account service.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject: the principal's hex object id.
    pub sub: String,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Issuance purpose.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

/// Configuration for JWT validation and lookup-token minting.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret shared with the account service.
    pub secret: String,
    /// Lifetime of reconciler lookup tokens in minutes (default: 5).
    pub lookup_token_expiry_mins: i64,
}

/// Default lookup token expiry in minutes.
const DEFAULT_LOOKUP_EXPIRY_MINS: i64 = 5;

impl JwtConfig {
    /// Load JWT configuration from environment variables.
    ///
    /// | Env Var                  | Required | Default |
    /// |--------------------------|----------|---------|
    /// | `JWT_SECRET`             | **yes**  | --      |
    /// | `JWT_LOOKUP_EXPIRY_MINS` | no       | `5`     |
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is not set or is empty.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let lookup_token_expiry_mins: i64 = std::env::var("JWT_LOOKUP_EXPIRY_MINS")
            .unwrap_or_else(|_| DEFAULT_LOOKUP_EXPIRY_MINS.to_string())
            .parse()
            .expect("JWT_LOOKUP_EXPIRY_MINS must be a valid i64");

        Self {
            secret,
            lookup_token_expiry_mins,
        }
    }
}

/// Why a bearer token was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token")]
    MalformedToken,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token expired")]
    TokenExpired,

    #[error("token subject is not a valid user id")]
    InvalidSubject,

    #[error("token is not an access token")]
    WrongTokenType,
}

/// Validate an `Authorization` header value and return the principal.
///
/// The value must start with the literal `"Bearer "` prefix.
pub fn validate_bearer(header: &str, config: &JwtConfig) -> Result<ObjectId, TokenError> {
    let token = header
        .strip_prefix("Bearer ")
        .ok_or(TokenError::MalformedToken)?;
    validate_token(token, config)
}

/// Verify signature and expiry of a raw token, then check purpose and subject.
pub fn validate_token(token: &str, config: &JwtConfig) -> Result<ObjectId, TokenError> {
    let mut validation = Validation::default(); // HS256, validates exp
    validation.leeway = 0;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        ErrorKind::ExpiredSignature => TokenError::TokenExpired,
        _ => TokenError::MalformedToken,
    })?;

    let claims = data.claims;
    if claims.jti.as_deref() != Some(ACCESS_TOKEN_PURPOSE) {
        return Err(TokenError::WrongTokenType);
    }

    claims.sub.parse().map_err(|_| TokenError::InvalidSubject)
}

/// Mint the short-lived assertion used to look `subject` up in the identity
/// service.
pub fn mint_lookup_token(
    subject: ObjectId,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: subject.to_hex(),
        exp: now + config.lookup_token_expiry_mins * 60,
        iat: Some(now),
        jti: Some(ACCESS_TOKEN_PURPOSE.to_string()),
    };

    encode(
        &Header::default(), // HS256
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}
