//! Bearer token issuing and validation
//!
//! [`JwtIssuer`] signs HMAC JWTs for authenticated users and validates them
//! again on the admin-gated routes. Only the symmetric algorithms are
//! accepted, with a secret of at least [`MIN_SECRET_BYTES`].

use std::sync::Arc;

use axum::http::{header, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::config::JwtConfig;
use crate::error::Error;

/// Shortest accepted HMAC secret
pub const MIN_SECRET_BYTES: usize = 32;

/// Claims carried by every issued token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id
    pub sub: String,

    /// Token ID (uuid v4)
    pub jti: String,

    pub email: String,

    #[serde(rename = "userId")]
    pub user_id: i32,

    #[serde(default)]
    pub roles: Vec<String>,

    pub iss: String,

    pub aud: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Check if the token has a specific role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Who a token is issued for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i32,
    pub email: String,
    pub roles: Vec<String>,
}

/// A signed token and the instant it stops being accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Token generation
pub trait TokenIssuer: Send + Sync + Clone + 'static {
    /// Sign a token for `identity`
    fn issue(&self, identity: &Identity) -> Result<IssuedToken, Error>;
}

/// Token validation
pub trait TokenValidator: Send + Sync + Clone + 'static {
    /// Validate a token and extract claims
    fn validate(&self, token: &str) -> Result<Claims, Error>;
}

/// HMAC JWT issuer and validator
#[derive(Clone)]
pub struct JwtIssuer {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    algorithm: Algorithm,
    validation: Validation,
    issuer: String,
    audience: String,
    lifetime: Duration,
}

impl std::fmt::Debug for JwtIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtIssuer")
            .field("algorithm", &self.algorithm)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl JwtIssuer {
    /// Create an issuer from configuration.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] for an unsupported algorithm, a secret shorter
    /// than [`MIN_SECRET_BYTES`] or a non-positive lifetime.
    pub fn new(config: &JwtConfig) -> Result<Self, Error> {
        let algorithm = parse_algorithm(&config.algorithm)?;

        if config.secret.len() < MIN_SECRET_BYTES {
            return Err(config_error(format!(
                "auth.jwt.secret must be at least {} bytes (got {})",
                MIN_SECRET_BYTES,
                config.secret.len()
            )));
        }
        if config.duration_hours <= 0 {
            return Err(config_error(format!(
                "auth.jwt.duration_hours must be positive (got {})",
                config.duration_hours
            )));
        }

        let secret = config.secret.as_bytes();

        let mut validation = Validation::new(algorithm);
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[&config.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        Ok(Self {
            encoding_key: Arc::new(EncodingKey::from_secret(secret)),
            decoding_key: Arc::new(DecodingKey::from_secret(secret)),
            algorithm,
            validation,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            lifetime: Duration::hours(config.duration_hours),
        })
    }

    fn claims_for(&self, identity: &Identity, now: DateTime<Utc>) -> Claims {
        Claims {
            sub: identity.user_id.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
            email: identity.email.clone(),
            user_id: identity.user_id,
            roles: identity.roles.clone(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        }
    }
}

impl TokenIssuer for JwtIssuer {
    fn issue(&self, identity: &Identity) -> Result<IssuedToken, Error> {
        let now = Utc::now();
        let claims = self.claims_for(identity, now);
        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding_key)?;

        Ok(IssuedToken {
            token,
            expires_at: now + self.lifetime,
        })
    }
}

impl TokenValidator for JwtIssuer {
    fn validate(&self, token: &str) -> Result<Claims, Error> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }
}

/// Extract the token from an `Authorization: Bearer ...` header
pub fn extract_token(headers: &HeaderMap) -> Result<String, Error> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::Unauthorized("Missing Authorization header".to_string()))?;

    match auth_header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        _ => Err(Error::Unauthorized(
            "Invalid Authorization header format".to_string(),
        )),
    }
}

fn parse_algorithm(alg: &str) -> Result<Algorithm, Error> {
    match alg.to_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        _ => Err(config_error(format!("Unsupported JWT algorithm: {}", alg))),
    }
}

fn config_error(message: String) -> Error {
    Error::Config(Box::new(figment::Error::from(message)))
}

#[cfg(test)]
pub(crate) fn test_config() -> JwtConfig {
    JwtConfig {
        secret: "0123456789abcdef0123456789abcdef".to_string(),
        ..JwtConfig::default()
    }
}
