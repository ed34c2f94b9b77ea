use crate::types::{AppError, Claims, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};

/// Why a token was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token is invalid")]
    Invalid,
    #[error("token has expired")]
    Expired,
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid => AppError::Unauthorized("Invalid token".to_string()),
            TokenError::Expired => AppError::Unauthorized("Token has expired".to_string()),
        }
    }
}

/// Issues and verifies stateless session tokens.
///
/// Tokens are HMAC-signed JWTs carrying subject, email and role id. Nothing
/// is stored server side: a token is valid while its signature checks out
/// and `exp` has not passed. A role change does not revoke tokens already
/// issued; they carry the old role until they expire.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
}

impl TokenService {
    /// Creates a token service for one of the HMAC algorithms.
    pub fn new(secret: &str, algorithm: Algorithm) -> Result<Self> {
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(AppError::Validation(format!(
                "Unsupported signing algorithm {:?}: only HS256, HS384 and HS512 are allowed",
                algorithm
            )));
        }
        if secret.is_empty() {
            return Err(AppError::Validation(
                "JWT signing secret must not be empty".to_string(),
            ));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            algorithm,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Signs a token valid for `ttl_minutes` from now.
    pub fn issue(&self, subject_id: &str, email: &str, role_id: &str, ttl_minutes: i64) -> Result<String> {
        self.issue_at(subject_id, email, role_id, ttl_minutes, Utc::now())
    }

    pub(crate) fn issue_at(
        &self,
        subject_id: &str,
        email: &str,
        role_id: &str,
        ttl_minutes: i64,
        issued_at: DateTime<Utc>,
    ) -> Result<String> {
        let claims = Claims {
            sub: subject_id.to_string(),
            email: email.to_string(),
            role_id: role_id.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::minutes(ttl_minutes)).timestamp(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Checks signature and expiry, returning the claims.
    pub fn verify(&self, token: &str) -> std::result::Result<Claims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        // Expiry is exact: no grace window past `exp`.
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }

    /// Re-issues a still-valid token with the same claims and a fresh
    /// expiry. Expired or invalid tokens yield `None`.
    pub fn refresh(&self, old_token: &str, ttl_minutes: i64) -> Result<Option<String>> {
        let claims = match self.verify(old_token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(reason = %e, "refusing to refresh token");
                return Ok(None);
            }
        };

        self.issue(&claims.sub, &claims.email, &claims.role_id, ttl_minutes)
            .map(Some)
    }
}
