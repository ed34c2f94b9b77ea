use crate::types::{AppError, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use std::sync::{Arc, OnceLock};

/// One-way password hashing with Argon2id.
///
/// The work factor is fixed at construction. The default is Argon2id v1.3
/// with 19 MiB memory, 2 iterations and 1 lane, which costs about as much
/// as bcrypt at cost 12 on commodity hardware. Hashes are PHC strings and
/// carry their own parameters, so verification keeps working if the
/// defaults change.
#[derive(Clone)]
pub struct CredentialHasher {
    params: Params,
    // Hash of a throwaway secret, verified against when an email is unknown
    // so both paths spend the same time in the KDF.
    decoy: Arc<OnceLock<String>>,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialHasher {
    pub fn new() -> Self {
        Self {
            params: Params::DEFAULT,
            decoy: Arc::new(OnceLock::new()),
        }
    }

    /// Custom work factor (memory in KiB, iterations, lanes).
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| AppError::Internal(format!("Invalid Argon2 parameters: {}", e)))?;
        Ok(Self {
            params,
            decoy: Arc::new(OnceLock::new()),
        })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hashes a password, returning a PHC-formatted string.
    pub fn hash(&self, plaintext: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
    }

    /// Verifies a password against a stored hash. A malformed hash is a
    /// non-match, never an error.
    pub fn verify(&self, plaintext: &str, stored_hash: &str) -> bool {
        let parsed = match PasswordHash::new(stored_hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "stored password hash is malformed");
                return false;
            }
        };

        self.argon2()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }

    /// Burns one verification against a decoy hash. Always `false`.
    pub fn verify_decoy(&self, plaintext: &str) -> bool {
        let decoy = self
            .decoy
            .get_or_init(|| self.hash("decoy-credential").unwrap_or_default());
        self.verify(plaintext, decoy);
        false
    }

    /// [`hash`](Self::hash) on the blocking pool.
    pub async fn hash_blocking(&self, plaintext: String) -> Result<String> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
    }

    /// [`verify`](Self::verify) on the blocking pool. A panicked or
    /// cancelled task counts as a non-match.
    pub async fn verify_blocking(&self, plaintext: String, stored_hash: String) -> bool {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &stored_hash))
            .await
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "password verification task failed");
                false
            })
    }

    /// [`verify_decoy`](Self::verify_decoy) on the blocking pool.
    pub async fn verify_decoy_blocking(&self, plaintext: String) {
        let hasher = self.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || hasher.verify_decoy(&plaintext)).await {
            tracing::error!(error = %e, "decoy verification task failed");
        }
    }
}
