//! Password hashing using Argon2id
//!
//! Uses Argon2id with OWASP-recommended parameters by default. Hashes are
//! PHC strings, so verification reads the parameters back from the hash.
//!
//! # Example
//!
//! ```rust,ignore
//! use registrar::auth::{PasswordConfig, PasswordHasher};
//!
//! let hasher = PasswordHasher::new(PasswordConfig::default())?;
//! let hash = hasher.hash("my_secure_password")?;
//!
//! assert!(hasher.verify("my_secure_password", &hash)?);
//! assert!(!hasher.verify("wrong_password", &hash)?);
//! ```

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as Argon2Hasher, PasswordVerifier,
        SaltString,
    },
    Algorithm, Argon2, Params, Version,
};

use crate::auth::config::PasswordConfig;
use crate::error::Error;

const DUMMY_PASSWORD: &str = "registrar-dummy-password";

/// Password hasher using Argon2id
#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
    min_password_length: usize,
    /// Hash verified against when the account does not exist, so unknown
    /// and known accounts cost the same
    dummy_hash: String,
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("m_cost", &self.params.m_cost())
            .field("t_cost", &self.params.t_cost())
            .field("p_cost", &self.params.p_cost())
            .field("min_password_length", &self.min_password_length)
            .finish_non_exhaustive()
    }
}

impl PasswordHasher {
    /// Create a hasher from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the Argon2 parameters are out of range.
    pub fn new(config: PasswordConfig) -> Result<Self, Error> {
        let params = Params::new(
            config.memory_cost_kib,
            config.time_cost,
            config.parallelism,
            None, // default output length
        )
        .map_err(|e| {
            Error::Config(Box::new(figment::Error::from(format!(
                "Invalid Argon2 parameters: {}",
                e
            ))))
        })?;

        let dummy_hash = hash_with(&params, DUMMY_PASSWORD)?;

        Ok(Self {
            params,
            min_password_length: config.min_password_length,
            dummy_hash,
        })
    }

    /// Hash a password into a PHC string.
    ///
    /// # Errors
    ///
    /// [`Error::ValidationError`] when the password is shorter than
    /// `min_password_length`, [`Error::Auth`] on a hashing failure.
    pub fn hash(&self, password: &str) -> Result<String, Error> {
        if password.chars().count() < self.min_password_length {
            return Err(Error::ValidationError(format!(
                "Password must be at least {} characters",
                self.min_password_length
            )));
        }

        hash_with(&self.params, password)
    }

    /// Verify a password against a PHC hash in constant time.
    ///
    /// Returns `Ok(false)` for a mismatch and an error only when the hash
    /// itself is malformed.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, Error> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| Error::Auth(format!("Invalid password hash format: {}", e)))?;

        // parameters are read from the hash
        let argon2 = Argon2::default();

        match argon2.verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(Error::Auth(format!("Password verification failed: {}", e))),
        }
    }

    /// Burn one verification against the dummy hash. Always `false`.
    pub fn verify_dummy(&self, password: &str) -> bool {
        let _ = self.verify(password, &self.dummy_hash);
        false
    }

    /// Whether `hash` was produced with different parameters than ours.
    pub fn needs_rehash(&self, hash: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(hash) else {
            return true;
        };

        if parsed_hash.algorithm != Algorithm::Argon2id.ident() {
            return true;
        }

        // 0x13
        if parsed_hash.version != Some(19) {
            return true;
        }

        let param = |name: &str| {
            parsed_hash
                .params
                .iter()
                .find(|(k, _)| k.as_str() == name)
                .and_then(|(_, v)| v.decimal().ok())
        };

        param("m") != Some(self.params.m_cost())
            || param("t") != Some(self.params.t_cost())
            || param("p") != Some(self.params.p_cost())
    }

    pub fn min_password_length(&self) -> usize {
        self.min_password_length
    }
}

fn hash_with(params: &Params, password: &str) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.clone());

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Auth(format!("Failed to hash password: {}", e)))
}

#[cfg(test)]
pub(crate) fn cheap_config() -> PasswordConfig {
    PasswordConfig {
        memory_cost_kib: 1024,
        time_cost: 1,
        parallelism: 1,
        min_password_length: 8,
    }
}
