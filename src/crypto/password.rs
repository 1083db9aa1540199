use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, ParamsBuilder, Version,
};
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;
use zeroize::Zeroizing;

/// The memory cost for Argon2 in MB.
const ARGON2_MEMORY_MB: u32 = 19;
/// The number of iterations for Argon2.
const ARGON2_ITERATIONS: u32 = 3;
/// The parallelism factor for Argon2.
const ARGON2_PARALLELISM: u32 = 6;
/// Salt length in bytes.
const SALT_LEN: usize = 16;

/// Errors raised while hashing or verifying a password.
#[derive(Error, Debug)]
pub enum PasswordError {
    /// The hash could not be produced at all.
    #[error("password hashing failed: {0}")]
    Hashing(String),

    /// The plaintext does not match the stored hash.
    #[error("password does not match")]
    Mismatch,

    /// The stored hash is not an Argon2 PHC string.
    #[error("malformed password hash: {0}")]
    MalformedHash(String),
}

/// Argon2 cost parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HashCost {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: ARGON2_MEMORY_MB * 1024,
            iterations: ARGON2_ITERATIONS,
            parallelism: ARGON2_PARALLELISM,
        }
    }
}

/// Salted, cost-tunable password hasher (Argon2id).
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl CredentialHasher {
    /// Builds a hasher with the given cost.
    ///
    /// # Errors
    ///
    /// Returns `PasswordError::Hashing` when Argon2 rejects the parameters.
    pub fn new(cost: HashCost) -> Result<Self, PasswordError> {
        let params = ParamsBuilder::new()
            .m_cost(cost.memory_kib)
            .t_cost(cost.iterations)
            .p_cost(cost.parallelism)
            .build()
            .map_err(|e| PasswordError::Hashing(format!("Argon2 params: {}", e)))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hashes a password into a PHC string with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let password_bytes = Zeroizing::new(password.as_bytes().to_vec());

        let mut salt_bytes = [0u8; SALT_LEN];
        OsRng
            .try_fill_bytes(&mut salt_bytes)
            .map_err(|e| PasswordError::Hashing(format!("Failed to generate salt: {}", e)))?;

        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| PasswordError::Hashing(format!("Salt encoding error: {}", e)))?;

        let password_hash = self
            .argon2
            .hash_password(&password_bytes, &salt)
            .map_err(|e| PasswordError::Hashing(format!("Argon2 hash error: {}", e)))?
            .to_string();

        tracing::debug!("Password hashed successfully with Argon2");
        Ok(password_hash)
    }

    /// Verifies a password against a stored hash.
    ///
    /// The salt and cost are read from `hash`, so hashes produced under an
    /// older cost keep verifying.
    pub fn verify(&self, password: &str, hash: &str) -> Result<(), PasswordError> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| PasswordError::MalformedHash(e.to_string()))?;

        let password_bytes = Zeroizing::new(password.as_bytes().to_vec());
        let result = self.argon2.verify_password(&password_bytes, &parsed_hash);
        tracing::debug!("Password verification completed");

        match result {
            Ok(()) => Ok(()),
            Err(password_hash::Error::Password) => Err(PasswordError::Mismatch),
            Err(e) => Err(PasswordError::MalformedHash(e.to_string())),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_hasher() -> CredentialHasher {
    CredentialHasher::new(HashCost {
        memory_kib: 256,
        iterations: 1,
        parallelism: 1,
    })
    .expect("low-cost params are valid")
}
