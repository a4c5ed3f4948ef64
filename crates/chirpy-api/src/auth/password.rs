/// Password hashing and verification using Argon2id
///
/// Hashes are emitted in PHC string format, which embeds the algorithm,
/// version, cost parameters, salt and digest:
///
/// `$argon2id$v=19$m=131072,t=4,p=2$<salt>$<digest>`
///
/// Verification reads the parameters back out of the stored string, so the
/// configured cost can change without invalidating existing hashes.
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};
use chirpy_core::{AuthConfig, ErrorKind};
use thiserror::Error;

/// Password hashing and verification errors
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,

    #[error("Password check did not complete: {0}")]
    VerificationFailed(String),
}

impl PasswordError {
    /// A stored hash that cannot be read is a server-side fault, never bad input
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Internal
    }
}

/// Argon2id cost parameters
///
/// Always supplied explicitly; nothing here is derived from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordConfig {
    /// Memory cost in KiB
    pub memory_cost: u32,
    /// Time cost (iterations)
    pub time_cost: u32,
    /// Parallelism (lanes)
    pub parallelism: u32,
    /// Output length in bytes
    pub output_len: usize,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self::from(&AuthConfig::default())
    }
}

impl From<&AuthConfig> for PasswordConfig {
    fn from(config: &AuthConfig) -> Self {
        Self {
            memory_cost: config.argon2_memory_kib,
            time_cost: config.argon2_iterations,
            parallelism: config.argon2_parallelism,
            output_len: 32,
        }
    }
}

impl PasswordConfig {
    fn hasher(&self) -> Result<Argon2<'static>, PasswordError> {
        let params = Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            Some(self.output_len),
        )
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

        Ok(Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            params,
        ))
    }
}

/// Hash a plaintext password with a fresh random salt
///
/// # Returns
///
/// * `Ok(String)` - PHC string format hash, safe to store
/// * `Err(PasswordError)` - If parameters are rejected or hashing fails
pub fn hash_password(password: &str, config: &PasswordConfig) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = config.hasher()?;

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

    Ok(password_hash.to_string())
}

/// Verify a plaintext password against a stored PHC hash
///
/// # Returns
///
/// * `Ok(true)` - Password matches
/// * `Ok(false)` - Password does not match
/// * `Err(PasswordError::InvalidHashFormat)` - The stored string is not a usable argon2 record
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;

    // Cost parameters come from the parsed hash, not from this instance
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        // Parameters or salt that argon2 cannot use make the record unusable
        Err(_) => Err(PasswordError::InvalidHashFormat),
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> PasswordConfig {
    PasswordConfig {
        memory_cost: 1024,
        time_cost: 1,
        parallelism: 1,
        output_len: 32,
    }
}
