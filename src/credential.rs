//! Credential hashing.
//!
//! The session store never compares raw passwords itself; it asks a
//! [`CredentialHasher`] to produce the stored form and to check a candidate
//! against it. Both the account record and the credential history hold that
//! stored form.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use crate::config::CredentialsConfig;
use crate::error::{Error, Result};

/// One-way credential capability
pub trait CredentialHasher {
    /// Scheme name as written in `credentials.scheme`
    fn scheme(&self) -> &'static str;

    /// Produce the stored form of `password`
    fn hash(&self, password: &str) -> Result<String>;

    /// Check `password` against a stored credential
    fn verify(&self, password: &str, credential: &str) -> bool;
}

/// argon2id with PHC-encoded output
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| Error::Credential(format!("invalid argon2 parameters: {e}")))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl CredentialHasher for Argon2Hasher {
    fn scheme(&self) -> &'static str {
        "argon2"
    }

    fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| Error::Credential(e.to_string()))
    }

    fn verify(&self, password: &str, credential: &str) -> bool {
        let parsed_hash = match PasswordHash::new(credential) {
            Ok(h) => h,
            Err(_) => return false,
        };

        // Cost parameters come from the PHC string, not from `self`.
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

/// Stores the raw password. Legacy data only: offers no protection.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextHasher;

impl CredentialHasher for PlaintextHasher {
    fn scheme(&self) -> &'static str {
        "plaintext"
    }

    fn hash(&self, password: &str) -> Result<String> {
        Ok(password.to_string())
    }

    fn verify(&self, password: &str, credential: &str) -> bool {
        password == credential
    }
}

/// Build the hasher selected by `credentials.scheme`
pub fn hasher_from_config(config: &CredentialsConfig) -> Result<Box<dyn CredentialHasher>> {
    match config.scheme.as_str() {
        "argon2" => Ok(Box::new(Argon2Hasher::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
        )?)),
        "plaintext" => {
            tracing::warn!("credentials.scheme = plaintext: passwords are stored unhashed");
            Ok(Box::new(PlaintextHasher))
        }
        other => Err(Error::InvalidConfig(format!(
            "credentials.scheme: invalid scheme '{other}' (expected argon2|plaintext)"
        ))),
    }
}
