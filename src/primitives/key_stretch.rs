//! Key stretching: `KS(password) -> base_key`.
//!
//! The core treats `KS` as an external interface (see `spec.md` §1); this
//! module fixes one concrete, swappable implementation behind it so the
//! crate builds and its tests are meaningful (`SPEC_FULL.md` §4.7).

use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};

use crate::constants::BASE_KEY_LEN;
use crate::error::{SafeError, SafeFormatError};

/// Parameters for one `KS` invocation, persisted verbatim in the safe's
/// `key-stretching` field.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "kebab-case")]
pub enum KeyStretchingParams {
    /// Argon2id, RFC 9106 recommended for password hashing.
    Argon2id {
        salt: Vec<u8>,
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    },
}

impl KeyStretchingParams {
    /// Interactive-use defaults (19 MiB, 2 passes, single lane), matching
    /// the RFC 9106 "second recommended option" for environments without a
    /// dedicated memory budget.
    pub fn generate_argon2id(rng: &mut impl rand::RngCore) -> Self {
        let mut salt = vec![0u8; 16];
        rng.fill_bytes(&mut salt);
        KeyStretchingParams::Argon2id {
            salt,
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }

    /// Deliberately weak parameters so property tests don't spend real
    /// wall-clock time on Argon2. Never use outside `#[cfg(test)]`.
    #[cfg(any(test, feature = "test-util"))]
    pub fn insecure_for_tests(rng: &mut impl rand::RngCore) -> Self {
        let mut salt = vec![0u8; 16];
        rng.fill_bytes(&mut salt);
        KeyStretchingParams::Argon2id {
            salt,
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        }
    }

    /// Validates the parameters are self-consistent, as `setup()` would in
    /// the original implementation's `KeyStretching.setup`.
    pub fn validate(&self) -> Result<(), SafeError> {
        match self {
            KeyStretchingParams::Argon2id {
                salt,
                memory_kib,
                iterations,
                parallelism,
            } => {
                if salt.len() < 8 {
                    return Err(SafeFormatError::WrongType {
                        field: "key-stretching.salt",
                    }
                    .into());
                }
                if *memory_kib == 0 || *iterations == 0 || *parallelism == 0 {
                    return Err(SafeFormatError::WrongType {
                        field: "key-stretching",
                    }
                    .into());
                }
                Ok(())
            }
        }
    }

    /// `KS(password) -> base_key`.
    pub fn stretch(&self, password: &[u8]) -> [u8; BASE_KEY_LEN] {
        match self {
            KeyStretchingParams::Argon2id {
                salt,
                memory_kib,
                iterations,
                parallelism,
            } => {
                let params = Params::new(*memory_kib, *iterations, *parallelism, Some(BASE_KEY_LEN))
                    .expect("validated argon2 params");
                let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
                let mut out = [0u8; BASE_KEY_LEN];
                argon2
                    .hash_password_into(password, salt, &mut out)
                    .expect("argon2 hashing does not fail for validated inputs");
                out
            }
        }
    }
}
