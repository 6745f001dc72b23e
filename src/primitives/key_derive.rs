//! Key derivation: `KD(inputs…, length) -> bytes`.
//!
//! Fixed to HKDF-SHA-256 (`SPEC_FULL.md` §4.7). `base_key` is used as IKM;
//! `inputs` are concatenated, in order, into the HKDF `info` parameter —
//! this realizes the `self.kd([key, TAG, extra...], length=...)` calling
//! convention of the original implementation.

use hkdf::Hkdf;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::SafeError;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "kebab-case")]
pub enum KeyDerivationParams {
    HkdfSha256,
}

impl KeyDerivationParams {
    pub fn default_params() -> Self {
        KeyDerivationParams::HkdfSha256
    }

    pub fn validate(&self) -> Result<(), SafeError> {
        match self {
            KeyDerivationParams::HkdfSha256 => Ok(()),
        }
    }

    /// `KD(base_key, inputs…, length)`. `inputs` are concatenated in order
    /// to form the HKDF `info` parameter.
    pub fn derive(&self, base_key: &[u8], inputs: &[&[u8]], length: usize) -> Vec<u8> {
        match self {
            KeyDerivationParams::HkdfSha256 => {
                let hk = Hkdf::<Sha256>::new(None, base_key);
                let mut info = Vec::new();
                for chunk in inputs {
                    info.extend_from_slice(chunk);
                }
                let mut out = vec![0u8; length];
                hk.expand(&info, &mut out)
                    .expect("HKDF output length within RFC 5869 bound");
                out
            }
        }
    }
}
