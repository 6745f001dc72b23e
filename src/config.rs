//! Typed configuration surface for `Safe::generate`.
//!
//! The original implementation took loose keyword arguments
//! (`n_blocks=1024, block_index_size=2, slice_size=4, ks=None, kd=None,
//! blockcipher=None, gp_bits=1025, precomputed_gp=False, ...`); this crate
//! expresses the same knobs as a builder-friendly struct.

use crate::error::{SafeError, SafeFormatError};
use crate::primitives::elgamal::GroupParams;
use crate::primitives::{BlockCipherParams, KeyDerivationParams, KeyStretchingParams};

/// How to obtain the ElGamal group parameters for a newly generated safe.
pub enum GroupParamsSource {
    /// The fixed RFC 3526 MODP Group 14 safe prime (production default).
    Oakley2048,
    /// A freshly searched safe prime of the given bit length (slow; mainly
    /// for tests and custom-sized safes).
    Generate { bits: u64 },
    /// Caller-supplied parameters (e.g. a previously generated test group).
    Precomputed(GroupParams),
}

pub struct GenerateConfig {
    pub n_blocks: usize,
    pub block_index_size: u8,
    pub slice_size: u8,
    pub group_params: GroupParamsSource,
    pub key_stretching: KeyStretchingParams,
    pub key_derivation: KeyDerivationParams,
    pub block_cipher: BlockCipherParams,
}

impl GenerateConfig {
    /// A safe sized for real use: 1024 blocks, 2-byte block indices,
    /// 4-byte slice-size field, the Oakley group, and fresh Argon2id
    /// parameters.
    pub fn production(rng: &mut impl rand::RngCore) -> Self {
        GenerateConfig {
            n_blocks: 1024,
            block_index_size: 2,
            slice_size: 4,
            group_params: GroupParamsSource::Oakley2048,
            key_stretching: KeyStretchingParams::generate_argon2id(rng),
            key_derivation: KeyDerivationParams::default_params(),
            block_cipher: BlockCipherParams::default_params(),
        }
    }
}

pub(crate) fn validate_block_index_size(size: u8) -> Result<(), SafeError> {
    match size {
        1 | 2 | 4 => Ok(()),
        other => Err(SafeFormatError::BadBlockIndexSize(other).into()),
    }
}

pub(crate) fn validate_slice_size(size: u8) -> Result<(), SafeError> {
    match size {
        2 | 4 => Ok(()),
        other => Err(SafeFormatError::BadSliceSize(other).into()),
    }
}
