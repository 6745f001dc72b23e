//! Block cipher streaming mode: `Stream(key, iv)`.
//!
//! Fixed to AES-256-CTR (`SPEC_FULL.md` §4.7). CTR mode makes encrypt and
//! decrypt the same keystream-XOR operation, which is what the slice engine
//! needs: it applies the stream contiguously across a chain of blocks.

use aes::Aes256;
use cipher::{KeyIvInit, StreamCipher};
use ctr::Ctr128BE;
use serde::{Deserialize, Serialize};

use crate::error::SafeError;

type Aes256Ctr = Ctr128BE<Aes256>;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "kebab-case")]
pub enum BlockCipherParams {
    Aes256Ctr,
}

impl BlockCipherParams {
    pub fn default_params() -> Self {
        BlockCipherParams::Aes256Ctr
    }

    pub fn validate(&self) -> Result<(), SafeError> {
        match self {
            BlockCipherParams::Aes256Ctr => Ok(()),
        }
    }

    /// Size, in bytes, of one cipher block (the IV length and the
    /// alignment `bytes_per_block` must respect).
    pub fn blocksize(&self) -> usize {
        match self {
            BlockCipherParams::Aes256Ctr => 16,
        }
    }

    /// Size, in bytes, of the symmetric key this cipher consumes.
    pub fn keysize(&self) -> usize {
        match self {
            BlockCipherParams::Aes256Ctr => 32,
        }
    }

    /// Opens a fresh keystream cursor for `key`/`iv`. Encryption and
    /// decryption are the same `apply_keystream` XOR call in CTR mode.
    pub fn stream(&self, key: &[u8], iv: &[u8]) -> CipherStream {
        match self {
            BlockCipherParams::Aes256Ctr => {
                CipherStream::Aes256Ctr(Box::new(Aes256Ctr::new(key.into(), iv.into())))
            }
        }
    }
}

pub enum CipherStream {
    Aes256Ctr(Box<Aes256Ctr>),
}

impl CipherStream {
    /// Encrypts (equivalently: decrypts) `data` in place by XOR-ing it
    /// with the next `data.len()` keystream bytes.
    pub fn apply(&mut self, data: &mut [u8]) {
        match self {
            CipherStream::Aes256Ctr(ctr) => ctr.apply_keystream(data),
        }
    }
}
