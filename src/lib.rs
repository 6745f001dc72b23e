//! A deniable ElGamal encrypted safe: a fixed-size block store whose
//! blocks are indistinguishable from random ElGamal ciphertexts without the
//! password that derives their keys, supporting rerandomization so that two
//! snapshots of the same safe cannot be linked by their ciphertext bytes
//! alone.

pub mod block;
pub mod config;
pub mod constants;
pub mod error;
pub mod format;
pub mod keying;
pub mod primitives;
pub mod rerandomize;
pub mod safe;
pub mod slice;

pub use block::Block;
pub use config::{GenerateConfig, GroupParamsSource};
pub use error::{SafeError, SafeFormatError};
pub use primitives::elgamal::GroupParams;
pub use primitives::{BlockCipherParams, KeyDerivationParams, KeyStretchingParams};
pub use safe::{Safe, SafeParams};
pub use slice::Slice;
