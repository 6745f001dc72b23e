//! Concrete implementations behind the four externally-specified
//! primitive interfaces (`spec.md` §1, `SPEC_FULL.md` §4.7): key
//! stretching, key derivation, the block cipher, and ElGamal group
//! arithmetic.

pub mod cipher_stream;
pub mod elgamal;
pub mod key_derive;
pub mod key_stretch;

pub use cipher_stream::BlockCipherParams;
pub use key_derive::KeyDerivationParams;
pub use key_stretch::KeyStretchingParams;
