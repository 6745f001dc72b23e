//! A single fixed-size block: either free (unclaimed) or holding one
//! ElGamal-encrypted `(c1, c2)` pair plus the public key it was encrypted
//! under.
//!
//! Claimed and free blocks must be indistinguishable to anyone without
//! `base_key`: a free block's bytes are simply never written, so on disk it
//! looks exactly like any other block would if its ciphertext happened to
//! be empty-padded. In memory we track "free" with an empty `Vec`, which is
//! never a valid encoding of a claimed block (every claimed component is
//! `0 < x < p`).

use num_bigint::BigUint;

use crate::error::{SafeError, SafeFormatError};
use crate::primitives::elgamal::{mpz_decode, mpz_encode, GroupParams};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub c1: Vec<u8>,
    pub c2: Vec<u8>,
    pub pubkey: Vec<u8>,
}

impl Block {
    pub fn free() -> Self {
        Block {
            c1: Vec::new(),
            c2: Vec::new(),
            pubkey: Vec::new(),
        }
    }

    pub fn is_free(&self) -> bool {
        self.c1.is_empty() && self.c2.is_empty() && self.pubkey.is_empty()
    }

    /// Stores each component as its minimal big-endian encoding (no
    /// padding to a fixed width): `c1`, `c2`, and `pubkey` are elements of
    /// `Z_p`, sized by `p`'s own bit length, which is independent of
    /// `bytes_per_block` (the much smaller plaintext chunk width a block's
    /// *payload* is constrained to).
    pub fn claimed(c1: &BigUint, c2: &BigUint, pubkey: &BigUint) -> Self {
        Block {
            c1: mpz_encode(c1),
            c2: mpz_encode(c2),
            pubkey: mpz_encode(pubkey),
        }
    }

    pub fn c1_int(&self) -> BigUint {
        mpz_decode(&self.c1)
    }

    pub fn c2_int(&self) -> BigUint {
        mpz_decode(&self.c2)
    }

    pub fn pubkey_int(&self) -> BigUint {
        mpz_decode(&self.pubkey)
    }

    /// Checks that a claimed block's three components are each in
    /// `0 < x < p`, the invariant every ElGamal component must satisfy.
    pub fn validate(&self, gp: &GroupParams, index: usize) -> Result<(), SafeError> {
        if self.is_free() {
            return Ok(());
        }
        let zero = BigUint::from(0u32);
        for (name, bytes) in [("c1", &self.c1), ("c2", &self.c2), ("pubkey", &self.pubkey)] {
            let n = mpz_decode(bytes);
            if n == zero || n >= gp.p {
                return Err(SafeFormatError::BadBlock {
                    index,
                    reason: format!("{name} is not in 0 < x < p"),
                }
                .into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_group() -> GroupParams {
        GroupParams {
            g: BigUint::from(4u32),
            p: BigUint::from(2063u32),
        }
    }

    #[test]
    fn free_block_round_trips_through_is_free() {
        let block = Block::free();
        assert!(block.is_free());
    }

    #[test]
    fn claimed_block_is_not_free() {
        let block = Block::claimed(&BigUint::from(10u32), &BigUint::from(20u32), &BigUint::from(30u32));
        assert!(!block.is_free());
        assert_eq!(block.c1_int(), BigUint::from(10u32));
    }

    #[test]
    fn validate_rejects_component_at_or_above_p() {
        let gp = test_group();
        let block = Block::claimed(&gp.p, &BigUint::from(1u32), &BigUint::from(1u32));
        assert!(block.validate(&gp, 0).is_err());
    }

    #[test]
    fn validate_accepts_well_formed_block() {
        let gp = test_group();
        let block = Block::claimed(&BigUint::from(5u32), &BigUint::from(7u32), &BigUint::from(9u32));
        assert!(block.validate(&gp, 0).is_ok());
    }
}
