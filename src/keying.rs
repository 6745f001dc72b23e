//! Per-block key derivation: every block has its own ElGamal keypair and
//! every slice write derives its own symmetric key, all deterministically
//! from the safe's `base_key` (the Argon2id-stretched password) so that
//! nothing but `base_key` and the block index needs to be stored.

use num_bigint::BigUint;

use crate::constants::{TAG_ELGAMAL, TAG_SYMM};
use crate::primitives::elgamal::{self, GroupParams};
use crate::primitives::{BlockCipherParams, KeyDerivationParams};

/// Encodes a block index as `block_index_size` big-endian bytes.
pub fn index_to_bytes(index: u64, block_index_size: u8) -> Vec<u8> {
    let full = index.to_be_bytes();
    full[full.len() - block_index_size as usize..].to_vec()
}

/// `privkey(base_key, i) = mpz(KD(base_key, [TAG_ELGAMAL, index_bytes(i)],
/// length=bytes_per_block) || 0x00)`.
///
/// The trailing zero byte mirrors the original's `gmpy.mpz(bytes + '\0',
/// 256)` call: parsing one extra zero byte does not change the integer's
/// value, but keeps this derivation bit-for-bit aligned with the source it
/// was distilled from.
pub fn privkey(
    kd: &KeyDerivationParams,
    base_key: &[u8],
    index: u64,
    block_index_size: u8,
    bytes_per_block: usize,
) -> BigUint {
    let index_bytes = index_to_bytes(index, block_index_size);
    let mut derived = kd.derive(base_key, &[&TAG_ELGAMAL, &index_bytes], bytes_per_block);
    derived.push(0);
    BigUint::from_bytes_be(&derived)
}

/// `pubkey(base_key, i) = g^privkey(base_key, i) mod p`.
pub fn pubkey(
    kd: &KeyDerivationParams,
    base_key: &[u8],
    index: u64,
    block_index_size: u8,
    bytes_per_block: usize,
    gp: &GroupParams,
) -> BigUint {
    let sk = privkey(kd, base_key, index, block_index_size, bytes_per_block);
    elgamal::pubkey_from_privkey(&sk, gp)
}

/// `symmkey(base_key) = KD(base_key, [TAG_SYMM], length=cipher.keysize)`,
/// the key used to encrypt a slice's IV-prefixed payload before it is split
/// across block-sized ElGamal ciphertexts.
pub fn symmkey(kd: &KeyDerivationParams, base_key: &[u8], cipher: &BlockCipherParams) -> Vec<u8> {
    kd.derive(base_key, &[&TAG_SYMM], cipher.keysize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::elgamal::GroupParams;

    fn test_group() -> GroupParams {
        GroupParams {
            g: BigUint::from(4u32),
            p: BigUint::from(2063u32),
        }
    }

    #[test]
    fn index_to_bytes_is_big_endian_and_fixed_width() {
        assert_eq!(index_to_bytes(1, 2), vec![0, 1]);
        assert_eq!(index_to_bytes(256, 2), vec![1, 0]);
        assert_eq!(index_to_bytes(5, 4), vec![0, 0, 0, 5]);
    }

    #[test]
    fn privkey_is_deterministic_and_varies_by_index() {
        let kd = KeyDerivationParams::default_params();
        let base_key = [1u8; 32];
        let a = privkey(&kd, &base_key, 0, 2, 32);
        let b = privkey(&kd, &base_key, 0, 2, 32);
        let c = privkey(&kd, &base_key, 1, 2, 32);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn pubkey_matches_manual_modpow() {
        let kd = KeyDerivationParams::default_params();
        let gp = test_group();
        let base_key = [2u8; 32];
        let sk = privkey(&kd, &base_key, 3, 2, 32);
        let expected = gp.g.modpow(&sk, &gp.p);
        assert_eq!(pubkey(&kd, &base_key, 3, 2, 32, &gp), expected);
    }

    #[test]
    fn symmkey_has_cipher_keysize_length() {
        let kd = KeyDerivationParams::default_params();
        let cipher = BlockCipherParams::default_params();
        let key = symmkey(&kd, &[3u8; 32], &cipher);
        assert_eq!(key.len(), cipher.keysize());
    }
}
