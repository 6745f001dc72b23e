//! The parallel rerandomizer: refreshes every claimed block's ElGamal
//! ciphertext under a fresh random exponent without touching its plaintext
//! or its owning key, spreading the work across a rayon thread pool.
//!
//! Each worker seeds its own RNG from OS entropy exactly once, rather than
//! drawing from a single shared generator — sharing one RNG (or worse,
//! reusing a fixed seed per worker) across parallel rerandomizations would
//! make the fresh exponents predictable or correlated across workers.

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::block::Block;
use crate::error::SafeError;
use crate::primitives::elgamal;
use crate::safe::SafeParams;

/// Blocks dispatched to a single rayon task at a time. Small enough to
/// keep the worker pool busy and report fine-grained progress, large
/// enough to amortize the per-task scheduling overhead.
pub const CHUNK_SIZE: usize = 16;

pub fn rerandomize(
    params: &SafeParams,
    blocks: &mut [Block],
    nworkers: Option<usize>,
    progress: Option<&(dyn Fn(f32) + Sync)>,
) -> Result<(), SafeError> {
    if blocks.is_empty() {
        if let Some(cb) = progress {
            cb(1.0);
        }
        return Ok(());
    }

    let total_chunks = blocks.chunks(CHUNK_SIZE).count();
    let completed = AtomicUsize::new(0);

    let run = || {
        blocks.par_chunks_mut(CHUNK_SIZE).for_each_init(
            StdRng::from_entropy,
            |rng, chunk| {
                for block in chunk.iter_mut() {
                    if block.is_free() {
                        continue;
                    }
                    let pubkey = block.pubkey_int();
                    let (c1, c2) = elgamal::rerandomize(
                        &block.c1_int(),
                        &block.c2_int(),
                        &pubkey,
                        &params.group_params,
                        rng,
                    );
                    *block = Block::claimed(&c1, &c2, &pubkey);
                }
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                if let Some(cb) = progress {
                    cb(done as f32 / total_chunks as f32);
                }
            },
        );
    };

    match nworkers {
        Some(n) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| SafeError::InvalidArgument(e.to_string()))?;
            pool.install(run);
        }
        None => run(),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keying;
    use crate::primitives::elgamal::GroupParams;
    use crate::primitives::{BlockCipherParams, KeyDerivationParams, KeyStretchingParams};
    use num_bigint::BigUint;
    use rand::SeedableRng;

    fn test_params(n_blocks: usize) -> SafeParams {
        SafeParams {
            n_blocks,
            bytes_per_block: 32,
            block_index_size: 2,
            slice_size: 2,
            group_params: GroupParams::oakley_2048(),
            key_stretching: KeyStretchingParams::insecure_for_tests(&mut StdRng::seed_from_u64(1)),
            key_derivation: KeyDerivationParams::default_params(),
            block_cipher: BlockCipherParams::default_params(),
        }
    }

    #[test]
    fn rerandomize_changes_ciphertext_but_preserves_decryption() {
        let params = test_params(40);
        let mut rng = StdRng::seed_from_u64(11);
        let base_key = [4u8; 32];
        let index = 3u64;

        let pubkey = keying::pubkey(
            &params.key_derivation,
            &base_key,
            index,
            params.block_index_size,
            params.bytes_per_block,
            &params.group_params,
        );
        let privkey = keying::privkey(
            &params.key_derivation,
            &base_key,
            index,
            params.block_index_size,
            params.bytes_per_block,
        );
        let plaintext = BigUint::from(123456u64);
        let (c1, c2) = elgamal::encrypt(&plaintext, &pubkey, &params.group_params, &mut rng);

        let mut blocks = vec![Block::free(); 40];
        blocks[index as usize] = Block::claimed(&c1, &c2, &pubkey);
        let before = blocks.clone();

        rerandomize(&params, &mut blocks, Some(4), None).unwrap();

        assert_ne!(blocks, before);
        let recovered = elgamal::decrypt(
            &blocks[index as usize].c1_int(),
            &blocks[index as usize].c2_int(),
            &privkey,
            &params.group_params,
        );
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn rerandomize_leaves_free_blocks_free() {
        let params = test_params(10);
        let mut blocks = vec![Block::free(); 10];
        rerandomize(&params, &mut blocks, None, None).unwrap();
        assert!(blocks.iter().all(Block::is_free));
    }

    #[test]
    fn progress_callback_reaches_one() {
        let params = test_params(50);
        let mut blocks = vec![Block::free(); 50];
        let last = std::sync::Mutex::new(0.0f32);
        rerandomize(
            &params,
            &mut blocks,
            Some(2),
            Some(&|p| {
                let mut guard = last.lock().unwrap();
                if p > *guard {
                    *guard = p;
                }
            }),
        )
        .unwrap();
        assert_eq!(*last.lock().unwrap(), 1.0);
    }
}
