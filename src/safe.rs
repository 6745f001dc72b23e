//! `Safe`: the top-level aggregate binding a block store's fixed
//! parameters, its blocks, and the session's view of which blocks are free.
//!
//! `free_blocks` is deliberately session-local: a persisted safe has no
//! "free" bit (that would leak which blocks hold data), so every freshly
//! loaded safe starts with an empty free set. Callers who know which
//! indices they no longer need must [`Safe::mark_free`] them explicitly
//! before allocating new slices.

use std::collections::HashSet;

use num_bigint::BigUint;
use rand::{CryptoRng, RngCore};

use crate::block::Block;
use crate::config::GenerateConfig;
use crate::error::SafeError;
use crate::primitives::elgamal::GroupParams;
use crate::primitives::{BlockCipherParams, KeyDerivationParams, KeyStretchingParams};
use crate::rerandomize;
use crate::slice::{self, Slice};
use crate::{config::GroupParamsSource, format};

/// The fixed, format-persisted configuration of a safe: everything except
/// the blocks themselves and the live free-block set.
#[derive(Clone, Debug)]
pub struct SafeParams {
    pub n_blocks: usize,
    pub bytes_per_block: usize,
    pub block_index_size: u8,
    pub slice_size: u8,
    pub group_params: GroupParams,
    pub key_stretching: KeyStretchingParams,
    pub key_derivation: KeyDerivationParams,
    pub block_cipher: BlockCipherParams,
}

pub struct Safe {
    pub params: SafeParams,
    pub blocks: Vec<Block>,
    free_blocks: HashSet<usize>,
}

/// The largest `bytes_per_block` — the width of a block's plaintext
/// payload, `next_index || chunk` — such that every possible byte string
/// of that width is guaranteed to be strictly less than `p`. Maximizing it
/// maximizes each block's usable capacity.
///
/// This is unrelated to the width `c1`/`c2`/`pubkey` are stored at on disk
/// (see `Block::claimed`): those hold full elements of `Z_p` and are
/// encoded at their own minimal length, independent of `bytes_per_block`.
fn compute_bytes_per_block(p: &BigUint) -> usize {
    (((p.bits() - 1) / 8) as usize).max(1)
}

impl Safe {
    /// Builds a safe straight from its parts, e.g. after loading a
    /// persisted image. The free set starts empty; see the module docs.
    pub fn from_parts(params: SafeParams, blocks: Vec<Block>) -> Self {
        Safe {
            params,
            blocks,
            free_blocks: HashSet::new(),
        }
    }

    /// Generates a brand-new, entirely-free safe from `config`.
    pub fn generate(config: GenerateConfig, rng: &mut (impl RngCore + CryptoRng)) -> Result<Self, SafeError> {
        crate::config::validate_block_index_size(config.block_index_size)?;
        crate::config::validate_slice_size(config.slice_size)?;
        config.key_stretching.validate()?;
        config.key_derivation.validate()?;
        config.block_cipher.validate()?;

        let group_params = match config.group_params {
            GroupParamsSource::Oakley2048 => GroupParams::oakley_2048(),
            GroupParamsSource::Generate { bits } => GroupParams::generate(bits, rng),
            GroupParamsSource::Precomputed(gp) => gp,
        };

        let bytes_per_block = compute_bytes_per_block(&group_params.p);

        let params = SafeParams {
            n_blocks: config.n_blocks,
            bytes_per_block,
            block_index_size: config.block_index_size,
            slice_size: config.slice_size,
            group_params,
            key_stretching: config.key_stretching,
            key_derivation: config.key_derivation,
            block_cipher: config.block_cipher,
        };

        let blocks = vec![Block::free(); params.n_blocks];
        let free_blocks: HashSet<usize> = (0..params.n_blocks).collect();

        Ok(Safe {
            params,
            blocks,
            free_blocks,
        })
    }

    /// Parses a persisted safe from its MessagePack envelope.
    pub fn load(bytes: &[u8]) -> Result<Self, SafeError> {
        format::from_bytes(bytes)
    }

    /// Serializes this safe to its MessagePack envelope.
    pub fn save(&self) -> Vec<u8> {
        format::to_bytes(self)
    }

    pub fn free_blocks(&self) -> &HashSet<usize> {
        &self.free_blocks
    }

    /// Marks `indices` as free and wipes their stored ciphertext. A safe's
    /// free set is never inferred from disk, so this is the only way a
    /// caller reclaims blocks after reading or abandoning a slice.
    pub fn mark_free<I: IntoIterator<Item = usize>>(&mut self, indices: I) {
        for index in indices {
            if index < self.blocks.len() {
                self.blocks[index] = Block::free();
                self.free_blocks.insert(index);
            }
        }
    }

    /// Reserves a fresh chain of `nblocks` free blocks without writing to
    /// them yet. See [`slice::new_slice`].
    pub fn new_slice(&mut self, nblocks: usize, rng: &mut (impl RngCore + CryptoRng)) -> Result<Slice, SafeError> {
        slice::new_slice(&mut self.free_blocks, rng, nblocks)
    }

    /// Encrypts `value` under `base_key` into `slice`'s chain.
    pub fn store_slice(
        &mut self,
        base_key: &[u8],
        slice: &Slice,
        value: &[u8],
        annex: bool,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<(), SafeError> {
        slice::store(&self.params, &mut self.blocks, base_key, slice, value, annex, rng)
    }

    /// Allocates a right-sized chain for `value` and stores it in one step,
    /// returning the allocated [`Slice`].
    pub fn allocate_and_store(
        &mut self,
        base_key: &[u8],
        value: &[u8],
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<Slice, SafeError> {
        let chunk = self.params.bytes_per_block - self.params.block_index_size as usize;
        let overhead = self.params.block_cipher.blocksize() + self.params.slice_size as usize;
        let needed = overhead + value.len();
        let nblocks = needed.div_ceil(chunk).max(1);

        let slice = self.new_slice(nblocks, rng)?;
        self.store_slice(base_key, &slice, value, false, rng)?;
        Ok(slice)
    }

    /// Reads back the value stored at `first_index` under `base_key`.
    pub fn read_slice(&self, base_key: &[u8], first_index: usize) -> Result<Vec<u8>, SafeError> {
        slice::read(&self.params, &self.blocks, base_key, first_index)
    }

    /// Overwrites `slice` with random noise under a throwaway key,
    /// rendering its previous contents unrecoverable even to the real
    /// password.
    pub fn trash_slice(&mut self, slice: &Slice, rng: &mut (impl RngCore + CryptoRng)) -> Result<(), SafeError> {
        slice::trash(&self.params, &mut self.blocks, slice, rng)
    }

    /// Rerandomizes every claimed block's ElGamal ciphertext in place,
    /// across a rayon worker pool. Decryption under the unchanged pubkey
    /// and privkey is unaffected; only the ciphertext bytes change, which
    /// is what makes two snapshots of the same safe unlinkable.
    pub fn rerandomize(
        &mut self,
        nworkers: Option<usize>,
        progress: Option<&(dyn Fn(f32) + Sync)>,
    ) -> Result<(), SafeError> {
        rerandomize::rerandomize(&self.params, &mut self.blocks, nworkers, progress)
    }
}
