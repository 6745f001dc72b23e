//! The slice engine: a variable-length logical buffer spanning a chain of
//! blocks linked by an in-block "next index" pointer.
//!
//! A slice's on-disk footprint is `k` claimed blocks, written in a shuffled
//! order so that the disk position of a block carries no information about
//! its place in the logical chain; the chain itself is reconstructed by
//! following each block's `next_index` field, starting at the slice's
//! `first_index`.
//!
//! Each block's plaintext integer is `next_index (I bytes) || chunk (B-I
//! bytes)`. Concatenating every chunk in logical chain order reproduces one
//! contiguous byte stream: `iv (cipher blocksize) || enc(size_field (S
//! bytes) || value || padding)`. `size_field` records `value.len()`, and
//! `padding` is random filler bringing the stream up to the chain's full
//! capacity so that slices of the same block count are indistinguishable
//! regardless of how much of their capacity is actually used.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::{CryptoRng, Rng, RngCore};

use crate::block::Block;
use crate::error::{SafeError, SafeFormatError};
use crate::keying;
use crate::safe::SafeParams;

/// A handle to an already-allocated chain of blocks. Carries only the
/// entry point; the chain itself lives in the safe's block array.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Slice {
    pub first_index: usize,
    /// The chain's blocks in logical (not disk) order. Kept alongside
    /// `first_index` so `store`/`trash` don't need to re-walk the chain
    /// via decryption (which would require `base_key`) just to know which
    /// blocks belong to it.
    pub chain: Vec<usize>,
}

/// Marks "end of chain" in a block's `next_index` field: the all-ones value
/// for `block_index_size` bytes. Safes are expected to hold far fewer than
/// `2^(8*block_index_size) - 1` blocks, so this value is never a real index.
fn end_of_chain_marker(block_index_size: u8) -> Vec<u8> {
    vec![0xFFu8; block_index_size as usize]
}

/// Per-block payload capacity: `bytes_per_block - block_index_size`.
fn chunk_size(params: &SafeParams) -> usize {
    params.bytes_per_block - params.block_index_size as usize
}

/// Maximum `value` length storable in a chain of `k` blocks:
/// `k*(B-I) - cipher.blocksize - S`.
pub fn capacity(params: &SafeParams, k: usize) -> usize {
    let stream_len = k * chunk_size(params);
    let overhead = params.block_cipher.blocksize() + params.slice_size as usize;
    stream_len.saturating_sub(overhead)
}

/// Allocates a fresh chain of `nblocks` free blocks: reserves them from
/// `free_blocks`, then shuffles their logical order so that disk position
/// and chain position are uncorrelated. Does not write any content; callers
/// follow up with [`store`].
pub fn new_slice(
    free_blocks: &mut HashSet<usize>,
    rng: &mut (impl RngCore + CryptoRng),
    nblocks: usize,
) -> Result<Slice, SafeError> {
    if nblocks == 0 {
        return Err(SafeError::InvalidArgument(
            "a slice must span at least one block".to_string(),
        ));
    }
    if free_blocks.len() < nblocks {
        return Err(SafeError::SafeFull);
    }

    let mut candidates: Vec<usize> = free_blocks.iter().copied().collect();
    candidates.shuffle(rng);
    let chain: Vec<usize> = candidates.into_iter().take(nblocks).collect();
    for index in &chain {
        free_blocks.remove(index);
    }

    Ok(Slice {
        first_index: chain[0],
        chain,
    })
}

/// Encrypts `value` into `slice`'s already-allocated chain under `base_key`.
///
/// `annex` marks the write as belonging to the append-only access lane
/// (`TAG_APPEND`-keyed callers) rather than a full-access rewrite; both
/// lanes use the same on-disk layout, so the parameter currently only
/// documents intent for callers building the access-control layer on top.
pub fn store(
    params: &SafeParams,
    blocks: &mut [Block],
    base_key: &[u8],
    slice: &Slice,
    value: &[u8],
    _annex: bool,
    rng: &mut (impl RngCore + CryptoRng),
) -> Result<(), SafeError> {
    let k = slice.chain.len();
    let cap = capacity(params, k);
    if value.len() > cap {
        return Err(SafeError::InvalidArgument(format!(
            "value of {} bytes exceeds this slice's capacity of {} bytes",
            value.len(),
            cap
        )));
    }

    let stream_len = k * chunk_size(params);
    let iv_len = params.block_cipher.blocksize();
    let mut stream = vec![0u8; stream_len];
    rng.fill_bytes(&mut stream);

    let iv = stream[..iv_len].to_vec();

    let size_field_len = params.slice_size as usize;
    let mut plain_tail = vec![0u8; stream_len - iv_len];
    let size_bytes = (value.len() as u64).to_be_bytes();
    plain_tail[..size_field_len].copy_from_slice(&size_bytes[size_bytes.len() - size_field_len..]);
    plain_tail[size_field_len..size_field_len + value.len()].copy_from_slice(value);
    // Remaining bytes keep their random filler from `stream`'s initial fill.
    let filler_start = size_field_len + value.len();
    plain_tail[filler_start..].copy_from_slice(&stream[iv_len + filler_start..]);

    let symmkey = keying::symmkey(&params.key_derivation, base_key, &params.block_cipher);
    params
        .block_cipher
        .stream(&symmkey, &iv)
        .apply(&mut plain_tail);

    stream[..iv_len].copy_from_slice(&iv);
    stream[iv_len..].copy_from_slice(&plain_tail);

    let end_marker = end_of_chain_marker(params.block_index_size);
    let chunk_len = chunk_size(params);
    for (position, &block_index) in slice.chain.iter().enumerate() {
        let next_bytes = match slice.chain.get(position + 1) {
            Some(next) => keying::index_to_bytes(*next as u64, params.block_index_size),
            None => end_marker.clone(),
        };
        let chunk = &stream[position * chunk_len..(position + 1) * chunk_len];

        let mut plaintext_bytes = Vec::with_capacity(params.bytes_per_block);
        plaintext_bytes.extend_from_slice(&next_bytes);
        plaintext_bytes.extend_from_slice(chunk);
        let plaintext = num_bigint::BigUint::from_bytes_be(&plaintext_bytes);

        let pubkey = keying::pubkey(
            &params.key_derivation,
            base_key,
            block_index as u64,
            params.block_index_size,
            params.bytes_per_block,
            &params.group_params,
        );
        let (c1, c2) = crate::primitives::elgamal::encrypt(&plaintext, &pubkey, &params.group_params, rng);
        blocks[block_index] = Block::claimed(&c1, &c2, &pubkey);
    }

    Ok(())
}

/// Overwrites `slice`'s chain with a random key and random-length filler,
/// for discarding a slice's contents without shrinking the free pool
/// (the chain stays claimed until the caller separately frees it).
pub fn trash(
    params: &SafeParams,
    blocks: &mut [Block],
    slice: &Slice,
    rng: &mut (impl RngCore + CryptoRng),
) -> Result<(), SafeError> {
    let cap = capacity(params, slice.chain.len());
    let mut throwaway_key = vec![0u8; crate::constants::BASE_KEY_LEN];
    rng.fill_bytes(&mut throwaway_key);
    let len = rng.gen_range(0..=cap);
    let mut payload = vec![0u8; len];
    rng.fill_bytes(&mut payload);
    store(params, blocks, &throwaway_key, slice, &payload, true, rng)
}

/// Decrypts and reassembles the logical byte stream stored at
/// `first_index` under `base_key`, walking the `next_index` chain until
/// the end-of-chain marker.
pub fn read(params: &SafeParams, blocks: &[Block], base_key: &[u8], first_index: usize) -> Result<Vec<u8>, SafeError> {
    let end_marker = end_of_chain_marker(params.block_index_size);
    let chunk_len = chunk_size(params);

    let mut chunks = Vec::new();
    let mut index = first_index;
    let mut visited = HashSet::new();

    loop {
        if !visited.insert(index) {
            return Err(SafeFormatError::BadBlock {
                index,
                reason: "slice chain contains a cycle".to_string(),
            }
            .into());
        }
        let block = blocks.get(index).ok_or_else(|| SafeFormatError::BadBlock {
            index,
            reason: "next_index points outside the block array".to_string(),
        })?;
        if block.is_free() {
            return Err(SafeFormatError::BadBlock {
                index,
                reason: "slice chain points at a free block".to_string(),
            }
            .into());
        }

        let expected_pubkey = keying::pubkey(
            &params.key_derivation,
            base_key,
            index as u64,
            params.block_index_size,
            params.bytes_per_block,
            &params.group_params,
        );
        if expected_pubkey != block.pubkey_int() {
            return Err(SafeError::WrongKey);
        }

        let privkey = keying::privkey(
            &params.key_derivation,
            base_key,
            index as u64,
            params.block_index_size,
            params.bytes_per_block,
        );
        let plaintext = crate::primitives::elgamal::decrypt(
            &block.c1_int(),
            &block.c2_int(),
            &privkey,
            &params.group_params,
        );
        let plaintext_bytes = crate::primitives::elgamal::to_fixed_bytes(&plaintext, params.bytes_per_block);

        let next_bytes = &plaintext_bytes[..params.block_index_size as usize];
        let chunk = plaintext_bytes[params.block_index_size as usize..].to_vec();
        debug_assert_eq!(chunk.len(), chunk_len);
        chunks.push(chunk);

        if next_bytes == end_marker.as_slice() {
            break;
        }
        index = next_bytes
            .iter()
            .fold(0u64, |acc, b| (acc << 8) | *b as u64) as usize;
    }

    let mut stream = Vec::with_capacity(chunks.len() * chunk_len);
    for chunk in chunks {
        stream.extend_from_slice(&chunk);
    }

    let iv_len = params.block_cipher.blocksize();
    if stream.len() < iv_len + params.slice_size as usize {
        return Err(SafeFormatError::BadBlock {
            index: first_index,
            reason: "slice chain is too short to hold an IV and size field".to_string(),
        }
        .into());
    }
    let iv = stream[..iv_len].to_vec();
    let mut tail = stream[iv_len..].to_vec();

    let symmkey = keying::symmkey(&params.key_derivation, base_key, &params.block_cipher);
    params.block_cipher.stream(&symmkey, &iv).apply(&mut tail);

    let size_field_len = params.slice_size as usize;
    let mut size_bytes = [0u8; 8];
    size_bytes[8 - size_field_len..].copy_from_slice(&tail[..size_field_len]);
    let len = u64::from_be_bytes(size_bytes) as usize;

    if size_field_len + len > tail.len() {
        return Err(SafeFormatError::BadBlock {
            index: first_index,
            reason: "decoded size field exceeds the chain's capacity".to_string(),
        }
        .into());
    }

    Ok(tail[size_field_len..size_field_len + len].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::elgamal::GroupParams;
    use crate::primitives::{BlockCipherParams, KeyDerivationParams, KeyStretchingParams};
    use rand::SeedableRng;

    fn test_params(n_blocks: usize) -> SafeParams {
        SafeParams {
            n_blocks,
            bytes_per_block: 32,
            block_index_size: 2,
            slice_size: 2,
            group_params: GroupParams::oakley_2048(),
            key_stretching: KeyStretchingParams::insecure_for_tests(&mut rand::rngs::StdRng::seed_from_u64(1)),
            key_derivation: KeyDerivationParams::default_params(),
            block_cipher: BlockCipherParams::default_params(),
        }
    }

    #[test]
    fn store_then_read_roundtrips() {
        let params = test_params(16);
        let mut blocks = vec![Block::free(); params.n_blocks];
        let mut free: HashSet<usize> = (0..params.n_blocks).collect();
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let base_key = [7u8; 32];

        let slice = new_slice(&mut free, &mut rng, 4).unwrap();
        store(&params, &mut blocks, &base_key, &slice, b"hello safe", false, &mut rng).unwrap();

        let recovered = read(&params, &blocks, &base_key, slice.first_index).unwrap();
        assert_eq!(recovered, b"hello safe");
    }

    #[test]
    fn read_with_wrong_key_fails() {
        let params = test_params(16);
        let mut blocks = vec![Block::free(); params.n_blocks];
        let mut free: HashSet<usize> = (0..params.n_blocks).collect();
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let base_key = [1u8; 32];
        let wrong_key = [2u8; 32];

        let slice = new_slice(&mut free, &mut rng, 3).unwrap();
        store(&params, &mut blocks, &base_key, &slice, b"secret", false, &mut rng).unwrap();

        let result = read(&params, &blocks, &wrong_key, slice.first_index);
        assert!(matches!(result, Err(SafeError::WrongKey)));
    }

    #[test]
    fn new_slice_rejects_zero_blocks() {
        let mut free: HashSet<usize> = (0..16).collect();
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        assert!(new_slice(&mut free, &mut rng, 0).is_err());
    }

    #[test]
    fn new_slice_fails_when_not_enough_free_blocks() {
        let mut free: HashSet<usize> = (0..2).collect();
        let mut rng = rand::rngs::StdRng::seed_from_u64(4);
        assert!(matches!(new_slice(&mut free, &mut rng, 5), Err(SafeError::SafeFull)));
    }

    #[test]
    fn store_rejects_value_over_capacity() {
        let params = test_params(16);
        let mut blocks = vec![Block::free(); params.n_blocks];
        let mut free: HashSet<usize> = (0..params.n_blocks).collect();
        let mut rng = rand::rngs::StdRng::seed_from_u64(5);
        let base_key = [9u8; 32];

        let slice = new_slice(&mut free, &mut rng, 1).unwrap();
        let cap = capacity(&params, 1);
        let oversized = vec![0u8; cap + 1];
        assert!(store(&params, &mut blocks, &base_key, &slice, &oversized, false, &mut rng).is_err());
    }

    #[test]
    fn trash_overwrites_chain_without_error() {
        let params = test_params(16);
        let mut blocks = vec![Block::free(); params.n_blocks];
        let mut free: HashSet<usize> = (0..params.n_blocks).collect();
        let mut rng = rand::rngs::StdRng::seed_from_u64(6);
        let base_key = [3u8; 32];

        let slice = new_slice(&mut free, &mut rng, 2).unwrap();
        store(&params, &mut blocks, &base_key, &slice, b"gone soon", false, &mut rng).unwrap();
        trash(&params, &mut blocks, &slice, &mut rng).unwrap();

        assert!(read(&params, &blocks, &base_key, slice.first_index).is_err());
    }
}
