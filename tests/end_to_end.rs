//! End-to-end scenarios over the public API, exercising the safe the way a
//! caller would: generate, claim, read, rerandomize, fill, and reload.

use legit_safe::config::{GenerateConfig, GroupParamsSource};
use legit_safe::error::SafeError;
use legit_safe::primitives::{BlockCipherParams, KeyDerivationParams, KeyStretchingParams};
use legit_safe::Safe;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn small_config(rng: &mut StdRng, n_blocks: usize) -> GenerateConfig {
    GenerateConfig {
        n_blocks,
        block_index_size: 1,
        slice_size: 2,
        group_params: GroupParamsSource::Oakley2048,
        key_stretching: KeyStretchingParams::insecure_for_tests(rng),
        key_derivation: KeyDerivationParams::default_params(),
        block_cipher: BlockCipherParams::default_params(),
    }
}

#[test]
fn generate_claim_and_read_back() {
    let mut rng = StdRng::seed_from_u64(100);
    let config = small_config(&mut rng, 64);
    let mut safe = Safe::generate(config, &mut rng).unwrap();
    let base_key = safe.params.key_stretching.stretch(b"hunter2");

    let slice = safe
        .allocate_and_store(&base_key, b"a message worth hiding", &mut rng)
        .unwrap();
    let value = safe.read_slice(&base_key, slice.first_index).unwrap();
    assert_eq!(value, b"a message worth hiding");
}

#[test]
fn reading_with_the_wrong_password_fails_closed() {
    let mut rng = StdRng::seed_from_u64(101);
    let config = small_config(&mut rng, 64);
    let mut safe = Safe::generate(config, &mut rng).unwrap();
    let right_key = safe.params.key_stretching.stretch(b"hunter2");
    let wrong_key = safe.params.key_stretching.stretch(b"hunter3");

    let slice = safe.allocate_and_store(&right_key, b"top secret", &mut rng).unwrap();
    let result = safe.read_slice(&wrong_key, slice.first_index);
    assert!(matches!(result, Err(SafeError::WrongKey)));
}

#[test]
fn rerandomize_preserves_decryption_under_the_same_key() {
    let mut rng = StdRng::seed_from_u64(102);
    let config = small_config(&mut rng, 64);
    let mut safe = Safe::generate(config, &mut rng).unwrap();
    let base_key = safe.params.key_stretching.stretch(b"hunter2");

    let slice = safe.allocate_and_store(&base_key, b"still here after shuffling", &mut rng).unwrap();
    let before_bytes = safe.save();

    safe.rerandomize(Some(3), None).unwrap();

    let after_bytes = safe.save();
    assert_ne!(before_bytes, after_bytes, "ciphertext bytes must change");

    let value = safe.read_slice(&base_key, slice.first_index).unwrap();
    assert_eq!(value, b"still here after shuffling");
}

#[test]
fn filling_the_safe_to_capacity_then_allocating_returns_safe_full() {
    let mut rng = StdRng::seed_from_u64(103);
    let config = small_config(&mut rng, 16);
    let mut safe = Safe::generate(config, &mut rng).unwrap();
    let base_key = safe.params.key_stretching.stretch(b"hunter2");

    let n = safe.params.n_blocks;
    let slice = safe.new_slice(n, &mut rng).unwrap();
    safe.store_slice(&base_key, &slice, b"every last byte", false, &mut rng).unwrap();

    let result = safe.new_slice(1, &mut rng);
    assert!(matches!(result, Err(SafeError::SafeFull)));
}

#[test]
fn trashing_a_slice_destroys_its_contents() {
    let mut rng = StdRng::seed_from_u64(104);
    let config = small_config(&mut rng, 64);
    let mut safe = Safe::generate(config, &mut rng).unwrap();
    let base_key = safe.params.key_stretching.stretch(b"hunter2");

    let slice = safe.allocate_and_store(&base_key, b"ephemeral", &mut rng).unwrap();
    safe.trash_slice(&slice, &mut rng).unwrap();

    assert!(safe.read_slice(&base_key, slice.first_index).is_err());
}

#[test]
fn save_and_load_round_trips_the_whole_safe() {
    let mut rng = StdRng::seed_from_u64(105);
    let config = small_config(&mut rng, 32);
    let mut safe = Safe::generate(config, &mut rng).unwrap();
    let base_key = safe.params.key_stretching.stretch(b"hunter2");
    let slice = safe.allocate_and_store(&base_key, b"persisted", &mut rng).unwrap();

    let bytes = safe.save();
    let loaded = Safe::load(&bytes).unwrap();

    let value = loaded.read_slice(&base_key, slice.first_index).unwrap();
    assert_eq!(value, b"persisted");
    assert!(loaded.free_blocks().is_empty(), "free set is never persisted");
}

#[test]
fn loading_a_truncated_envelope_reports_a_format_error() {
    let mut rng = StdRng::seed_from_u64(106);
    let config = small_config(&mut rng, 8);
    let safe = Safe::generate(config, &mut rng).unwrap();
    let mut bytes = safe.save();
    bytes.truncate(bytes.len() / 2);

    let result = Safe::load(&bytes);
    assert!(result.is_err());
}
