//! Small end-to-end demo: generate a safe, stash a value in it, read it
//! back, rerandomize, and confirm the value is still readable. Not a CLI
//! front end — building one is explicitly out of scope for this crate.

use legit_safe::config::{GenerateConfig, GroupParamsSource};
use legit_safe::primitives::{BlockCipherParams, KeyDerivationParams, KeyStretchingParams};
use legit_safe::Safe;
use rand::rngs::StdRng;
use rand::SeedableRng;

const LOG_TARGET: &str = "legit_safe::demo";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut rng = StdRng::from_entropy();

    let config = GenerateConfig {
        n_blocks: 256,
        block_index_size: 2,
        slice_size: 4,
        group_params: GroupParamsSource::Oakley2048,
        key_stretching: KeyStretchingParams::generate_argon2id(&mut rng),
        key_derivation: KeyDerivationParams::default_params(),
        block_cipher: BlockCipherParams::default_params(),
    };

    tracing::info!(target: LOG_TARGET, n_blocks = config.n_blocks, "generating safe");
    let mut safe = Safe::generate(config, &mut rng).expect("generate a fresh safe");

    let base_key = safe.params.key_stretching.stretch(b"correct horse battery staple");

    let slice = safe
        .allocate_and_store(&base_key, b"the launch codes are 00000000", &mut rng)
        .expect("store a value");
    tracing::info!(target: LOG_TARGET, first_index = slice.first_index, "stored a slice");

    let recovered = safe
        .read_slice(&base_key, slice.first_index)
        .expect("read back the value under the right key");
    assert_eq!(recovered, b"the launch codes are 00000000");

    tracing::info!(target: LOG_TARGET, "rerandomizing");
    safe.rerandomize(None, None).expect("rerandomize the safe");

    let recovered_again = safe
        .read_slice(&base_key, slice.first_index)
        .expect("read back the value after rerandomization");
    assert_eq!(recovered_again, recovered);

    tracing::info!(target: LOG_TARGET, "value survived rerandomization");
}
