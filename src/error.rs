//! Error kinds for the safe core.
//!
//! Four kinds, matching the four failure modes a caller can hit: a
//! malformed persisted image, a key that does not own the block it was
//! tried against, a full safe, and a plain invalid argument. The core
//! never swallows an error; every fallible operation returns one of
//! these through `Result`.

use thiserror::Error;

/// Top-level error type returned by every fallible operation in this crate.
#[derive(Error, Debug)]
pub enum SafeError {
    /// The persisted safe image violates a required structural invariant.
    #[error("malformed safe: {0}")]
    Format(#[from] SafeFormatError),

    /// `base_key` does not own the block it was used against.
    #[error("wrong key for block")]
    WrongKey,

    /// A slice allocation asked for more blocks than are currently free.
    #[error("safe has no more free blocks")]
    SafeFull,

    /// A caller-supplied argument violates a precondition (e.g. a value
    /// larger than a slice's capacity, `nblocks == 0`, an unknown safe
    /// `type`).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// The specific invariant violated by a malformed persisted safe.
///
/// Kept separate from [`SafeError::Format`]'s single message so that callers
/// doing format triage (e.g. a migration tool) can match on *which*
/// invariant failed, not just that one did.
#[derive(Error, Debug)]
pub enum SafeFormatError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` has the wrong type")]
    WrongType { field: &'static str },

    #[error("unknown safe type `{0}`")]
    UnknownType(String),

    #[error("`n-blocks` ({declared}) does not match `blocks` length ({actual})")]
    BlockCountMismatch { declared: usize, actual: usize },

    #[error("`group-params` must contain exactly 2 elements, found {0}")]
    GroupParamsArity(usize),

    #[error("`block-index-size` must be one of 1, 2, 4; found {0}")]
    BadBlockIndexSize(u8),

    #[error("`slice-size` must be one of 2, 4; found {0}")]
    BadSliceSize(u8),

    #[error("`bytes-per-block` ({bytes_per_block}) leaves 2^(8*bytes_per_block) >= p")]
    BytesPerBlockTooLarge { bytes_per_block: usize },

    #[error("block {index} has a malformed component: {reason}")]
    BadBlock { index: usize, reason: String },

    #[error("envelope is not valid MessagePack: {0}")]
    Encoding(String),
}

pub type Result<T> = std::result::Result<T, SafeError>;
