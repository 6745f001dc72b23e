//! The self-describing MessagePack envelope persisted stores are loaded
//! from and saved to.
//!
//! The top level is a map keyed by `type`; today only `"elgamal"` is
//! registered (mirroring the original's `TYPE_MAP` dispatch table). Every
//! required field is checked individually so a malformed or truncated file
//! fails with a specific [`SafeFormatError`] rather than a generic parse
//! error.

use rmpv::Value;
use serde::{de::DeserializeOwned, Serialize};

use crate::block::Block;
use crate::config::{validate_block_index_size, validate_slice_size};
use crate::error::{SafeError, SafeFormatError};
use crate::primitives::elgamal::{mpz_decode, mpz_encode, GroupParams};
use crate::primitives::{BlockCipherParams, KeyDerivationParams, KeyStretchingParams};
use crate::safe::{Safe, SafeParams};

const ELGAMAL_TYPE: &str = "elgamal";

/// Serializes `safe` to a MessagePack byte string.
pub fn to_bytes(safe: &Safe) -> Vec<u8> {
    let p = &safe.params;
    let map = vec![
        (Value::from("type"), Value::from(ELGAMAL_TYPE)),
        (Value::from("n-blocks"), Value::from(p.n_blocks as u64)),
        (Value::from("bytes-per-block"), Value::from(p.bytes_per_block as u64)),
        (Value::from("block-index-size"), Value::from(p.block_index_size as u64)),
        (Value::from("slice-size"), Value::from(p.slice_size as u64)),
        (
            Value::from("group-params"),
            Value::Array(vec![
                Value::Binary(mpz_encode(&p.group_params.g)),
                Value::Binary(mpz_encode(&p.group_params.p)),
            ]),
        ),
        (Value::from("key-stretching"), to_nested_value(&p.key_stretching)),
        (Value::from("key-derivation"), to_nested_value(&p.key_derivation)),
        (Value::from("block-cipher"), to_nested_value(&p.block_cipher)),
        (
            Value::from("blocks"),
            Value::Array(safe.blocks.iter().map(block_to_value).collect()),
        ),
    ];

    let mut buf = Vec::new();
    rmpv::encode::write_value(&mut buf, &Value::Map(map)).expect("in-memory Vec<u8> write cannot fail");
    buf
}

/// Parses and validates a MessagePack byte string into a [`Safe`].
pub fn from_bytes(bytes: &[u8]) -> Result<Safe, SafeError> {
    let value = rmpv::decode::read_value(&mut &bytes[..])
        .map_err(|e| SafeFormatError::Encoding(e.to_string()))?;
    let map = value.as_map().ok_or(SafeFormatError::WrongType { field: "<root>" })?;

    let get = |field: &'static str| -> Result<&Value, SafeError> {
        map.iter()
            .find(|(k, _)| k.as_str() == Some(field))
            .map(|(_, v)| v)
            .ok_or(SafeFormatError::MissingField(field).into())
    };

    let safe_type = get("type")?
        .as_str()
        .ok_or(SafeFormatError::WrongType { field: "type" })?;
    if safe_type != ELGAMAL_TYPE {
        return Err(SafeFormatError::UnknownType(safe_type.to_string()).into());
    }

    let n_blocks = get("n-blocks")?
        .as_u64()
        .ok_or(SafeFormatError::WrongType { field: "n-blocks" })? as usize;
    let bytes_per_block = get("bytes-per-block")?
        .as_u64()
        .ok_or(SafeFormatError::WrongType { field: "bytes-per-block" })? as usize;
    let block_index_size = get("block-index-size")?
        .as_u64()
        .ok_or(SafeFormatError::WrongType { field: "block-index-size" })? as u8;
    let slice_size = get("slice-size")?
        .as_u64()
        .ok_or(SafeFormatError::WrongType { field: "slice-size" })? as u8;

    validate_block_index_size(block_index_size)?;
    validate_slice_size(slice_size)?;

    let group_params_array = get("group-params")?
        .as_array()
        .ok_or(SafeFormatError::WrongType { field: "group-params" })?;
    if group_params_array.len() != 2 {
        return Err(SafeFormatError::GroupParamsArity(group_params_array.len()).into());
    }
    let g = mpz_decode(
        group_params_array[0]
            .as_slice()
            .ok_or(SafeFormatError::WrongType { field: "group-params[0]" })?,
    );
    let p = mpz_decode(
        group_params_array[1]
            .as_slice()
            .ok_or(SafeFormatError::WrongType { field: "group-params[1]" })?,
    );
    let group_params = GroupParams { g, p };

    // Every possible `bytes_per_block`-byte string, interpreted as a
    // big-endian integer, must already be less than `p` — the block's
    // plaintext (`next_index || chunk`) is never reduced mod `p` before
    // encryption, so if this didn't hold a plaintext could silently wrap.
    let max_value = num_bigint::BigUint::from(1u32) << (bytes_per_block * 8);
    if max_value >= group_params.p {
        return Err(SafeFormatError::BytesPerBlockTooLarge { bytes_per_block }.into());
    }

    let key_stretching: KeyStretchingParams = from_nested_value(get("key-stretching")?)?;
    let key_derivation: KeyDerivationParams = from_nested_value(get("key-derivation")?)?;
    let block_cipher: BlockCipherParams = from_nested_value(get("block-cipher")?)?;

    let blocks_value = get("blocks")?
        .as_array()
        .ok_or(SafeFormatError::WrongType { field: "blocks" })?;
    if blocks_value.len() != n_blocks {
        return Err(SafeFormatError::BlockCountMismatch {
            declared: n_blocks,
            actual: blocks_value.len(),
        }
        .into());
    }

    let mut blocks = Vec::with_capacity(n_blocks);
    for (index, entry) in blocks_value.iter().enumerate() {
        blocks.push(block_from_value(entry, index)?);
    }
    for (index, block) in blocks.iter().enumerate() {
        block.validate(&group_params, index)?;
    }

    let params = SafeParams {
        n_blocks,
        bytes_per_block,
        block_index_size,
        slice_size,
        group_params,
        key_stretching,
        key_derivation,
        block_cipher,
    };

    Ok(Safe::from_parts(params, blocks))
}

fn block_to_value(block: &Block) -> Value {
    Value::Array(vec![
        Value::Binary(block.c1.clone()),
        Value::Binary(block.c2.clone()),
        Value::Binary(block.pubkey.clone()),
    ])
}

fn block_from_value(value: &Value, index: usize) -> Result<Block, SafeError> {
    let parts = value.as_array().ok_or_else(|| SafeFormatError::BadBlock {
        index,
        reason: "block entry is not an array".to_string(),
    })?;
    if parts.len() != 3 {
        return Err(SafeFormatError::BadBlock {
            index,
            reason: format!("block entry has {} elements, expected 3", parts.len()),
        }
        .into());
    }
    let component = |i: usize, name: &'static str| -> Result<Vec<u8>, SafeError> {
        parts[i]
            .as_slice()
            .map(|s| s.to_vec())
            .ok_or_else(|| {
                SafeFormatError::BadBlock {
                    index,
                    reason: format!("{name} is not a byte string"),
                }
                .into()
            })
    };
    Ok(Block {
        c1: component(0, "c1")?,
        c2: component(1, "c2")?,
        pubkey: component(2, "pubkey")?,
    })
}

fn to_nested_value<T: Serialize>(v: &T) -> Value {
    let bytes = rmp_serde::to_vec_named(v).expect("primitive param enums always serialize");
    rmpv::decode::read_value(&mut &bytes[..]).expect("round-trip through our own encoder cannot fail")
}

fn from_nested_value<T: DeserializeOwned>(value: &Value) -> Result<T, SafeError> {
    let mut buf = Vec::new();
    rmpv::encode::write_value(&mut buf, value).expect("in-memory Vec<u8> write cannot fail");
    rmp_serde::from_slice(&buf).map_err(|e| SafeFormatError::Encoding(e.to_string()).into())
}
