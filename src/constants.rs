//! Fixed, format-stable constants.
//!
//! These byte values are part of the on-disk contract: changing any of them
//! changes which blocks a given password claims. They must never change.

/// Domain-separation tag mixed into the key derivation for a block's ElGamal
/// private key.
pub const TAG_ELGAMAL: [u8; 16] = *b"\xd5\x3d\x37\x6a\x7d\xb4\x98\x95\x6d\x7d\x7f\x5e\x57\x05\x09\xd5";

/// Domain-separation tag for the per-slice symmetric stream-cipher key.
pub const TAG_SYMM: [u8; 16] = *b"\x41\x10\x25\x2b\x74\x0b\x03\xc5\x3b\x1c\x11\xd6\x37\x37\x43\xfb";

/// Reserved for the container layer's list-access key role.
///
/// Intentionally identical to [`TAG_ELGAMAL`]. This collapses the domain
/// separation between elgamal-privkey derivation and container list-key
/// derivation; it is preserved byte-for-byte for backward compatibility with
/// existing safe files. See the open question in `DESIGN.md`.
pub const TAG_LIST: [u8; 16] = TAG_ELGAMAL;

/// Reserved for the container layer's append-access key role.
pub const TAG_APPEND: [u8; 16] = *b"\x76\x00\x1c\x34\x4c\xbd\x9e\x73\xa6\xb5\xbd\x48\xb6\x72\x66\xd9";

/// Constants reserved for the container layer's access-slice encoding.
/// Unused by the core; exposed for interoperability.
pub mod access_slice {
    /// Starting bytes of an access slice.
    pub const MAGIC: [u8; 4] = [0x1a, 0x1a, 0x8a, 0xd7];

    /// The access slice grants full access.
    pub const FULL: u8 = 0;
    /// The access slice grants list-only access.
    pub const LIST: u8 = 1;
    /// The access slice grants append-only access.
    pub const APPEND: u8 = 2;
}

/// Output length, in bytes, of the key-stretching step (`KS(password)`).
/// Also the IKM length fed into every `KD` call.
pub const BASE_KEY_LEN: usize = 32;
