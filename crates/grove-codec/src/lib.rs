//! Canonical node encoding and content hashing for Grove.
//!
//! A node's identity is the BLAKE3 digest of its canonical encoding, so the
//! encoding must be strictly deterministic: equal logical inputs always
//! produce byte-identical output, and child order is significant and
//! preserved (it is part of node identity, never normalized).
//!
//! - [`encode`] / [`decode`] — the canonical binary codec; `decode` is the
//!   exact inverse of `encode` and rejects anything else with
//!   [`CodecError::CorruptEncoding`]
//! - [`NodeHasher`] — domain-separated BLAKE3 hasher producing [`NodeHash`]
//!   values from encoded bytes
//!
//! [`NodeHash`]: grove_types::NodeHash

pub mod codec;
pub mod digest;
pub mod error;

pub use codec::{decode, encode, DecodedNode};
pub use digest::NodeHasher;
pub use error::{CodecError, CodecResult};
