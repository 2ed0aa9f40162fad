//! Foundation types for Grove.
//!
//! This crate provides the identifier and discriminator types used throughout
//! the Grove content-addressed store. Every other Grove crate depends on
//! `grove-types`.
//!
//! # Key Types
//!
//! - [`NodeHash`] — content-addressed identifier (BLAKE3 digest of a node's
//!   canonical encoding)
//! - [`NodeId`] — process-local stable integer identity assigned at first insert
//! - [`FamilyId`] — independent garbage-collection namespace
//! - [`NodeTag`] — node kind discriminator (leaf-with-blob vs. branch-with-children)
//! - [`BlobRef`] — opaque reference into an external blob store

pub mod error;
pub mod hash;
pub mod ids;
pub mod node;

pub use error::TypeError;
pub use hash::NodeHash;
pub use ids::{FamilyId, Generation, NodeId};
pub use node::{BlobRef, NodeTag};
