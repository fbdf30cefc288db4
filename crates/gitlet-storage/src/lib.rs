//! # gitlet-storage
//!
//! Content-addressed object storage for gitlet.
//!
//! Implements the canonical `<kind> <size>\0<body>` object framing, SHA-1
//! identifiers, zlib coding, and the sharded `.git/objects` on-disk layout,
//! plus the tree body codec and working-tree materialization built on top.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
pub mod fsutil;
mod object;
mod store;
pub mod tree;
pub mod worktree;
pub mod zlib;

pub use error::{Result, StorageError};
pub use object::{GitObject, ObjectId, ObjectType};
pub use store::ObjectStore;
pub use tree::TreeEntry;
