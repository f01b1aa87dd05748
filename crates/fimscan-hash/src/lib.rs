//! Metadata extraction and content hashing for fimscan.
//!
//! Turns a path and its lstat result into a fully populated [`Event`]:
//!
//! 1. Metadata is captured without following links
//! 2. Symbolic links record their target
//! 3. Regular files within the size limit are hashed with every configured
//!    algorithm in a single read pass
//!
//! Failures at any stage are recorded on the event rather than returned.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use fimscan_hash::{EventBuilder, HashingEventBuilder};
//! use fimscan_core::HashType;
//!
//! let builder = HashingEventBuilder::new(1024 * 1024, vec![HashType::Sha256]);
//! let path = Path::new("/etc/hosts");
//! let event = builder.build(path, std::fs::symlink_metadata(path));
//! println!("{:?}", event.hashes);
//! ```

mod builder;
mod hasher;
mod metadata;

pub use builder::{EventBuilder, HashingEventBuilder};
pub use hasher::{MultiHasher, hash_file};
pub use metadata::file_info;

pub use fimscan_core::{Digest, Event, FileInfo, HashType, Hashes};
