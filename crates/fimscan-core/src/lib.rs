//! Core types and configuration for fimscan.
//!
//! This crate provides the data structures shared by the hashing and
//! scanning crates: the scan configuration, the integrity event emitted per
//! visited entry, hash algorithm identifiers, and the error taxonomy.

mod config;
mod error;
mod event;
mod hash;
mod size;

pub use config::{DEFAULT_MAX_FILE_SIZE, ExcludeMatcher, ScanConfig, ScanConfigBuilder};
pub use error::ScanError;
pub use event::{Action, EntryError, ErrorStage, Event, FileInfo, FileType, Source};
pub use hash::{Digest, HashType, Hashes};
pub use size::{parse_size, serde_size, serde_size_opt};
