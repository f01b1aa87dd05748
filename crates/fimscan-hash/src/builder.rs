//! Building events from visited entries.

use std::fs::{self, Metadata};
use std::io;
use std::path::Path;

use fimscan_core::{Action, EntryError, ErrorStage, Event, HashType, ScanConfig, Source};

use crate::hasher::hash_file;
use crate::metadata::file_info;

/// Produces one [`Event`] for a visited entry.
///
/// Implementations never fail: a stat error or a hashing error is encoded
/// into the returned event.
pub trait EventBuilder: Send + Sync {
    /// Build the event for `path` given the result of inspecting it.
    fn build(&self, path: &Path, stat: io::Result<Metadata>) -> Event;
}

/// Default builder: metadata, symlink target, and content hashes.
#[derive(Debug, Clone)]
pub struct HashingEventBuilder {
    max_file_size: u64,
    hash_types: Vec<HashType>,
}

impl HashingEventBuilder {
    /// Create a builder hashing files up to `max_file_size` bytes.
    pub fn new(max_file_size: u64, hash_types: Vec<HashType>) -> Self {
        Self {
            max_file_size,
            hash_types,
        }
    }

    /// Create a builder using the limits of a scan config.
    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(config.max_file_size, config.hash_types.clone())
    }

    fn should_hash(&self, size: u64) -> bool {
        !self.hash_types.is_empty() && size <= self.max_file_size
    }
}

impl EventBuilder for HashingEventBuilder {
    fn build(&self, path: &Path, stat: io::Result<Metadata>) -> Event {
        let mut event = Event::new(path, Source::Scan, Action::None);

        let metadata = match stat {
            Ok(metadata) => metadata,
            Err(err) => {
                event.errors.push(EntryError::new(ErrorStage::Stat, err));
                return event;
            }
        };
        let info = file_info(&metadata);

        if info.is_symlink() {
            match fs::read_link(path) {
                Ok(target) => event.target_path = Some(target),
                Err(err) => event.errors.push(EntryError::new(ErrorStage::ReadLink, err)),
            }
        }

        if info.is_file() && self.should_hash(info.size) {
            match hash_file(path, self.max_file_size, &self.hash_types) {
                Ok(hashes) => event.hashes = hashes,
                Err(err) => {
                    tracing::debug!(file_path = %path.display(), error = %err, "Failed to hash file");
                    event.errors.push(EntryError::new(ErrorStage::Hash, err));
                }
            }
        }

        event.info = Some(info);
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn builder() -> HashingEventBuilder {
        HashingEventBuilder::new(16, vec![HashType::Sha256, HashType::Blake3])
    }

    #[test]
    fn test_regular_file_is_hashed() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("f1");
        fs::write(&path, b"abc").unwrap();

        let event = builder().build(&path, fs::symlink_metadata(&path));
        assert_eq!(event.path, path);
        assert_eq!(event.size(), Some(3));
        assert_eq!(event.hashes.len(), 2);
        assert_eq!(event.action, Action::None);
        assert_eq!(event.source, Source::Scan);
        assert!(!event.has_errors());
    }

    #[test]
    fn test_oversized_file_is_not_hashed() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("big");
        fs::write(&path, vec![b'x'; 17]).unwrap();

        let event = builder().build(&path, fs::symlink_metadata(&path));
        assert_eq!(event.size(), Some(17));
        assert!(!event.is_hashed());
    }

    #[test]
    fn test_file_at_limit_is_hashed() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("exact");
        fs::write(&path, vec![b'x'; 16]).unwrap();

        let event = builder().build(&path, fs::symlink_metadata(&path));
        assert!(event.is_hashed());
    }

    #[test]
    fn test_directory_is_not_hashed() {
        let temp = TempDir::new().unwrap();
        let event = builder().build(temp.path(), fs::symlink_metadata(temp.path()));
        assert!(event.info.as_ref().unwrap().is_dir());
        assert!(!event.is_hashed());
    }

    #[test]
    fn test_no_hash_types_means_no_hashing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("f");
        fs::write(&path, b"abc").unwrap();

        let event = HashingEventBuilder::new(1024, Vec::new()).build(&path, fs::symlink_metadata(&path));
        assert!(!event.is_hashed());
        assert!(event.info.is_some());
    }

    #[test]
    fn test_stat_error_is_encoded() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing");

        let event = builder().build(&path, fs::symlink_metadata(&path));
        assert!(event.info.is_none());
        assert_eq!(event.errors.len(), 1);
        assert_eq!(event.errors[0].stage, ErrorStage::Stat);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_records_target() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target.txt");
        fs::write(&target, b"abc").unwrap();
        let link = temp.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let event = builder().build(&link, fs::symlink_metadata(&link));
        assert_eq!(event.target_path.as_deref(), Some(target.as_path()));
        assert!(event.info.as_ref().unwrap().is_symlink());
        assert!(!event.is_hashed());
    }
}
