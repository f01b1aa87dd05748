//! Conversion of lstat results into [`FileInfo`].

use std::fs::Metadata;
use std::time::UNIX_EPOCH;

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

use chrono::{DateTime, Utc};

use fimscan_core::{FileInfo, FileType};

/// Capture the integrity-relevant fields of an entry's metadata.
pub fn file_info(metadata: &Metadata) -> FileInfo {
    FileInfo {
        file_type: FileType::from(metadata.file_type()),
        size: metadata.len(),
        mode: get_mode(metadata),
        inode: get_ino(metadata),
        uid: get_uid(metadata),
        gid: get_gid(metadata),
        mtime: DateTime::<Utc>::from(metadata.modified().unwrap_or(UNIX_EPOCH)),
        ctime: get_ctime(metadata),
    }
}

// Cross-platform metadata helpers

#[cfg(unix)]
fn get_mode(metadata: &Metadata) -> u32 {
    metadata.mode() & 0o7777
}

#[cfg(not(unix))]
fn get_mode(metadata: &Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o666
    }
}

#[cfg(unix)]
fn get_ino(metadata: &Metadata) -> u64 {
    metadata.ino()
}

#[cfg(not(unix))]
fn get_ino(_metadata: &Metadata) -> u64 {
    0
}

#[cfg(unix)]
fn get_uid(metadata: &Metadata) -> u32 {
    metadata.uid()
}

#[cfg(not(unix))]
fn get_uid(_metadata: &Metadata) -> u32 {
    0
}

#[cfg(unix)]
fn get_gid(metadata: &Metadata) -> u32 {
    metadata.gid()
}

#[cfg(not(unix))]
fn get_gid(_metadata: &Metadata) -> u32 {
    0
}

/// Status change time; Windows has no equivalent.
#[cfg(unix)]
fn get_ctime(metadata: &Metadata) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(metadata.ctime(), metadata.ctime_nsec() as u32)
}

#[cfg(not(unix))]
fn get_ctime(_metadata: &Metadata) -> Option<DateTime<Utc>> {
    None
}
