//! Integrity events emitted per visited file-system entry.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hash::Hashes;

/// What happened to an entry.
///
/// A scan reports every entry as existing baseline state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    #[default]
    None,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
        }
    }
}

/// Where an event originated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Produced by walking the file system.
    #[default]
    Scan,
}

/// Type of file system entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    File,
    Dir,
    Symlink,
    /// Sockets, devices, fifos.
    Other,
}

impl From<std::fs::FileType> for FileType {
    fn from(ft: std::fs::FileType) -> Self {
        if ft.is_symlink() {
            Self::Symlink
        } else if ft.is_dir() {
            Self::Dir
        } else if ft.is_file() {
            Self::File
        } else {
            Self::Other
        }
    }
}

/// File metadata captured from an lstat of the entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Entry type. Links are never followed.
    #[serde(rename = "type")]
    pub file_type: FileType,
    /// Size in bytes.
    pub size: u64,
    /// Permission bits, including setuid/setgid/sticky.
    pub mode: u32,
    pub inode: u64,
    pub uid: u32,
    pub gid: u32,
    /// Last modification time.
    pub mtime: DateTime<Utc>,
    /// Last status change time (Unix only).
    pub ctime: Option<DateTime<Utc>>,
}

impl FileInfo {
    /// Check if this entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Dir
    }

    /// Check if this entry is a regular file.
    pub fn is_file(&self) -> bool {
        self.file_type == FileType::File
    }

    /// Check if this entry is a symbolic link.
    pub fn is_symlink(&self) -> bool {
        self.file_type == FileType::Symlink
    }
}

/// Stage at which inspecting an entry failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorStage {
    Stat,
    ReadLink,
    Hash,
}

/// A failure recorded on an event instead of aborting the scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryError {
    pub stage: ErrorStage,
    pub message: String,
}

impl EntryError {
    pub fn new(stage: ErrorStage, error: impl fmt::Display) -> Self {
        Self {
            stage,
            message: error.to_string(),
        }
    }
}

/// One integrity-relevant observation of a file-system entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// When the event was created.
    pub timestamp: DateTime<Utc>,
    /// Path of the entry.
    pub path: PathBuf,
    /// Target of a symbolic link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_path: Option<PathBuf>,
    /// Metadata, absent when the entry could not be inspected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<FileInfo>,
    pub source: Source,
    pub action: Action,
    /// Content digests. Empty unless the entry is a regular file within
    /// the configured size limit.
    #[serde(default, skip_serializing_if = "Hashes::is_empty")]
    pub hashes: Hashes,
    /// Time spent producing this event since the previous one was handled.
    #[serde(skip)]
    pub rtt: Duration,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<EntryError>,
}

impl Event {
    /// Create an event with no metadata, hashes or errors.
    pub fn new(path: impl Into<PathBuf>, source: Source, action: Action) -> Self {
        Self {
            timestamp: Utc::now(),
            path: path.into(),
            target_path: None,
            info: None,
            source,
            action,
            hashes: Hashes::new(),
            rtt: Duration::ZERO,
            errors: Vec::new(),
        }
    }

    /// Attach the measured production latency.
    pub fn with_rtt(mut self, rtt: Duration) -> Self {
        self.rtt = rtt;
        self
    }

    /// Check if content hashes were computed for this entry.
    pub fn is_hashed(&self) -> bool {
        !self.hashes.is_empty()
    }

    /// Size of the entry, if it could be inspected.
    pub fn size(&self) -> Option<u64> {
        self.info.as_ref().map(|info| info.size)
    }

    /// Check if any stage of inspection failed.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
