//! Running totals and end-of-scan summary.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

use fimscan_core::Event;

/// Files and bytes seen by a scan.
///
/// Written only by the scan task; safe to read from anywhere at any time.
#[derive(Debug, Default)]
pub struct ScanCounters {
    files: AtomicU64,
    bytes: AtomicU64,
}

impl ScanCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one visited entry, and its size if it is a regular file.
    pub fn record(&self, event: &Event) {
        self.files.fetch_add(1, Ordering::Relaxed);
        if let Some(info) = event.info.as_ref().filter(|info| info.is_file()) {
            self.bytes.fetch_add(info.size, Ordering::Relaxed);
        }
    }

    /// Number of entries visited so far, directories included.
    pub fn file_count(&self) -> u64 {
        self.files.load(Ordering::Relaxed)
    }

    /// Bytes of regular files visited so far.
    pub fn byte_count(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    /// Combine the current totals with the elapsed time.
    pub fn summary(&self, elapsed: Duration) -> ScanSummary {
        ScanSummary {
            elapsed,
            file_count: self.file_count(),
            total_bytes: self.byte_count(),
        }
    }
}

/// Totals and throughput of a finished scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScanSummary {
    /// Wall-clock time the scan took.
    pub elapsed: Duration,
    pub file_count: u64,
    pub total_bytes: u64,
}

impl ScanSummary {
    /// Calculate scan rate in bytes per second.
    pub fn bytes_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.total_bytes as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Calculate scan rate in files per second.
    pub fn files_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.file_count as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}
