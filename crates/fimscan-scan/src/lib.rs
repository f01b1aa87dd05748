//! File system scanning engine for fimscan.
//!
//! # Overview
//!
//! `fimscan-scan` walks the configured root paths and emits one
//! [`Event`] per visited entry. Key features:
//!
//! - **Ordered traversal** with exclusion and recursion policy
//! - **Backpressure** through a single-slot channel
//! - **Rate limiting** of hashing I/O via a token bucket
//! - **Cooperative cancellation** via [`CancellationToken`]
//!
//! # Example
//!
//! ```rust,no_run
//! use fimscan_scan::{ScanConfig, Scanner};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), fimscan_scan::ScanError> {
//! let config = ScanConfig::new(["/etc"]);
//! let scanner = Scanner::new(config);
//! let counters = scanner.counters();
//!
//! let mut events = scanner.start(CancellationToken::new())?;
//! while let Some(event) = events.recv().await {
//!     println!("{}", event.path.display());
//! }
//!
//! println!("Scanned {} entries", counters.file_count());
//! # Ok(())
//! # }
//! ```

mod counters;
mod scanner;
mod throttle;
mod walker;

pub use counters::{ScanCounters, ScanSummary};
pub use scanner::Scanner;
pub use throttle::{Throttle, TokenBucket};
pub use walker::{Entry, Visit, WalkOutcome, Walker, resolve_root};

pub use tokio_util::sync::CancellationToken;

// Re-export core types for convenience
pub use fimscan_core::{
    Action, Digest, Event, ExcludeMatcher, FileInfo, FileType, HashType, ScanConfig, ScanError,
    Source,
};
pub use fimscan_hash::{EventBuilder, HashingEventBuilder};

/// Capacity of the event channel. A single slot makes the producer wait
/// for the consumer instead of buffering.
pub const EVENT_CHANNEL_SIZE: usize = 1;
