//! Background scan producer.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use fimscan_core::{Event, ExcludeMatcher, ScanConfig, ScanError};
use fimscan_hash::{EventBuilder, HashingEventBuilder};

use crate::EVENT_CHANNEL_SIZE;
use crate::counters::{ScanCounters, ScanSummary};
use crate::throttle::Throttle;
use crate::walker::{Entry, Visit, WalkOutcome, Walker, resolve_root};

/// Scans the configured paths and streams one [`Event`] per entry.
///
/// A scanner is started once; [`start`](Self::start) consumes it.
pub struct Scanner {
    id: Uuid,
    config: ScanConfig,
    builder: Arc<dyn EventBuilder>,
    counters: Arc<ScanCounters>,
}

impl Scanner {
    /// Create a scanner that hashes with the config's limits.
    pub fn new(config: ScanConfig) -> Self {
        let builder = Arc::new(HashingEventBuilder::from_config(&config));
        Self::with_event_builder(config, builder)
    }

    /// Create a scanner with a custom event builder.
    pub fn with_event_builder(config: ScanConfig, builder: Arc<dyn EventBuilder>) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            builder,
            counters: Arc::new(ScanCounters::new()),
        }
    }

    /// Use a caller-supplied identifier in log output.
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Shared handle to the running totals.
    pub fn counters(&self) -> Arc<ScanCounters> {
        Arc::clone(&self.counters)
    }

    /// Start scanning in the background.
    ///
    /// The returned channel yields events until every root has been
    /// scanned or `cancel` fires, then closes. It must be drained: the scan
    /// waits for the consumer whenever the channel is full.
    ///
    /// Only setup problems are returned as errors. Unreadable paths are
    /// logged and skipped.
    pub fn start(self, cancel: CancellationToken) -> Result<mpsc::Receiver<Event>, ScanError> {
        let runtime = Handle::try_current().map_err(|_| ScanError::NoRuntime)?;
        self.config.validate()?;
        let exclude = self.config.exclude_matcher()?;

        let span = info_span!("file_integrity_scanner", scanner_id = %self.id);
        let throttle = span.in_scope(|| Throttle::from_config(&self.config));
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_SIZE);

        let task = ScanTask {
            config: self.config,
            exclude,
            builder: self.builder,
            counters: self.counters,
            throttle,
            tx,
            cancel,
            runtime: runtime.clone(),
        };

        runtime.spawn_blocking(move || {
            let _entered = span.enter();
            task.run()
        });

        Ok(rx)
    }
}

/// State owned by the background task for the duration of a scan.
struct ScanTask {
    config: ScanConfig,
    exclude: ExcludeMatcher,
    builder: Arc<dyn EventBuilder>,
    counters: Arc<ScanCounters>,
    throttle: Throttle,
    tx: mpsc::Sender<Event>,
    cancel: CancellationToken,
    runtime: Handle,
}

impl ScanTask {
    fn run(mut self) -> ScanSummary {
        debug!(file_path = ?self.config.paths, "File system scanner is starting");
        let start = Instant::now();

        let paths = std::mem::take(&mut self.config.paths);
        let exclude = std::mem::take(&mut self.exclude);
        let walker = Walker::new(self.config.recursive, &exclude);

        for path in &paths {
            let root = match resolve_root(path) {
                Ok(root) => root,
                Err(err) => {
                    warn!(file_path = %path.display(), error = %err, "Failed to scan");
                    continue;
                }
            };

            if self.scan_root(&walker, root) == WalkOutcome::Aborted {
                break;
            }
        }

        drop(self.tx);
        let summary = self.counters.summary(start.elapsed());
        info!(
            took = ?summary.elapsed,
            file_count = summary.file_count,
            total_bytes = summary.total_bytes,
            bytes_per_sec = summary.bytes_per_second(),
            files_per_sec = summary.files_per_second(),
            "File system scan completed"
        );
        debug!("File system scanner is stopping");
        summary
    }

    fn scan_root(&mut self, walker: &Walker<'_>, root: PathBuf) -> WalkOutcome {
        let mut last = Instant::now();
        walker.walk(&root, |entry| {
            let visit = self.visit(entry, last);
            last = Instant::now();
            visit
        })
    }

    /// `since` is when the previous entry was handed off.
    fn visit(&mut self, entry: Entry, since: Instant) -> Visit {
        let Entry { path, metadata, .. } = entry;
        let event = self.builder.build(&path, Ok(metadata));
        let event = event.with_rtt(since.elapsed());
        self.counters.record(&event);

        // Only hashed bytes are rate limited; empty files cost nothing.
        let throttle_bytes = event.size().filter(|&size| size > 0 && event.is_hashed());
        if !self.deliver(event) {
            return Visit::Abort;
        }

        if let Some(bytes) = throttle_bytes {
            self.throttle(bytes);
        }
        Visit::Continue
    }

    /// Send an event, giving up if the scan is cancelled first.
    fn deliver(&self, event: Event) -> bool {
        let tx = &self.tx;
        let cancel = &self.cancel;
        self.runtime.block_on(async {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => false,
                sent = tx.send(event) => match sent {
                    Ok(()) => true,
                    Err(_) => {
                        debug!("Event receiver dropped, stopping scan");
                        false
                    }
                },
            }
        })
    }

    /// Wait out the throttle's debt for `bytes` of hashed content.
    fn throttle(&mut self, bytes: u64) {
        let wait = self.throttle.reserve(bytes);
        if wait.is_zero() {
            return;
        }
        let cancel = &self.cancel;
        self.runtime.block_on(async {
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = cancel.cancelled() => {}
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fimscan_core::HashType;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Builder that records how often it is called.
    struct CountingBuilder {
        inner: HashingEventBuilder,
        calls: AtomicUsize,
    }

    impl EventBuilder for CountingBuilder {
        fn build(&self, path: &std::path::Path, stat: std::io::Result<std::fs::Metadata>) -> Event {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.build(path, stat)
        }
    }

    /// Builder that takes a fixed time per entry.
    struct SlowBuilder {
        inner: HashingEventBuilder,
        delay: Duration,
    }

    impl EventBuilder for SlowBuilder {
        fn build(&self, path: &std::path::Path, stat: std::io::Result<std::fs::Metadata>) -> Event {
            std::thread::sleep(self.delay);
            self.inner.build(path, stat)
        }
    }

    fn create_test_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("f1"), vec![1u8; 10]).unwrap();
        fs::write(root.join("f2"), vec![2u8; 20]).unwrap();
        fs::create_dir(root.join("b")).unwrap();
        fs::write(root.join("b/f3"), vec![3u8; 5]).unwrap();
        temp
    }

    async fn drain(mut rx: mpsc::Receiver<Event>) -> Vec<Event> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_start_outside_runtime_fails() {
        let scanner = Scanner::new(ScanConfig::new(["/"]));
        let err = scanner.start(CancellationToken::new()).unwrap_err();
        assert!(matches!(err, ScanError::NoRuntime));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_invalid_config_fails_before_spawning() {
        let temp = create_test_tree();
        let builder = Arc::new(CountingBuilder {
            inner: HashingEventBuilder::new(1024, Vec::new()),
            calls: AtomicUsize::new(0),
        });
        let mut config = ScanConfig::new([temp.path()]);
        config.exclude_patterns = vec!["{unclosed".to_string()];

        let scanner = Scanner::with_event_builder(config, builder.clone());
        assert!(scanner.start(CancellationToken::new()).is_err());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(builder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_counts_match_events() {
        let temp = create_test_tree();
        let mut config = ScanConfig::new([temp.path()]);
        config.recursive = true;

        let scanner = Scanner::new(config);
        let counters = scanner.counters();
        let events = drain(scanner.start(CancellationToken::new()).unwrap()).await;

        assert_eq!(events.len(), 5);
        assert_eq!(counters.file_count(), 5);
        assert_eq!(counters.byte_count(), 35);
        assert_eq!(events.iter().filter(|e| e.is_hashed()).count(), 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_full_channel_blocks_producer() {
        let temp = create_test_tree();
        let mut config = ScanConfig::new([temp.path()]);
        config.recursive = true;

        let scanner = Scanner::new(config);
        let counters = scanner.counters();
        let cancel = CancellationToken::new();
        let rx = scanner.start(cancel.clone()).unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        // One event sits in the channel, one is waiting to be sent.
        assert!(counters.file_count() <= 2);

        cancel.cancel();
        let events = drain(rx).await;
        assert!(events.len() <= 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_dropped_receiver_stops_scan() {
        let temp = create_test_tree();
        let mut config = ScanConfig::new([temp.path()]);
        config.recursive = true;

        let scanner = Scanner::new(config);
        let counters = scanner.counters();
        let rx = scanner.start(CancellationToken::new()).unwrap();
        drop(rx);

        tokio::time::sleep(Duration::from_millis(200)).await;
        // At most one event reached the channel before it closed.
        assert!(counters.file_count() <= 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_rtt_includes_event_building() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("only"), b"content").unwrap();

        let delay = Duration::from_millis(100);
        let builder = Arc::new(SlowBuilder {
            inner: HashingEventBuilder::new(1024, vec![HashType::Blake3]),
            delay,
        });
        let scanner = Scanner::with_event_builder(ScanConfig::new([temp.path()]), builder);
        let events = drain(scanner.start(CancellationToken::new()).unwrap()).await;

        assert_eq!(events.len(), 2);
        for event in &events {
            assert!(event.rtt >= delay, "{} took {:?}", event.path.display(), event.rtt);
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_with_id_is_kept() {
        let id = Uuid::new_v4();
        let scanner = Scanner::new(ScanConfig::new(["/"])).with_id(id);
        assert_eq!(scanner.id(), id);
        assert_eq!(scanner.config().paths, vec![PathBuf::from("/")]);
    }
}
