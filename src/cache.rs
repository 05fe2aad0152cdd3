//! Single-slot snapshot cache.
//!
//! The current [`Snapshot`] lives behind an [`ArcSwapOption`]. Publishing
//! swaps one pointer and reading clones one `Arc`, so readers never wait on
//! the refresh pipeline and never see a half-built snapshot.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use bytes::Bytes;
use chrono::{DateTime, Local, Utc};

use crate::capture::SnapshotFormat;

/// A published, immutable annotated frame.
#[derive(Debug)]
pub struct Snapshot {
    bytes: Bytes,
    captured_at: DateTime<Local>,
    format: SnapshotFormat,
    sequence: u64,
}

impl Snapshot {
    pub fn new(bytes: Bytes, captured_at: DateTime<Local>, format: SnapshotFormat, sequence: u64) -> Self {
        Self {
            bytes,
            captured_at,
            format,
            sequence,
        }
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Wall-clock instant the capture started.
    pub fn captured_at(&self) -> DateTime<Local> {
        self.captured_at
    }

    pub fn format(&self) -> SnapshotFormat {
        self.format
    }

    /// Position in the sequence of successful cycles, starting at 1.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Capture time as an HTTP date (`Last-Modified`).
    pub fn http_date(&self) -> String {
        self.captured_at
            .with_timezone(&Utc)
            .format("%a, %d %b %Y %H:%M:%S GMT")
            .to_string()
    }
}

/// Holds at most one snapshot. Written only by the refresh scheduler.
#[derive(Default)]
pub struct SnapshotCache {
    current: ArcSwapOption<Snapshot>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically replace the current snapshot.
    pub fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        self.current.store(Some(Arc::clone(&snapshot)));
        snapshot
    }

    /// Current snapshot, or `None` before the first successful cycle.
    pub fn read(&self) -> Option<Arc<Snapshot>> {
        self.current.load_full()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    use chrono::TimeZone;

    use super::*;

    fn snapshot(sequence: u64) -> Snapshot {
        // Content derives from the sequence so a torn read is detectable.
        let len = 1024 + (sequence as usize % 7) * 512;
        Snapshot::new(
            Bytes::from(vec![sequence as u8; len]),
            Local::now(),
            SnapshotFormat::Jpeg,
            sequence,
        )
    }

    #[test]
    fn test_empty_cache_is_unavailable() {
        assert!(SnapshotCache::new().read().is_none());
    }

    #[test]
    fn test_publish_replaces_whole_snapshot() {
        let cache = SnapshotCache::new();
        let first = cache.publish(snapshot(1));
        assert!(Arc::ptr_eq(&cache.read().unwrap(), &first));

        let second = cache.publish(snapshot(2));
        let current = cache.read().unwrap();
        assert!(Arc::ptr_eq(&current, &second));
        assert_eq!(current.sequence(), 2);
        // Readers holding the old handle keep a complete copy.
        assert_eq!(first.bytes().len(), 1024 + 512);
        assert!(first.bytes().iter().all(|&b| b == 1));
    }

    #[test]
    fn test_concurrent_reads_never_observe_torn_snapshots() {
        let cache = SnapshotCache::new();
        let done = AtomicBool::new(false);

        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    let mut last_seen = 0;
                    while !done.load(Ordering::Acquire) {
                        if let Some(snap) = cache.read() {
                            let seq = snap.sequence();
                            let expected_len = 1024 + (seq as usize % 7) * 512;
                            assert_eq!(snap.bytes().len(), expected_len);
                            assert!(snap.bytes().iter().all(|&b| b == seq as u8));
                            // The single writer publishes in order.
                            assert!(seq >= last_seen);
                            last_seen = seq;
                        }
                    }
                });
            }

            for seq in 1..=2_000 {
                cache.publish(snapshot(seq));
            }
            done.store(true, Ordering::Release);
        });

        assert_eq!(cache.read().unwrap().sequence(), 2_000);
    }

    #[test]
    fn test_http_date_is_utc() {
        let at = Utc
            .with_ymd_and_hms(2024, 1, 3, 14, 5, 0)
            .unwrap()
            .with_timezone(&Local);
        let snap = Snapshot::new(Bytes::new(), at, SnapshotFormat::Png, 1);

        assert_eq!(snap.http_date(), "Wed, 03 Jan 2024 14:05:00 GMT");
    }
}
