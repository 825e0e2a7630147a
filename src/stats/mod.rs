use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Process-wide service counters.
///
/// The start instant is fixed at construction; the upload counter only ever
/// increases and is bumped solely by the pipeline's success path. Reads never
/// block writers, so the health endpoint can poll freely during uploads.
pub struct ServiceStats {
    started: Instant,
    uploads: AtomicU64,
}

/// Point-in-time view of [`ServiceStats`], as exposed by the health endpoint.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatsSnapshot {
    pub uptime_seconds: u64,
    pub uploads_processed: u64,
}

impl ServiceStats {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            uploads: AtomicU64::new(0),
        }
    }

    /// Record one successful upload.
    pub fn record_upload(&self) {
        self.uploads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uploads_processed(&self) -> u64 {
        self.uploads.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            uptime_seconds: self.started.elapsed().as_secs(),
            uploads_processed: self.uploads_processed(),
        }
    }
}

impl Default for ServiceStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn starts_at_zero() {
        let stats = ServiceStats::new();
        assert_eq!(stats.snapshot().uploads_processed, 0);
    }

    #[test]
    fn counts_each_upload() {
        let stats = ServiceStats::new();
        stats.record_upload();
        stats.record_upload();
        assert_eq!(stats.uploads_processed(), 2);
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let stats = Arc::new(ServiceStats::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = stats.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        stats.record_upload();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(stats.uploads_processed(), 8000);
    }
}
