use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// Default number of admitted requests per user per window.
pub const DEFAULT_LIMIT: usize = 10;

/// Default sliding-window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Opaque identifier for a requesting end user.
pub type UserId = u64;

/// Per-user sliding-window request limiter.
///
/// Each user has an ordered record of admission timestamps. On every call the
/// record is pruned of entries older than the window, then the request is
/// either denied (record full) or admitted and stamped. Denied calls record
/// nothing, so a record never holds more than `limit` entries.
///
/// The window boundary is a hard cutoff: up to `limit` requests can land in
/// rapid succession right after the window rolls over. That burst is expected
/// behavior for this bot, not a bug.
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    windows: Mutex<HashMap<UserId, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Decide whether a request from `user` may proceed right now.
    pub fn admit(&self, user: UserId) -> bool {
        self.admit_at(user, Instant::now())
    }

    /// Clock-injected form of [`admit`](Self::admit), used by tests.
    ///
    /// The prune-count-append sequence runs under the table lock, so
    /// concurrent calls for the same user cannot both slip past the limit.
    pub fn admit_at(&self, user: UserId, now: Instant) -> bool {
        let mut windows = self.windows.lock();
        let record = windows.entry(user).or_default();

        while let Some(&oldest) = record.front() {
            if now.saturating_duration_since(oldest) > self.window {
                record.pop_front();
            } else {
                break;
            }
        }

        if record.len() >= self.limit {
            return false;
        }
        record.push_back(now);
        true
    }

    /// Number of timestamps currently recorded for `user`.
    pub fn recorded(&self, user: UserId) -> usize {
        self.windows.lock().get(&user).map_or(0, VecDeque::len)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT, DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn admits_up_to_limit_then_denies() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.admit_at(7, now));
        assert!(limiter.admit_at(7, now));
        assert!(limiter.admit_at(7, now));
        assert!(!limiter.admit_at(7, now));
    }

    #[test]
    fn denied_calls_record_nothing() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.admit_at(1, now));
        assert!(limiter.admit_at(1, now));
        for _ in 0..50 {
            assert!(!limiter.admit_at(1, now));
        }
        assert_eq!(limiter.recorded(1), 2);
    }

    #[test]
    fn window_expiry_frees_slots() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let base = Instant::now();

        assert!(limiter.admit_at(42, base));
        assert!(limiter.admit_at(42, base));
        assert!(!limiter.admit_at(42, base + Duration::from_secs(59)));

        // Both stamps are now older than the window.
        assert!(limiter.admit_at(42, base + Duration::from_secs(61)));
        assert_eq!(limiter.recorded(42), 1);
    }

    #[test]
    fn users_do_not_affect_each_other() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.admit_at(1, now));
        assert!(!limiter.admit_at(1, now));
        assert!(limiter.admit_at(2, now));
        assert!(limiter.admit_at(3, now));
    }

    #[test]
    fn first_call_for_unseen_user_is_admitted() {
        let limiter = RateLimiter::default();
        assert!(limiter.admit(999));
    }

    #[test]
    fn concurrent_same_user_never_exceeds_limit() {
        let limiter = Arc::new(RateLimiter::new(10, Duration::from_secs(60)));

        let handles: Vec<_> = (0..64)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || limiter.admit(5))
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|admitted| *admitted)
            .count();

        assert_eq!(admitted, 10);
        assert_eq!(limiter.recorded(5), 10);
    }
}
