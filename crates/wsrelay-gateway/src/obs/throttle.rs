use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

const NEVER: u64 = u64::MAX;

/// Lets one event through per `every`; counts what it holds back.
///
/// Lock-free: the window start is an offset in milliseconds from `base`.
#[derive(Debug)]
pub struct LogThrottle {
    base: Instant,
    every: Duration,
    last_ms: AtomicU64,
    suppressed: AtomicU64,
}

impl LogThrottle {
    pub fn new(every: Duration) -> Self {
        Self {
            base: Instant::now(),
            every,
            last_ms: AtomicU64::new(NEVER),
            suppressed: AtomicU64::new(0),
        }
    }

    /// `Some(n)` if the caller should log now, `n` being the events held
    /// back since the last one that got through.
    pub fn allow(&self) -> Option<u64> {
        self.allow_at(Instant::now())
    }

    pub fn allow_at(&self, now: Instant) -> Option<u64> {
        let now_ms = now.saturating_duration_since(self.base).as_millis() as u64;
        let last = self.last_ms.load(Ordering::Relaxed);

        let window_open = last == NEVER || now_ms.saturating_sub(last) >= self.every.as_millis() as u64;
        if window_open
            && self
                .last_ms
                .compare_exchange(last, now_ms, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
        {
            return Some(self.suppressed.swap(0, Ordering::AcqRel));
        }

        self.suppressed.fetch_add(1, Ordering::Relaxed);
        None
    }
}
