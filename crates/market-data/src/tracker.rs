//! Generation counter for superseding in-flight fetches.
//!
//! Every refresh begins a new generation; when a response arrives the
//! caller checks its token against the tracker and drops the result if a
//! newer request has started since. No cancellation plumbing needed — a
//! stale response is simply ignored.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct RequestTracker {
    generation: AtomicU64,
}

/// Token identifying one request generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken {
    generation: u64,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation, superseding all earlier tokens.
    pub fn begin(&self) -> RequestToken {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        RequestToken { generation }
    }

    /// Whether `token` belongs to the latest generation.
    pub fn is_current(&self, token: &RequestToken) -> bool {
        self.generation.load(Ordering::SeqCst) == token.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_token_is_current() {
        let tracker = RequestTracker::new();
        let token = tracker.begin();
        assert!(tracker.is_current(&token));
    }

    #[test]
    fn test_newer_request_supersedes_older() {
        let tracker = RequestTracker::new();
        let first = tracker.begin();
        let second = tracker.begin();
        assert!(!tracker.is_current(&first));
        assert!(tracker.is_current(&second));
    }

    #[test]
    fn test_generations_strictly_increase() {
        let tracker = RequestTracker::new();
        let a = tracker.begin();
        let b = tracker.begin();
        let c = tracker.begin();
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert!(tracker.is_current(&c));
    }
}
