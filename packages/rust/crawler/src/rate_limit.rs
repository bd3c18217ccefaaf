use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

/// Minimum spacing between requests to the same host.
///
/// Each call reserves the next free slot for its host under the lock, then
/// sleeps outside it, so concurrent callers queue up instead of bunching.
#[derive(Debug)]
pub struct HostRateLimiter {
    interval: Duration,
    next_slot: Mutex<HashMap<String, Instant>>,
}

impl HostRateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(HashMap::new()),
        }
    }

    /// Wait until a request to `url`'s host is allowed.
    pub async fn wait(&self, url: &Url) {
        if self.interval.is_zero() {
            return;
        }
        let host = url.host_str().unwrap_or_default().to_lowercase();

        let ready_at = {
            let mut slots = self.next_slot.lock().await;
            let now = Instant::now();
            let ready_at = slots.get(&host).copied().filter(|t| *t > now).unwrap_or(now);
            slots.insert(host, ready_at + self.interval);
            ready_at
        };

        tokio::time::sleep_until(ready_at).await;
    }
}
