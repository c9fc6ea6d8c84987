//! Pacing between provider requests.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

/// Paces successive successful requests. The poller calls [`pause`](Self::pause)
/// after every successful request and never after a failed one.
#[async_trait]
pub trait RateGate: Send {
    async fn pause(&mut self);
}

/// Sleeps a fixed delay after each successful request.
#[derive(Debug, Clone)]
pub struct FixedDelayGate {
    delay: Duration,
}

impl FixedDelayGate {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl RateGate for FixedDelayGate {
    async fn pause(&mut self) {
        if self.delay.is_zero() {
            return;
        }
        debug!(delay_ms = self.delay.as_millis() as u64, "Pausing before next request");
        tokio::time::sleep(self.delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_zero_delay_returns_immediately() {
        let mut gate = FixedDelayGate::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..100 {
            gate.pause().await;
        }
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_delay_is_waited() {
        let mut gate = FixedDelayGate::new(Duration::from_millis(20));
        let start = Instant::now();
        gate.pause().await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
