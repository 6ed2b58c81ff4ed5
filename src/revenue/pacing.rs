use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Clock that only moves when told to. `sleep` returns immediately after
/// advancing time, and every requested sleep is recorded.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    state: Mutex<ManualState>,
}

#[derive(Debug, Default)]
struct ManualState {
    elapsed: Duration,
    sleeps: Vec<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            state: Mutex::new(ManualState::default()),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut state) = self.state.lock() {
            state.elapsed += by;
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.state.lock().map(|s| s.elapsed).unwrap_or_default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().map(|s| s.sleeps.clone()).unwrap_or_default()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        if let Ok(mut state) = self.state.lock() {
            state.elapsed += duration;
            state.sleeps.push(duration);
        }
    }
}

/// Keeps consecutive request starts at least `min_interval` apart.
pub struct Pacer<C: Clock> {
    clock: C,
    min_interval: Duration,
    last_start: Option<Instant>,
}

impl<C: Clock> Pacer<C> {
    pub fn new(clock: C, min_interval: Duration) -> Self {
        Self {
            clock,
            min_interval,
            last_start: None,
        }
    }

    /// Waits until the next request may start and marks it as started.
    /// Returns how long it waited.
    pub async fn wait_turn(&mut self) -> Duration {
        let mut waited = Duration::ZERO;
        if let Some(last) = self.last_start {
            let since = self.clock.now().saturating_duration_since(last);
            if since < self.min_interval {
                waited = self.min_interval - since;
                self.clock.sleep(waited).await;
            }
        }
        self.last_start = Some(self.clock.now());
        waited
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::revenue::pacing::{Clock, ManualClock, Pacer};

    const INTERVAL: Duration = Duration::from_millis(1100);

    #[tokio::test]
    async fn first_request_starts_immediately() {
        let mut pacer = Pacer::new(ManualClock::new(), INTERVAL);
        assert_eq!(pacer.wait_turn().await, Duration::ZERO);
        assert!(pacer.clock().sleeps().is_empty());
    }

    #[tokio::test]
    async fn back_to_back_requests_wait_the_full_interval() {
        let mut pacer = Pacer::new(ManualClock::new(), INTERVAL);
        pacer.wait_turn().await;
        assert_eq!(pacer.wait_turn().await, INTERVAL);
        assert_eq!(pacer.wait_turn().await, INTERVAL);
        assert_eq!(pacer.clock().elapsed(), INTERVAL * 2);
    }

    #[tokio::test]
    async fn time_spent_in_the_request_counts_towards_the_interval() {
        let mut pacer = Pacer::new(ManualClock::new(), INTERVAL);
        pacer.wait_turn().await;
        pacer.clock().advance(Duration::from_millis(400));
        assert_eq!(pacer.wait_turn().await, Duration::from_millis(700));

        pacer.clock().advance(Duration::from_secs(5));
        assert_eq!(pacer.wait_turn().await, Duration::ZERO);
    }

    #[tokio::test]
    async fn manual_clock_records_sleeps() {
        let clock = ManualClock::new();
        let start = clock.now();
        clock.sleep(Duration::from_millis(5)).await;
        assert_eq!(clock.now() - start, Duration::from_millis(5));
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(5)]);
    }
}
