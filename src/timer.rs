//! Cancellable timers driven from the connection manager's select loop
//!
//! Both timers hold an optional handle. Cancelling is always allowed, and
//! starting a timer replaces any instance already running.

use std::future::pending;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior, Sleep};

/// The server drops clients that stay silent for this long
pub const SERVER_TIMEOUT: Duration = Duration::from_millis(5000);

/// Keep-alive period, well inside [`SERVER_TIMEOUT`]
pub const HEARTBEAT_PERIOD: Duration = Duration::from_millis(3000);

/// Periodic keep-alive
#[derive(Debug)]
pub struct Heartbeat {
    period: Duration,
    interval: Option<Interval>,
}

impl Heartbeat {
    /// Stopped heartbeat with the given period
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    /// Start ticking one period from now
    pub fn start(&mut self) {
        let mut interval = interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
    }

    /// Stop ticking; safe to call while stopped
    pub fn stop(&mut self) {
        self.interval = None;
    }

    /// Whether the heartbeat is currently ticking
    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    /// Resolves on the next tick; never resolves while stopped
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => pending().await,
        }
    }
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new(HEARTBEAT_PERIOD)
    }
}

/// One-shot timer with at most one pending instance
#[derive(Debug, Default)]
pub struct OneShot {
    sleep: Option<Pin<Box<Sleep>>>,
}

impl OneShot {
    /// Fire after `delay`, replacing any pending instance
    pub fn arm(&mut self, delay: Duration) {
        self.sleep = Some(Box::pin(tokio::time::sleep(delay)));
    }

    /// Drop the pending instance, if any
    pub fn cancel(&mut self) {
        self.sleep = None;
    }

    /// Whether an instance is armed and has not fired yet
    pub fn is_pending(&self) -> bool {
        self.sleep.is_some()
    }

    /// Resolves once when the pending instance fires, then disarms
    ///
    /// Cancel safe: dropping the future leaves the timer armed.
    pub async fn expired(&mut self) {
        match self.sleep.as_mut() {
            Some(sleep) => {
                sleep.as_mut().await;
                self.sleep = None;
            }
            None => pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    fn assert_elapsed(started: Instant, expected: Duration) {
        let elapsed = started.elapsed();
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(5),
            "elapsed {elapsed:?}, expected {expected:?}"
        );
    }

    #[test]
    fn test_heartbeat_period_tolerates_jitter() {
        assert!(HEARTBEAT_PERIOD.as_millis() * 10 <= SERVER_TIMEOUT.as_millis() * 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_ticks_every_period() {
        let mut heartbeat = Heartbeat::default();
        heartbeat.start();

        let started = Instant::now();
        heartbeat.tick().await;
        assert_elapsed(started, HEARTBEAT_PERIOD);
        heartbeat.tick().await;
        assert_elapsed(started, HEARTBEAT_PERIOD * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_heartbeat_never_ticks() {
        let mut heartbeat = Heartbeat::default();
        heartbeat.start();
        heartbeat.stop();
        heartbeat.stop();
        assert!(!heartbeat.is_running());

        let result = timeout(Duration::from_secs(60), heartbeat.tick()).await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_shot_fires_once() {
        let mut timer = OneShot::default();
        timer.arm(Duration::from_millis(500));

        let started = Instant::now();
        timer.expired().await;
        assert_elapsed(started, Duration::from_millis(500));
        assert!(!timer.is_pending());

        let result = timeout(Duration::from_secs(10), timer.expired()).await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_shot_cancel_is_total() {
        let mut timer = OneShot::default();
        timer.cancel();

        timer.arm(Duration::from_millis(100));
        timer.cancel();
        timer.cancel();

        let result = timeout(Duration::from_secs(10), timer.expired()).await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_shot_rearm_replaces_pending() {
        let mut timer = OneShot::default();
        timer.arm(Duration::from_millis(100));
        timer.arm(Duration::from_millis(1000));

        let started = Instant::now();
        timer.expired().await;
        assert_elapsed(started, Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_shot_survives_dropped_wait() {
        let mut timer = OneShot::default();
        timer.arm(Duration::from_millis(1000));

        assert!(timeout(Duration::from_millis(10), timer.expired()).await.is_err());
        assert!(timer.is_pending());
        timer.expired().await;
        assert!(!timer.is_pending());
    }
}
